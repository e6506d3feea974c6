//! Optional runtime configuration
//!
//! Sessions only hook callbacks and set the canvas. Everything else the runtime
//! can be told before starting is collected here and applied explicitly.
//!
//! ```toml
//! locale = "fr_FR"
//! executable_name = "index"
//! unload_after_init = false
//! canvas_resized_on_start = true
//! wasm_extension = "wasm.gz"
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::{RuntimeError, RuntimeProvider};
use crate::engine::Engine;
use crate::reference::RuntimeReference;

/// Error raised while reading a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid engine config: {0}")]
    Invalid(String),
}

/// Settings forwarded to the runtime before it starts
///
/// Unset fields leave the runtime's defaults untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Language code selecting the game's localization
    pub locale: Option<String>,
    /// Virtual executable name; also names the automatically started main pack
    pub executable_name: Option<String>,
    /// Unload the engine once the instance is initialized (runtime default: true)
    pub unload_after_init: Option<bool>,
    /// Resize the canvas to the project's size on start (runtime default: true)
    pub canvas_resized_on_start: Option<bool>,
    /// WebAssembly module filename extension, without leading dot
    pub wasm_extension: Option<String>,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(&self.locale, Some(locale) if locale.is_empty()) {
            return Err(ConfigError::Invalid("locale cannot be empty".to_string()));
        }

        if matches!(&self.executable_name, Some(name) if name.is_empty()) {
            return Err(ConfigError::Invalid("executable_name cannot be empty".to_string()));
        }

        if let Some(extension) = &self.wasm_extension {
            if extension.is_empty() {
                return Err(ConfigError::Invalid("wasm_extension cannot be empty".to_string()));
            }
            if extension.starts_with('.') {
                return Err(ConfigError::Invalid(format!(
                    "wasm_extension must not start with a dot, got '{extension}'"
                )));
            }
        }

        Ok(())
    }

    /// Apply the class-level settings (the WebAssembly extension)
    ///
    /// Must run before the engine is loaded to have any effect.
    pub fn apply_to_reference<P: RuntimeProvider>(
        &self,
        reference: &RuntimeReference<P>,
    ) -> Result<(), RuntimeError> {
        if let Some(extension) = &self.wasm_extension {
            debug!(extension = %extension, "Setting WebAssembly filename extension");
            reference.set_wasm_filename_extension(extension)?;
        }
        Ok(())
    }

    /// Apply the per-instance settings
    pub fn apply_to_engine<P: RuntimeProvider>(&self, engine: &Engine<P>) {
        if let Some(locale) = &self.locale {
            engine.set_locale(locale);
        }
        if let Some(name) = &self.executable_name {
            engine.set_executable_name(name);
        }
        if let Some(enabled) = self.unload_after_init {
            engine.set_unload_after_init(enabled);
        }
        if let Some(enabled) = self.canvas_resized_on_start {
            engine.set_canvas_resized_on_start(enabled);
        }
        debug!(config = ?self, "Applied engine config");
    }
}
