//! Runtime capability contract
//!
//! The engine runtime is supplied by an external loader. This module names the
//! exact set of capabilities the façade relies on, split the same way the
//! loader splits them: class-level operations on the provider, and per-instance
//! operations on an object instantiated from it.
//!
//! Every operation is forwarded unchanged. Implementations must not add
//! behavior of their own beyond converting values across the boundary.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

/// WebGL major version the runtime probes when none is given
pub const DEFAULT_WEBGL_VERSION: u32 = 1;

/// Single-resolution asynchronous result of a long-running runtime call
///
/// Futures are `'static` so callers can hold on to them after the handle that
/// produced them is gone, and `!Send` because the runtime lives on the page's
/// single thread.
pub type Pending<T> = LocalBoxFuture<'static, Result<T, RuntimeError>>;

/// Callback receiving one line of standard output or standard error
pub type OutputCallback = Box<dyn Fn(&str)>;

/// Callback receiving download progress as `(current, total)` bytes
///
/// A `total` of `0` means the total cannot be computed yet.
pub type ProgressCallback = Box<dyn Fn(f64, f64)>;

/// Why the runtime rejected an operation
///
/// Holds the runtime's message and, when the runtime supplied one, the exact
/// value it rejected with. Bindings hand that value back to their callers
/// untouched. Equality compares messages only.
#[derive(Clone)]
pub struct Rejection {
    message: String,
    reason: Option<Rc<dyn Any>>,
}

impl Rejection {
    /// Rejection known only by its message
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), reason: None }
    }

    /// Rejection carrying the runtime's own rejection value
    pub fn with_reason<R: Any>(message: impl Into<String>, reason: R) -> Self {
        Self {
            message: message.into(),
            reason: Some(Rc::new(reason)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original rejection value, if it was kept and is a `R`
    pub fn reason<R: Any>(&self) -> Option<&R> {
        self.reason.as_deref()?.downcast_ref()
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejection")
            .field("message", &self.message)
            .field("has_reason", &self.reason.is_some())
            .finish()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl PartialEq for Rejection {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for Rejection {}

/// Failure reported by the runtime or by the reference lookup
///
/// A rejection displays as the runtime's own message, untranslated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("No engine runtime reference is available")]
    Unresolved,
    #[error("Failed to instantiate engine runtime: {0}")]
    Instantiation(String),
    #[error("{0}")]
    Rejected(Rejection),
}

impl RuntimeError {
    /// Rejection known only by its message
    pub fn rejected(message: impl Into<String>) -> Self {
        RuntimeError::Rejected(Rejection::new(message))
    }
}

/// File handed to `preload_file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadFile {
    /// Fetched by the runtime from this URL or path
    Url(String),
    /// Used verbatim as the file's contents
    Bytes(Vec<u8>),
}

impl From<&str> for PreloadFile {
    fn from(url: &str) -> Self {
        PreloadFile::Url(url.to_string())
    }
}

impl From<String> for PreloadFile {
    fn from(url: String) -> Self {
        PreloadFile::Url(url)
    }
}

impl From<Vec<u8>> for PreloadFile {
    fn from(bytes: Vec<u8>) -> Self {
        PreloadFile::Bytes(bytes)
    }
}

/// Class-level runtime capabilities (the loader's global `Engine` object)
///
/// # Example
///
/// ```rust
/// # use shim_core::contract::*;
/// fn probe<P: RuntimeProvider>(provider: &P) -> bool {
///     provider.is_webgl_available(Some(2)) || provider.is_webgl_available(None)
/// }
/// ```
pub trait RuntimeProvider: 'static {
    /// Value produced by resolved pending operations
    type Value: 'static;

    /// Instantiated runtime object
    type Instance: RuntimeInstance<Value = Self::Value>;

    /// Download and initialize the engine found at `base_path`
    fn load(&self, base_path: &str) -> Pending<Self::Value>;

    /// Release the engine's memory
    fn unload(&self);

    /// Probe for WebGL support; `None` lets the runtime pick its default
    fn is_webgl_available(&self, major_version: Option<u32>) -> bool;

    /// Set the WebAssembly module's filename extension (no leading dot)
    fn set_wasm_filename_extension(&self, extension: &str);

    /// Construct one runtime instance
    fn instantiate(&self) -> Result<Self::Instance, RuntimeError>;
}

/// Per-instance runtime capabilities
pub trait RuntimeInstance: 'static {
    /// Value produced by resolved pending operations
    type Value: 'static;

    /// Canvas surface the runtime renders into
    type Canvas;

    /// Initialize the instance, loading the engine from `base_path` if needed
    fn init(&self, base_path: Option<&str>) -> Pending<Self::Value>;

    /// Make a file available in the instance's file system before it starts
    ///
    /// `path` is required by the runtime when `file` is `PreloadFile::Bytes`.
    fn preload_file(&self, file: PreloadFile, path: Option<&str>) -> Pending<Self::Value>;

    /// Start the instance with the given command line arguments
    fn start(&self, args: &[String]) -> Pending<Self::Value>;

    /// Start the game from an executable URL and a main pack URL
    fn start_game(&self, exec_name: &str, main_pack: &str) -> Pending<Self::Value>;

    fn set_unload_after_init(&self, enabled: bool);

    fn set_canvas(&self, canvas: &Self::Canvas);

    fn set_canvas_resized_on_start(&self, enabled: bool);

    fn set_locale(&self, locale: &str);

    fn set_executable_name(&self, exec_name: &str);

    fn set_progress_func(&self, callback: ProgressCallback);

    fn set_stdout_func(&self, callback: OutputCallback);

    fn set_stderr_func(&self, callback: OutputCallback);
}
