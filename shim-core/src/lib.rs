//! Core types for the Godot web runtime shim
//!
//! This crate provides the target-independent part of the shim:
//! - `RuntimeProvider` / `RuntimeInstance`: the capability contract the loaded runtime satisfies
//! - `RuntimeReference`: lazily resolved, overridable reference to the runtime
//! - `Engine`: typed handle forwarding to one runtime instance
//! - `Godot`: session facade with event subscriptions and start sequencing
//! - `EngineConfig`: optional settings applied before starting

pub mod contract;
pub mod reference;
pub mod engine;
pub mod listeners;
pub mod session;
pub mod config;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types for convenience
pub use contract::{PreloadFile, Rejection, RuntimeError, RuntimeInstance, RuntimeProvider};
pub use reference::RuntimeReference;
pub use engine::Engine;
pub use session::{Event, Godot, Handler, SessionOptions};
pub use config::{ConfigError, EngineConfig};
