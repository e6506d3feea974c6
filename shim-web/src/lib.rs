//! Browser binding for the Godot web runtime shim
//!
//! Implements the `shim-core` runtime contract over the `Engine` class that
//! Godot's HTML5 export publishes on the page, and exports a `GodotSession`
//! class for JavaScript callers.

pub mod bindings;
pub mod runtime;
pub mod logging;
pub mod exports;

#[cfg(all(test, target_arch = "wasm32"))]
mod fake_engine;

// Re-export main types for convenience
pub use runtime::{shared_reference, JsInstance, JsRuntime};
pub use exports::GodotSession;

/// Session facade bound to the browser runtime
pub type WebGodot = shim_core::Godot<JsRuntime>;
