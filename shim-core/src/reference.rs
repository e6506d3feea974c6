//! Runtime reference cache
//!
//! The loader script publishes the runtime under a well-known global name.
//! `RuntimeReference` resolves it lazily on first use, caches it, and lets
//! callers override it explicitly. Handles created afterwards pick up the
//! override; handles created before keep the instance they already own.
//!
//! Lifecycle: unset -> resolved (from the default location or an explicit
//! override) -> overridden again by `set`, or reverted by `reset`.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt};
use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::contract::{Pending, RuntimeError, RuntimeProvider};

/// Function looking up the runtime at its default location
pub type Locator<P> = fn() -> Option<P>;

/// Process-wide runtime reference with lazy default resolution
///
/// Single-threaded by construction: the reference is `!Sync` and is meant to
/// be owned by one thread-local or passed explicitly as a context value.
///
/// # Example
///
/// ```rust
/// # use shim_core::RuntimeReference;
/// # use shim_core::testing::ScriptedRuntime;
/// let reference: RuntimeReference<ScriptedRuntime> = RuntimeReference::unlocated();
/// assert!(reference.resolve().is_err());
///
/// reference.set(ScriptedRuntime::new());
/// assert!(reference.is_webgl_available(None).unwrap());
/// ```
pub struct RuntimeReference<P: RuntimeProvider> {
    explicit: RefCell<Option<Rc<P>>>,
    located: OnceCell<Rc<P>>,
    locate: Locator<P>,
}

impl<P: RuntimeProvider> RuntimeReference<P> {
    /// Create a reference resolved through `locate` on first use
    pub fn new(locate: Locator<P>) -> Self {
        Self {
            explicit: RefCell::new(None),
            located: OnceCell::new(),
            locate,
        }
    }

    /// Create a reference with no default location
    ///
    /// Resolution fails until `set` is called.
    pub fn unlocated() -> Self {
        Self::new(|| None)
    }

    /// Create a reference already set to `runtime`
    pub fn with_runtime(runtime: P) -> Self {
        let reference = Self::unlocated();
        reference.set(runtime);
        reference
    }

    /// Return the current runtime, resolving the default location if needed
    ///
    /// An explicit override always wins. The default location is consulted at
    /// most once successfully; a failed lookup is retried on the next call.
    pub fn resolve(&self) -> Result<Rc<P>, RuntimeError> {
        if let Some(runtime) = self.explicit.borrow().as_ref() {
            return Ok(Rc::clone(runtime));
        }

        self.located
            .get_or_try_init(|| match (self.locate)() {
                Some(runtime) => {
                    debug!("Resolved engine runtime from its default location");
                    Ok(Rc::new(runtime))
                }
                None => Err(RuntimeError::Unresolved),
            })
            .map(Rc::clone)
    }

    /// Override the runtime used by every handle created from now on
    pub fn set(&self, runtime: P) {
        if self.explicit.borrow().is_some() {
            debug!("Overriding explicitly set engine runtime");
        }
        *self.explicit.borrow_mut() = Some(Rc::new(runtime));
    }

    /// Drop an explicit override, falling back to the default location
    pub fn reset(&self) {
        self.explicit.borrow_mut().take();
    }

    /// Whether a runtime has been set or located
    pub fn is_resolved(&self) -> bool {
        self.explicit.borrow().is_some() || self.located.get().is_some()
    }

    /// Load the engine from `base_path`
    ///
    /// The returned operation resolves once the engine is downloaded and
    /// initialized.
    pub fn load(&self, base_path: &str) -> Pending<P::Value> {
        match self.resolve() {
            Ok(runtime) => runtime.load(base_path),
            Err(err) => future::ready(Err(err)).boxed_local(),
        }
    }

    /// Unload the engine to free memory
    pub fn unload(&self) -> Result<(), RuntimeError> {
        self.resolve()?.unload();
        Ok(())
    }

    /// Check whether WebGL of the given major version (default 1) is available
    pub fn is_webgl_available(&self, major_version: Option<u32>) -> Result<bool, RuntimeError> {
        Ok(self.resolve()?.is_webgl_available(major_version))
    }

    /// Set an alternative filename extension for the WebAssembly module
    pub fn set_wasm_filename_extension(&self, extension: &str) -> Result<(), RuntimeError> {
        self.resolve()?.set_wasm_filename_extension(extension);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, Operation, ScriptedRuntime};
    use futures::executor::block_on;

    thread_local! {
        static DEFAULT_RUNTIME: ScriptedRuntime = ScriptedRuntime::new();
    }

    fn locate_default() -> Option<ScriptedRuntime> {
        Some(DEFAULT_RUNTIME.with(Clone::clone))
    }

    #[test]
    fn test_unlocated_reference_surfaces_on_first_use() {
        let reference: RuntimeReference<ScriptedRuntime> = RuntimeReference::unlocated();

        assert!(!reference.is_resolved());
        assert_eq!(reference.unload(), Err(RuntimeError::Unresolved));
        assert_eq!(reference.is_webgl_available(Some(1)), Err(RuntimeError::Unresolved));
        assert_eq!(block_on(reference.load("game")), Err(RuntimeError::Unresolved));
    }

    #[test]
    fn test_default_location_is_cached() {
        let reference = RuntimeReference::new(locate_default);

        let first = reference.resolve().unwrap();
        let second = reference.resolve().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.same_runtime(&DEFAULT_RUNTIME.with(Clone::clone)));
        assert!(reference.is_resolved());
    }

    #[test]
    fn test_explicit_override_wins_and_reset_falls_back() {
        let reference = RuntimeReference::new(locate_default);
        let explicit = ScriptedRuntime::new();

        reference.set(explicit.clone());
        assert!(reference.resolve().unwrap().same_runtime(&explicit));

        let replacement = ScriptedRuntime::new();
        reference.set(replacement.clone());
        assert!(reference.resolve().unwrap().same_runtime(&replacement));

        reference.reset();
        let fallback = reference.resolve().unwrap();
        assert!(fallback.same_runtime(&DEFAULT_RUNTIME.with(Clone::clone)));
    }

    #[test]
    fn test_class_level_operations_forward() {
        let runtime = ScriptedRuntime::new();
        runtime.set_webgl_version(1);
        let reference = RuntimeReference::with_runtime(runtime.clone());

        assert!(block_on(reference.load("export/game")).is_ok());
        assert_eq!(reference.is_webgl_available(None), Ok(true));
        assert_eq!(reference.is_webgl_available(Some(2)), Ok(false));
        reference.set_wasm_filename_extension("wasm.br").unwrap();
        reference.unload().unwrap();

        assert_eq!(
            runtime.calls(),
            vec![
                Call::Load("export/game".into()),
                Call::IsWebGlAvailable(None),
                Call::IsWebGlAvailable(Some(2)),
                Call::SetWasmFilenameExtension("wasm.br".into()),
                Call::Unload,
            ]
        );
    }

    #[test]
    fn test_load_rejection_is_forwarded_unchanged() {
        let runtime = ScriptedRuntime::new();
        runtime.fail(Operation::Load, "Failed to fetch godot.wasm");
        let reference = RuntimeReference::with_runtime(runtime);

        assert_eq!(
            block_on(reference.load("godot")),
            Err(RuntimeError::rejected("Failed to fetch godot.wasm"))
        );
    }
}
