//! Runtime handle wrapping one instantiated engine runtime
//!
//! `Engine` owns exactly one runtime instance and forwards every operation to
//! it unchanged. It adds static typing and nothing else.

use tracing::debug;

use crate::contract::{
    OutputCallback, Pending, PreloadFile, ProgressCallback, RuntimeError, RuntimeInstance,
    RuntimeProvider,
};
use crate::reference::RuntimeReference;

/// Canvas type accepted by the instances of provider `P`
pub type CanvasOf<P> = <<P as RuntimeProvider>::Instance as RuntimeInstance>::Canvas;

/// Typed handle over one runtime instance
///
/// # Example
///
/// ```rust
/// # use futures::executor::block_on;
/// # use shim_core::{Engine, RuntimeReference};
/// # use shim_core::testing::ScriptedRuntime;
/// let reference = RuntimeReference::with_runtime(ScriptedRuntime::new());
/// let engine = Engine::new(&reference, None).unwrap();
///
/// engine.set_canvas(&"canvas".to_string());
/// engine.set_locale("fr");
/// block_on(engine.start_game("index", "index.pck")).unwrap();
/// ```
pub struct Engine<P: RuntimeProvider> {
    instance: P::Instance,
}

impl<P: RuntimeProvider> Engine<P> {
    /// Instantiate a runtime from `reference`
    ///
    /// If `runtime` is given it first replaces the reference's runtime, which
    /// affects every handle created afterwards.
    pub fn new(reference: &RuntimeReference<P>, runtime: Option<P>) -> Result<Self, RuntimeError> {
        if let Some(runtime) = runtime {
            reference.set(runtime);
        }

        let instance = reference.resolve()?.instantiate()?;
        debug!("Instantiated engine runtime");
        Ok(Self { instance })
    }

    /// Wrap an already instantiated runtime
    pub fn from_instance(instance: P::Instance) -> Self {
        Self { instance }
    }

    /// The underlying runtime instance
    pub fn instance(&self) -> &P::Instance {
        &self.instance
    }

    /// Initialize the instance, loading the engine from `base_path` if it has
    /// not been loaded yet
    pub fn init(&self, base_path: Option<&str>) -> Pending<P::Value> {
        self.instance.init(base_path)
    }

    /// Load a file into the instance's file system; must precede `start`
    pub fn preload_file(&self, file: impl Into<PreloadFile>, path: Option<&str>) -> Pending<P::Value> {
        self.instance.preload_file(file.into(), path)
    }

    /// Start the instance with `args` as command line arguments
    pub fn start<S: AsRef<str>>(&self, args: &[S]) -> Pending<P::Value> {
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        self.instance.start(&args)
    }

    /// Start the game from an executable URL (no extension) and a main pack URL
    pub fn start_game(&self, exec_name: &str, main_pack: &str) -> Pending<P::Value> {
        self.instance.start_game(exec_name, main_pack)
    }

    pub fn set_unload_after_init(&self, enabled: bool) {
        self.instance.set_unload_after_init(enabled);
    }

    pub fn set_canvas(&self, canvas: &CanvasOf<P>) {
        self.instance.set_canvas(canvas);
    }

    pub fn set_canvas_resized_on_start(&self, enabled: bool) {
        self.instance.set_canvas_resized_on_start(enabled);
    }

    pub fn set_locale(&self, locale: &str) {
        self.instance.set_locale(locale);
    }

    pub fn set_executable_name(&self, exec_name: &str) {
        self.instance.set_executable_name(exec_name);
    }

    pub fn set_progress_func(&self, callback: ProgressCallback) {
        self.instance.set_progress_func(callback);
    }

    pub fn set_stdout_func(&self, callback: OutputCallback) {
        self.instance.set_stdout_func(callback);
    }

    pub fn set_stderr_func(&self, callback: OutputCallback) {
        self.instance.set_stderr_func(callback);
    }
}
