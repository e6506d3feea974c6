//! Scripted runtime for exercising the façade without a browser.
//!
//! `ScriptedRuntime` implements the runtime contract by recording every call it
//! receives and answering pending operations from a script: succeed by default,
//! fail with a given message, or stay pending until released. Instances keep
//! the callbacks registered with them so tests can emit output and progress
//! events on demand.
//!
//! # Example
//!
//! ```
//! use futures::executor::block_on;
//! use shim_core::testing::{Call, Operation, ScriptedRuntime};
//! use shim_core::{Engine, RuntimeReference};
//!
//! let runtime = ScriptedRuntime::new();
//! let reference = RuntimeReference::with_runtime(runtime.clone());
//! let engine = Engine::new(&reference, None).unwrap();
//!
//! runtime.fail(Operation::StartGame, "Missing canvas");
//! let result = block_on(engine.start_game("game", "game.pck"));
//! assert!(result.is_err());
//! assert_eq!(
//!     runtime.calls().last(),
//!     Some(&Call::StartGame { exec_name: "game".into(), main_pack: "game.pck".into() })
//! );
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};

use crate::contract::{
    OutputCallback, Pending, PreloadFile, ProgressCallback, Rejection, RuntimeError,
    RuntimeInstance, RuntimeProvider,
};

/// One call received by the scripted runtime or one of its instances
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Unload,
    IsWebGlAvailable(Option<u32>),
    SetWasmFilenameExtension(String),
    Instantiate,
    Init(Option<String>),
    PreloadFile { file: PreloadFile, path: Option<String> },
    Start(Vec<String>),
    StartGame { exec_name: String, main_pack: String },
    SetUnloadAfterInit(bool),
    SetCanvas(String),
    SetCanvasResizedOnStart(bool),
    SetLocale(String),
    SetExecutableName(String),
    SetProgressFunc,
    SetStdoutFunc,
    SetStderrFunc,
}

/// Pending operations whose outcome can be scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Init,
    PreloadFile,
    Start,
    StartGame,
}

#[derive(Default)]
struct Script {
    calls: RefCell<Vec<Call>>,
    failures: RefCell<HashMap<Operation, Rejection>>,
    held: RefCell<HashSet<Operation>>,
    waiting: RefCell<HashMap<Operation, Vec<oneshot::Sender<()>>>>,
    webgl_version: Cell<u32>,
    instantiation_failure: RefCell<Option<String>>,
    instances: RefCell<Vec<ScriptedInstance>>,
}

impl Script {
    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn outcome(&self, operation: Operation) -> Pending<()> {
        let result = match self.failures.borrow().get(&operation) {
            Some(rejection) => Err(RuntimeError::Rejected(rejection.clone())),
            None => Ok(()),
        };

        if !self.held.borrow().contains(&operation) {
            return future::ready(result).boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().entry(operation).or_default().push(tx);
        async move {
            rx.await
                .map_err(|_| RuntimeError::rejected("scripted operation was dropped"))?;
            result
        }
        .boxed_local()
    }
}

/// Runtime provider double driven by a script
#[derive(Clone)]
pub struct ScriptedRuntime {
    script: Rc<Script>,
}

impl ScriptedRuntime {
    /// Create a runtime where every operation succeeds and WebGL 2 is available
    pub fn new() -> Self {
        let script = Script::default();
        script.webgl_version.set(2);
        Self { script: Rc::new(script) }
    }

    /// Every call received so far, in order, across the runtime and its instances
    pub fn calls(&self) -> Vec<Call> {
        self.script.calls.borrow().clone()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.script.calls.borrow_mut().clear();
    }

    /// Make `operation` reject with `message` until `succeed` is called
    pub fn fail(&self, operation: Operation, message: &str) {
        self.reject(operation, Rejection::new(message));
    }

    /// Make `operation` reject with `rejection` until `succeed` is called
    pub fn reject(&self, operation: Operation, rejection: Rejection) {
        self.script.failures.borrow_mut().insert(operation, rejection);
    }

    /// Make `operation` resolve successfully again
    pub fn succeed(&self, operation: Operation) {
        self.script.failures.borrow_mut().remove(&operation);
    }

    /// Keep future calls of `operation` pending until `release` is called
    pub fn hold(&self, operation: Operation) {
        self.script.held.borrow_mut().insert(operation);
    }

    /// Complete every pending call of `operation` and stop holding it
    ///
    /// Returns the number of calls released.
    pub fn release(&self, operation: Operation) -> usize {
        self.script.held.borrow_mut().remove(&operation);
        let waiting = self.script.waiting.borrow_mut().remove(&operation).unwrap_or_default();
        let count = waiting.len();
        for tx in waiting {
            let _ = tx.send(());
        }
        count
    }

    /// Highest WebGL major version reported as available (0 for none)
    pub fn set_webgl_version(&self, version: u32) {
        self.script.webgl_version.set(version);
    }

    /// Make `instantiate` fail with `message`
    pub fn fail_instantiation(&self, message: &str) {
        *self.script.instantiation_failure.borrow_mut() = Some(message.to_string());
    }

    /// Number of instances created from this runtime
    pub fn instance_count(&self) -> usize {
        self.script.instances.borrow().len()
    }

    /// Most recently created instance
    pub fn last_instance(&self) -> Option<ScriptedInstance> {
        self.script.instances.borrow().last().cloned()
    }

    /// Whether two handles share the same script
    pub fn same_runtime(&self, other: &ScriptedRuntime) -> bool {
        Rc::ptr_eq(&self.script, &other.script)
    }
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeProvider for ScriptedRuntime {
    type Value = ();
    type Instance = ScriptedInstance;

    fn load(&self, base_path: &str) -> Pending<()> {
        self.script.record(Call::Load(base_path.to_string()));
        self.script.outcome(Operation::Load)
    }

    fn unload(&self) {
        self.script.record(Call::Unload);
    }

    fn is_webgl_available(&self, major_version: Option<u32>) -> bool {
        self.script.record(Call::IsWebGlAvailable(major_version));
        let wanted = major_version.unwrap_or(crate::contract::DEFAULT_WEBGL_VERSION);
        wanted <= self.script.webgl_version.get()
    }

    fn set_wasm_filename_extension(&self, extension: &str) {
        self.script.record(Call::SetWasmFilenameExtension(extension.to_string()));
    }

    fn instantiate(&self) -> Result<ScriptedInstance, RuntimeError> {
        self.script.record(Call::Instantiate);
        if let Some(message) = self.script.instantiation_failure.borrow().as_ref() {
            return Err(RuntimeError::Instantiation(message.clone()));
        }

        let instance = ScriptedInstance {
            script: Rc::clone(&self.script),
            slots: Rc::new(Slots::default()),
        };
        self.script.instances.borrow_mut().push(instance.clone());
        Ok(instance)
    }
}

#[derive(Default)]
struct Slots {
    stdout: RefCell<Option<OutputCallback>>,
    stderr: RefCell<Option<OutputCallback>>,
    progress: RefCell<Option<ProgressCallback>>,
}

/// Instance created by a `ScriptedRuntime`
///
/// Clones share the registered callbacks, so a test can keep a clone and emit
/// events into the instance owned by an `Engine`.
#[derive(Clone)]
pub struct ScriptedInstance {
    script: Rc<Script>,
    slots: Rc<Slots>,
}

impl ScriptedInstance {
    /// Deliver a line of standard output; returns whether a callback was registered
    pub fn emit_stdout(&self, line: &str) -> bool {
        match self.slots.stdout.borrow().as_ref() {
            Some(callback) => {
                callback(line);
                true
            }
            None => false,
        }
    }

    /// Deliver a line of standard error; returns whether a callback was registered
    pub fn emit_stderr(&self, line: &str) -> bool {
        match self.slots.stderr.borrow().as_ref() {
            Some(callback) => {
                callback(line);
                true
            }
            None => false,
        }
    }

    /// Deliver a progress update; returns whether a callback was registered
    pub fn emit_progress(&self, current: f64, total: f64) -> bool {
        match self.slots.progress.borrow().as_ref() {
            Some(callback) => {
                callback(current, total);
                true
            }
            None => false,
        }
    }
}

impl RuntimeInstance for ScriptedInstance {
    type Value = ();
    type Canvas = String;

    fn init(&self, base_path: Option<&str>) -> Pending<()> {
        self.script.record(Call::Init(base_path.map(str::to_string)));
        self.script.outcome(Operation::Init)
    }

    fn preload_file(&self, file: PreloadFile, path: Option<&str>) -> Pending<()> {
        self.script.record(Call::PreloadFile { file, path: path.map(str::to_string) });
        self.script.outcome(Operation::PreloadFile)
    }

    fn start(&self, args: &[String]) -> Pending<()> {
        self.script.record(Call::Start(args.to_vec()));
        self.script.outcome(Operation::Start)
    }

    fn start_game(&self, exec_name: &str, main_pack: &str) -> Pending<()> {
        self.script.record(Call::StartGame {
            exec_name: exec_name.to_string(),
            main_pack: main_pack.to_string(),
        });
        self.script.outcome(Operation::StartGame)
    }

    fn set_unload_after_init(&self, enabled: bool) {
        self.script.record(Call::SetUnloadAfterInit(enabled));
    }

    fn set_canvas(&self, canvas: &String) {
        self.script.record(Call::SetCanvas(canvas.clone()));
    }

    fn set_canvas_resized_on_start(&self, enabled: bool) {
        self.script.record(Call::SetCanvasResizedOnStart(enabled));
    }

    fn set_locale(&self, locale: &str) {
        self.script.record(Call::SetLocale(locale.to_string()));
    }

    fn set_executable_name(&self, exec_name: &str) {
        self.script.record(Call::SetExecutableName(exec_name.to_string()));
    }

    fn set_progress_func(&self, callback: ProgressCallback) {
        self.script.record(Call::SetProgressFunc);
        *self.slots.progress.borrow_mut() = Some(callback);
    }

    fn set_stdout_func(&self, callback: OutputCallback) {
        self.script.record(Call::SetStdoutFunc);
        *self.slots.stdout.borrow_mut() = Some(callback);
    }

    fn set_stderr_func(&self, callback: OutputCallback) {
        self.script.record(Call::SetStderrFunc);
        *self.slots.stderr.borrow_mut() = Some(callback);
    }
}
