//! Session facade over one runtime handle
//!
//! `Godot` wires the runtime's output, error and progress callbacks into
//! listener lists once, at construction, and offers `on` to subscribe to them.
//! `start` launches the game found at the session's base path and, once the
//! runtime reports it started, drains the one-shot start listeners.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use futures::future::FutureExt;
use tracing::{debug, trace, warn};

use crate::contract::{Pending, RuntimeError, RuntimeProvider};
use crate::engine::{CanvasOf, Engine};
use crate::listeners::{Multicast, OneShotStack};
use crate::reference::RuntimeReference;

/// Suffix appended to the base path to name the main pack
pub const MAIN_PACK_SUFFIX: &str = ".pck";

/// Listener for one line of standard output or standard error
pub type OutputHandler = Rc<dyn Fn(&str)>;

/// Listener for `(current, total)` download progress; `total == 0` means unknown
pub type ProgressHandler = Rc<dyn Fn(f64, f64)>;

/// Listener run once after the game started
pub type StartHandler = Rc<dyn Fn()>;

/// Main pack name for a base path
pub fn main_pack_name(path: &str) -> String {
    format!("{path}{MAIN_PACK_SUFFIX}")
}

/// Event kinds a session can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Stdout,
    Stderr,
    Progress,
    Start,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Stdout => "stdout",
            Event::Stderr => "stderr",
            Event::Progress => "progress",
            Event::Start => "start",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event name that is not one of `stdout`, `stderr`, `progress`, `start`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event '{0}', expected one of stdout, stderr, progress, start")]
pub struct UnknownEvent(pub String);

impl FromStr for Event {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Event::Stdout),
            "stderr" => Ok(Event::Stderr),
            "progress" => Ok(Event::Progress),
            "start" => Ok(Event::Start),
            other => Err(UnknownEvent(other.to_string())),
        }
    }
}

/// A listener together with the event it listens to
///
/// The variant fixes the listener's signature, so a handler can only be
/// subscribed to an event that produces the arguments it accepts.
#[derive(Clone)]
pub enum Handler {
    Stdout(OutputHandler),
    Stderr(OutputHandler),
    Progress(ProgressHandler),
    Start(StartHandler),
}

impl Handler {
    pub fn stdout(f: impl Fn(&str) + 'static) -> Self {
        Handler::Stdout(Rc::new(f))
    }

    pub fn stderr(f: impl Fn(&str) + 'static) -> Self {
        Handler::Stderr(Rc::new(f))
    }

    pub fn progress(f: impl Fn(f64, f64) + 'static) -> Self {
        Handler::Progress(Rc::new(f))
    }

    pub fn start(f: impl Fn() + 'static) -> Self {
        Handler::Start(Rc::new(f))
    }

    pub fn event(&self) -> Event {
        match self {
            Handler::Stdout(_) => Event::Stdout,
            Handler::Stderr(_) => Event::Stderr,
            Handler::Progress(_) => Event::Progress,
            Handler::Start(_) => Event::Start,
        }
    }

    /// Whether both handlers are the same listener subscribed to the same event
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        match (self, other) {
            (Handler::Stdout(a), Handler::Stdout(b)) | (Handler::Stderr(a), Handler::Stderr(b)) => {
                Rc::ptr_eq(a, b)
            }
            (Handler::Progress(a), Handler::Progress(b)) => Rc::ptr_eq(a, b),
            (Handler::Start(a), Handler::Start(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.event()).finish()
    }
}

/// Construction options for a session
pub struct SessionOptions<P: RuntimeProvider> {
    /// Canvas the game renders into
    pub canvas: CanvasOf<P>,
    /// Base path of the exported game, without extension
    pub path: String,
    /// Runtime replacing the reference's runtime before instantiation
    pub runtime: Option<P>,
}

impl<P: RuntimeProvider> SessionOptions<P> {
    pub fn new(canvas: CanvasOf<P>, path: impl Into<String>) -> Self {
        Self {
            canvas,
            path: path.into(),
            runtime: None,
        }
    }

    pub fn with_runtime(mut self, runtime: P) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

#[derive(Default)]
struct Listeners {
    stdout: Multicast<dyn Fn(&str)>,
    stderr: Multicast<dyn Fn(&str)>,
    progress: Multicast<dyn Fn(f64, f64)>,
    start: OneShotStack<dyn Fn()>,
}

/// Event-subscription and start-sequencing wrapper around an `Engine`
///
/// # Example
///
/// ```rust
/// # use std::cell::RefCell;
/// # use std::rc::Rc;
/// # use futures::executor::block_on;
/// # use shim_core::{Godot, Handler, RuntimeReference, SessionOptions};
/// # use shim_core::testing::ScriptedRuntime;
/// let runtime = ScriptedRuntime::new();
/// let reference = RuntimeReference::with_runtime(runtime.clone());
/// let godot = Godot::new(&reference, SessionOptions::new("canvas".to_string(), "game")).unwrap();
///
/// let lines = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&lines);
/// godot.on(Handler::stdout(move |line| sink.borrow_mut().push(line.to_string())));
///
/// runtime.last_instance().unwrap().emit_stdout("Godot Engine v3.5");
/// block_on(godot.start()).unwrap();
/// assert_eq!(*lines.borrow(), vec!["Godot Engine v3.5".to_string()]);
/// ```
pub struct Godot<P: RuntimeProvider> {
    engine: Engine<P>,
    path: String,
    listeners: Rc<Listeners>,
}

impl<P: RuntimeProvider> Godot<P> {
    /// Create a runtime handle, hook its callbacks and hand it the canvas
    pub fn new(reference: &RuntimeReference<P>, options: SessionOptions<P>) -> Result<Self, RuntimeError> {
        let SessionOptions { canvas, path, runtime } = options;
        let engine = Engine::new(reference, runtime)?;
        let listeners = Rc::new(Listeners::default());

        let stdout = Rc::clone(&listeners);
        engine.set_stdout_func(Box::new(move |line: &str| {
            let ran = stdout.stdout.emit(line);
            trace!(listeners = ran, "Dispatched stdout");
        }));

        let stderr = Rc::clone(&listeners);
        engine.set_stderr_func(Box::new(move |line: &str| {
            let ran = stderr.stderr.emit(line);
            trace!(listeners = ran, "Dispatched stderr");
        }));

        let progress = Rc::clone(&listeners);
        engine.set_progress_func(Box::new(move |current: f64, total: f64| {
            let ran = progress.progress.emit(current, total);
            trace!(current, total, listeners = ran, "Dispatched progress");
        }));

        engine.set_canvas(&canvas);
        debug!(path = %path, "Created session");

        Ok(Self { engine, path, listeners })
    }

    /// The wrapped runtime handle
    pub fn engine(&self) -> &Engine<P> {
        &self.engine
    }

    /// Base path the session starts from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Start the game at the base path, then run the start listeners
    ///
    /// Calls `start_game(path, path + ".pck")`. The returned operation
    /// resolves after the runtime reports the game started and after every
    /// start listener ran, last-registered first. Start listeners are
    /// consumed: a later call does not run them again. If the runtime rejects,
    /// the rejection is returned unchanged and no start listener runs.
    pub fn start(&self) -> Pending<()> {
        let main_pack = main_pack_name(&self.path);
        debug!(exec_name = %self.path, main_pack = %main_pack, "Starting game");

        let started = self.engine.start_game(&self.path, &main_pack);
        let listeners = Rc::clone(&self.listeners);
        async move {
            if let Err(err) = started.await {
                warn!(error = %err, "Game failed to start");
                return Err(err);
            }
            let ran = listeners.start.drain();
            debug!(listeners = ran, "Game started");
            Ok(())
        }
        .boxed_local()
    }

    /// Subscribe `handler` to the event matching its kind and hand it back
    ///
    /// Output, error and progress listeners run on every event, in
    /// registration order. Start listeners run once, on the next successful
    /// `start`, in reverse registration order.
    pub fn on(&self, handler: Handler) -> Handler {
        match &handler {
            Handler::Stdout(f) => {
                self.listeners.stdout.subscribe(Rc::clone(f));
            }
            Handler::Stderr(f) => {
                self.listeners.stderr.subscribe(Rc::clone(f));
            }
            Handler::Progress(f) => {
                self.listeners.progress.subscribe(Rc::clone(f));
            }
            Handler::Start(f) => {
                self.listeners.start.push(Rc::clone(f));
            }
        }
        trace!(event = %handler.event(), "Subscribed listener");
        handler
    }

    pub fn on_stdout(&self, f: impl Fn(&str) + 'static) -> OutputHandler {
        self.listeners.stdout.subscribe(Rc::new(f))
    }

    pub fn on_stderr(&self, f: impl Fn(&str) + 'static) -> OutputHandler {
        self.listeners.stderr.subscribe(Rc::new(f))
    }

    pub fn on_progress(&self, f: impl Fn(f64, f64) + 'static) -> ProgressHandler {
        self.listeners.progress.subscribe(Rc::new(f))
    }

    pub fn on_start(&self, f: impl Fn() + 'static) -> StartHandler {
        self.listeners.start.push(Rc::new(f))
    }

    /// Number of listeners currently subscribed to `event`
    pub fn listener_count(&self, event: Event) -> usize {
        match event {
            Event::Stdout => self.listeners.stdout.len(),
            Event::Stderr => self.listeners.stderr.len(),
            Event::Progress => self.listeners.progress.len(),
            Event::Start => self.listeners.start.len(),
        }
    }
}
