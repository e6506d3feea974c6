//! Runtime contract implemented over the loader's JavaScript objects
//!
//! `JsRuntime` wraps the global `Engine` class, `JsInstance` wraps one object
//! created from it. Promises become `Pending` futures. Synchronous throws and
//! promise rejections both become `RuntimeError::Rejected`, keeping the thrown
//! value itself as the rejection reason.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt};
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use shim_core::contract::{
    OutputCallback, Pending, PreloadFile, ProgressCallback, Rejection, RuntimeError,
    RuntimeInstance, RuntimeProvider,
};
use shim_core::RuntimeReference;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use crate::bindings::{EngineClass, EngineObject};

/// Global name under which the loader publishes the runtime
pub const GLOBAL_NAME: &str = "Engine";

thread_local! {
    static SHARED: Rc<RuntimeReference<JsRuntime>> = Rc::new(RuntimeReference::new(JsRuntime::locate));
}

/// The page-wide runtime reference, resolved from `globalThis.Engine` on first use
pub fn shared_reference() -> Rc<RuntimeReference<JsRuntime>> {
    SHARED.with(Rc::clone)
}

/// Best-effort human readable text for a thrown or rejected JS value
pub fn error_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{value:?}")
}

fn rejected(value: JsValue) -> RuntimeError {
    RuntimeError::Rejected(Rejection::with_reason(error_message(&value), value))
}

/// The value the runtime rejected with, or a fresh `Error` for failures that
/// never came from the runtime
pub fn rejection_value(err: RuntimeError) -> JsValue {
    if let RuntimeError::Rejected(rejection) = &err {
        if let Some(reason) = rejection.reason::<JsValue>() {
            return reason.clone();
        }
    }
    JsError::from(err).into()
}

fn settle(result: Result<Promise, JsValue>) -> Pending<JsValue> {
    match result {
        Ok(promise) => async move { JsFuture::from(promise).await.map_err(rejected) }.boxed_local(),
        Err(thrown) => future::ready(Err(rejected(thrown))).boxed_local(),
    }
}

/// The loader's `Engine` class
#[derive(Debug, Clone)]
pub struct JsRuntime {
    class: EngineClass,
}

impl JsRuntime {
    /// Look the runtime up at `globalThis.Engine`
    pub fn locate() -> Option<Self> {
        let value = Reflect::get(&js_sys::global(), &JsValue::from_str(GLOBAL_NAME)).ok()?;
        let runtime = Self::from_value(value);
        if runtime.is_none() {
            debug!("No constructible {} found on the global object", GLOBAL_NAME);
        }
        runtime
    }

    /// Wrap `value` if it is constructible
    pub fn from_value(value: JsValue) -> Option<Self> {
        if value.is_function() {
            Some(Self { class: value.unchecked_into() })
        } else {
            None
        }
    }

    pub fn class(&self) -> &EngineClass {
        &self.class
    }
}

impl RuntimeProvider for JsRuntime {
    type Value = JsValue;
    type Instance = JsInstance;

    fn load(&self, base_path: &str) -> Pending<JsValue> {
        settle(self.class.load(base_path))
    }

    fn unload(&self) {
        self.class.unload();
    }

    fn is_webgl_available(&self, major_version: Option<u32>) -> bool {
        self.class.is_webgl_available(major_version)
    }

    fn set_wasm_filename_extension(&self, extension: &str) {
        self.class.set_web_assembly_filename_extension(extension);
    }

    fn instantiate(&self) -> Result<JsInstance, RuntimeError> {
        let constructor: &Function = self.class.unchecked_ref();
        let object = Reflect::construct(constructor, &Array::new())
            .map_err(|thrown| RuntimeError::Instantiation(error_message(&thrown)))?;

        Ok(JsInstance {
            object: object.unchecked_into(),
            callbacks: RefCell::new(Callbacks::default()),
        })
    }
}

/// Closures handed to the runtime; dropping one invalidates it on the JS side
#[derive(Default)]
struct Callbacks {
    stdout: Option<Closure<dyn Fn(JsValue)>>,
    stderr: Option<Closure<dyn Fn(JsValue)>>,
    progress: Option<Closure<dyn Fn(f64, f64)>>,
}

fn output_closure(callback: OutputCallback) -> Closure<dyn Fn(JsValue)> {
    Closure::wrap(Box::new(move |line: JsValue| match line.as_string() {
        Some(text) => callback(&text),
        None => callback(&error_message(&line)),
    }) as Box<dyn Fn(JsValue)>)
}

/// One object created with `new Engine()`
///
/// Keeps the closures registered through the callback setters alive for as
/// long as the instance exists.
pub struct JsInstance {
    object: EngineObject,
    callbacks: RefCell<Callbacks>,
}

impl JsInstance {
    pub fn object(&self) -> &EngineObject {
        &self.object
    }

    fn call_start(&self, args: &[String]) -> Result<Promise, JsValue> {
        let start = Reflect::get(&self.object, &JsValue::from_str("start"))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from(js_sys::TypeError::new("engine.start is not a function")))?;
        let args: Array = args.iter().map(|arg| JsValue::from_str(arg)).collect();
        let result = start.apply(&self.object, &args)?;
        Ok(Promise::resolve(&result))
    }
}

impl RuntimeInstance for JsInstance {
    type Value = JsValue;
    type Canvas = HtmlCanvasElement;

    fn init(&self, base_path: Option<&str>) -> Pending<JsValue> {
        settle(self.object.init(base_path.map(str::to_string)))
    }

    fn preload_file(&self, file: PreloadFile, path: Option<&str>) -> Pending<JsValue> {
        let file = match file {
            PreloadFile::Url(url) => JsValue::from_str(&url),
            PreloadFile::Bytes(bytes) => Uint8Array::from(bytes.as_slice()).into(),
        };
        settle(self.object.preload_file(&file, path.map(str::to_string)))
    }

    fn start(&self, args: &[String]) -> Pending<JsValue> {
        settle(self.call_start(args))
    }

    fn start_game(&self, exec_name: &str, main_pack: &str) -> Pending<JsValue> {
        settle(self.object.start_game(exec_name, main_pack))
    }

    fn set_unload_after_init(&self, enabled: bool) {
        self.object.set_unload_after_init(enabled);
    }

    fn set_canvas(&self, canvas: &HtmlCanvasElement) {
        self.object.set_canvas(canvas);
    }

    fn set_canvas_resized_on_start(&self, enabled: bool) {
        self.object.set_canvas_resized_on_start(enabled);
    }

    fn set_locale(&self, locale: &str) {
        self.object.set_locale(locale);
    }

    fn set_executable_name(&self, exec_name: &str) {
        self.object.set_executable_name(exec_name);
    }

    fn set_progress_func(&self, callback: ProgressCallback) {
        let closure = Closure::wrap(Box::new(move |current: f64, total: f64| callback(current, total))
            as Box<dyn Fn(f64, f64)>);
        self.object.set_progress_func(closure.as_ref().unchecked_ref());
        self.callbacks.borrow_mut().progress = Some(closure);
    }

    fn set_stdout_func(&self, callback: OutputCallback) {
        let closure = output_closure(callback);
        self.object.set_stdout_func(closure.as_ref().unchecked_ref());
        self.callbacks.borrow_mut().stdout = Some(closure);
    }

    fn set_stderr_func(&self, callback: OutputCallback) {
        let closure = output_closure(callback);
        self.object.set_stderr_func(closure.as_ref().unchecked_ref());
        self.callbacks.borrow_mut().stderr = Some(closure);
    }
}
