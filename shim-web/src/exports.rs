//! JavaScript-facing API
//!
//! Exposes the session facade to plain JavaScript callers. Handlers arrive as
//! untyped functions; they are not checked against the event they subscribe
//! to, and a handler that throws is logged without stopping the remaining
//! listeners. Exported promises reject with the runtime's own rejection value.

use js_sys::{ArrayBuffer, Function, Promise, Reflect, Uint8Array};
use shim_core::session::{Event, Handler};
use shim_core::{EngineConfig, Godot, PreloadFile, RuntimeError, SessionOptions};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::HtmlCanvasElement;

use crate::logging;
use crate::runtime::{error_message, rejection_value, shared_reference, JsRuntime};

/// Error raised by the exported API before reaching the runtime
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Engine reference must be a constructor, got {0}")]
    NotConstructible(String),
    #[error("Expected a URL, an ArrayBuffer or a view on one, got {0}")]
    UnsupportedFile(String),
}

fn settled<T: Into<JsValue>>(result: Result<T, RuntimeError>) -> Result<JsValue, JsValue> {
    result.map(Into::into).map_err(rejection_value)
}

/// Bytes seen by an `ArrayBuffer` or any view on one
fn buffer_bytes(file: &JsValue) -> Option<Vec<u8>> {
    if file.is_instance_of::<ArrayBuffer>() {
        return Some(Uint8Array::new(file).to_vec());
    }
    if !ArrayBuffer::is_view(file) {
        return None;
    }

    let field = |name: &str| Reflect::get(file, &JsValue::from_str(name)).ok();
    let buffer = field("buffer")?;
    let offset = field("byteOffset")?.as_f64()? as u32;
    let length = field("byteLength")?.as_f64()? as u32;
    Some(Uint8Array::new_with_byte_offset_and_length(&buffer, offset, length).to_vec())
}

fn preload_source(file: &JsValue) -> Result<PreloadFile, ExportError> {
    if let Some(url) = file.as_string() {
        return Ok(PreloadFile::Url(url));
    }
    buffer_bytes(file)
        .map(PreloadFile::Bytes)
        .ok_or_else(|| ExportError::UnsupportedFile(file.js_typeof().as_string().unwrap_or_default()))
}

fn report(event: Event, result: Result<JsValue, JsValue>) {
    if let Err(thrown) = result {
        warn!(event = %event, error = %error_message(&thrown), "Listener threw");
    }
}

fn js_handler(event: Event, f: Function) -> Handler {
    match event {
        Event::Stdout => Handler::stdout(move |line| {
            report(event, f.call1(&JsValue::NULL, &JsValue::from_str(line)))
        }),
        Event::Stderr => Handler::stderr(move |line| {
            report(event, f.call1(&JsValue::NULL, &JsValue::from_str(line)))
        }),
        Event::Progress => Handler::progress(move |current, total| {
            let (current, total) = (JsValue::from_f64(current), JsValue::from_f64(total));
            report(event, f.call2(&JsValue::NULL, &current, &total))
        }),
        Event::Start => Handler::start(move || report(event, f.call0(&JsValue::NULL))),
    }
}

/// A game session bound to one canvas
#[wasm_bindgen]
pub struct GodotSession {
    inner: Godot<JsRuntime>,
}

#[wasm_bindgen]
impl GodotSession {
    /// `new GodotSession(canvas, path, engine?)`
    ///
    /// `engine`, when given, replaces the page-wide `Engine` reference for
    /// this and every later session.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, path: String, engine: JsValue) -> Result<GodotSession, JsError> {
        let mut options = SessionOptions::new(canvas, path);
        if !engine.is_undefined() && !engine.is_null() {
            let runtime = JsRuntime::from_value(engine.clone())
                .ok_or_else(|| ExportError::NotConstructible(error_message(&engine)))?;
            options = options.with_runtime(runtime);
        }

        let inner = Godot::new(&shared_reference(), options)?;
        Ok(GodotSession { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn path(&self) -> String {
        self.inner.path().to_string()
    }

    /// Subscribe `handler` to `stdout`, `stderr`, `progress` or `start`;
    /// returns `handler`
    ///
    /// An exception thrown by `handler` is logged at `warn` and goes no
    /// further: it does not reach the runtime, stop the other listeners, or
    /// reject `start()`.
    pub fn on(&self, event: &str, handler: Function) -> Result<Function, JsError> {
        let event: Event = event.parse()?;
        self.inner.on(js_handler(event, handler.clone()));
        Ok(handler)
    }

    /// Start the game; resolves with `undefined` once started and once the
    /// start listeners ran, or rejects with the runtime's rejection value
    pub fn start(&self) -> Promise {
        let started = self.inner.start();
        future_to_promise(async move { settled(started.await.map(|()| JsValue::UNDEFINED)) })
    }

    /// Apply a TOML engine configuration; call before `start`
    pub fn configure(&self, toml: &str) -> Result<(), JsError> {
        let config = EngineConfig::from_toml_str(toml)?;
        config.apply_to_reference(&shared_reference())?;
        config.apply_to_engine(self.inner.engine());
        Ok(())
    }

    /// Load a file into the instance's file system; call before `start`
    ///
    /// `file` is a URL, an `ArrayBuffer`, or a view on one. `path` is
    /// required for buffers.
    #[wasm_bindgen(js_name = preloadFile)]
    pub fn preload_file(&self, file: JsValue, path: Option<String>) -> Result<Promise, JsError> {
        let file = preload_source(&file)?;
        let pending = self.inner.engine().preload_file(file, path.as_deref());
        Ok(future_to_promise(async move { settled(pending.await) }))
    }
}

/// Load the engine from `basePath` using the page-wide reference
#[wasm_bindgen(js_name = loadEngine)]
pub fn load_engine(base_path: &str) -> Promise {
    let pending = shared_reference().load(base_path);
    future_to_promise(async move { settled(pending.await) })
}

/// Unload the engine to free memory
#[wasm_bindgen(js_name = unloadEngine)]
pub fn unload_engine() -> Result<(), JsError> {
    shared_reference().unload()?;
    Ok(())
}

/// Check whether WebGL of the given major version (default 1) is available
#[wasm_bindgen(js_name = isWebGLAvailable)]
pub fn is_webgl_available(major_version: Option<u32>) -> Result<bool, JsError> {
    Ok(shared_reference().is_webgl_available(major_version)?)
}

/// Route `tracing` output to the console at `level` (default `info`)
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) -> Result<(), JsError> {
    logging::init(level.as_deref())?;
    Ok(())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::fake_engine;
    use js_sys::{DataView, Object, Uint16Array};
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    fn session(class: &JsValue) -> GodotSession {
        let canvas: HtmlCanvasElement = Object::new().unchecked_into();
        GodotSession::new(canvas, "game".to_string(), class.clone())
            .map_err(JsValue::from)
            .unwrap()
    }

    fn recorder(order: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Function {
        let order = Rc::clone(order);
        let closure = Closure::wrap(Box::new(move || order.borrow_mut().push(name)) as Box<dyn Fn()>);
        let f = closure.as_ref().unchecked_ref::<Function>().clone();
        closure.forget();
        f
    }

    #[wasm_bindgen_test]
    fn test_preload_source_reads_buffer_views() {
        assert_eq!(
            preload_source(&JsValue::from_str("res/level.pck")).unwrap(),
            PreloadFile::Url("res/level.pck".to_string())
        );

        let bytes = Uint8Array::from(&[1u8, 2, 3, 4, 5][..]);
        assert_eq!(preload_source(&bytes.buffer().into()).unwrap(), PreloadFile::Bytes(vec![1, 2, 3, 4, 5]));

        let view = DataView::new(&bytes.buffer(), 1, 3);
        assert_eq!(preload_source(&view.into()).unwrap(), PreloadFile::Bytes(vec![2, 3, 4]));

        let wide = Uint16Array::from(&[0x0102u16][..]);
        let PreloadFile::Bytes(raw) = preload_source(&wide.into()).unwrap() else {
            panic!("typed arrays are buffers");
        };
        assert_eq!(raw.len(), 2);

        assert!(matches!(
            preload_source(&JsValue::from_f64(7.0)),
            Err(ExportError::UnsupportedFile(kind)) if kind == "number"
        ));
    }

    #[wasm_bindgen_test]
    async fn test_preload_file_forwards_view_bytes() {
        let class = fake_engine::class();
        let session = session(&class);
        let bytes = Uint8Array::from(&[9u8, 8, 7][..]);
        let view = Uint8Array::new_with_byte_offset_and_length(&bytes.buffer(), 1, 2);

        let pending = session.preload_file(view.into(), Some("data.bin".to_string())).map_err(JsValue::from).unwrap();
        JsFuture::from(pending).await.unwrap();

        assert!(fake_engine::calls(&class).ends_with(r#"["preloadFile",{"0":8,"1":7},"data.bin"]]"#));
        assert!(session.preload_file(JsValue::NULL, None).is_err());
    }

    #[wasm_bindgen_test]
    fn test_on_returns_same_function() {
        let session = session(&fake_engine::class());
        let handler = Function::new_no_args("");

        let returned = session.on("stdout", handler.clone()).map_err(JsValue::from).unwrap();
        assert!(Object::is(&returned, &handler));
        assert!(session.on("resize", handler).is_err());
    }

    #[wasm_bindgen_test]
    fn test_stdout_reaches_listeners() {
        let class = fake_engine::class();
        let session = session(&class);
        let order = Rc::new(RefCell::new(Vec::new()));
        session.on("stdout", recorder(&order, "first")).map_err(JsValue::from).unwrap();
        session.on("stdout", recorder(&order, "second")).map_err(JsValue::from).unwrap();

        fake_engine::invoke(&fake_engine::last_instance(&class), "stdout", &[JsValue::from_str("ready")]);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[wasm_bindgen_test]
    async fn test_start_runs_listeners_past_a_throwing_one() {
        let class = fake_engine::class();
        let session = session(&class);
        let order = Rc::new(RefCell::new(Vec::new()));
        session.on("start", recorder(&order, "first")).map_err(JsValue::from).unwrap();
        session.on("start", Function::new_no_args("throw new Error('listener failed')")).map_err(JsValue::from).unwrap();
        session.on("start", recorder(&order, "last")).map_err(JsValue::from).unwrap();

        let resolved = JsFuture::from(session.start()).await.unwrap();
        assert!(resolved.is_undefined());
        assert_eq!(*order.borrow(), vec!["last", "first"]);
        assert!(fake_engine::calls(&class).ends_with(r#"["startGame","game","game.pck"]]"#));
    }

    #[wasm_bindgen_test]
    async fn test_start_rejects_with_runtime_value() {
        let class = fake_engine::class();
        let session = session(&class);
        let reason: JsValue = js_sys::TypeError::new("WebGL unavailable").into();
        fake_engine::set(&class, "rejectWith", &reason);

        let err = JsFuture::from(session.start()).await.unwrap_err();
        assert!(Object::is(&err, &reason));
    }
}
