//! Raw bindings to the loader's `Engine` class and its instances

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

#[wasm_bindgen]
extern "C" {
    /// The `Engine` class object published by the loader script
    #[derive(Debug, Clone)]
    pub type EngineClass;

    #[wasm_bindgen(method, catch)]
    pub fn load(this: &EngineClass, base_path: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method)]
    pub fn unload(this: &EngineClass);

    #[wasm_bindgen(method, js_name = isWebGLAvailable)]
    pub fn is_webgl_available(this: &EngineClass, major_version: Option<u32>) -> bool;

    #[wasm_bindgen(method, js_name = setWebAssemblyFilenameExtension)]
    pub fn set_web_assembly_filename_extension(this: &EngineClass, extension: &str);

    /// An object created with `new Engine()`
    #[derive(Debug, Clone)]
    pub type EngineObject;

    #[wasm_bindgen(method, catch)]
    pub fn init(this: &EngineObject, base_path: Option<String>) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = preloadFile)]
    pub fn preload_file(this: &EngineObject, file: &JsValue, path: Option<String>) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = startGame)]
    pub fn start_game(this: &EngineObject, exec_name: &str, main_pack: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, js_name = setUnloadAfterInit)]
    pub fn set_unload_after_init(this: &EngineObject, enabled: bool);

    #[wasm_bindgen(method, js_name = setCanvas)]
    pub fn set_canvas(this: &EngineObject, canvas: &HtmlCanvasElement);

    #[wasm_bindgen(method, js_name = setCanvasResizedOnStart)]
    pub fn set_canvas_resized_on_start(this: &EngineObject, enabled: bool);

    #[wasm_bindgen(method, js_name = setLocale)]
    pub fn set_locale(this: &EngineObject, locale: &str);

    #[wasm_bindgen(method, js_name = setExecutableName)]
    pub fn set_executable_name(this: &EngineObject, exec_name: &str);

    #[wasm_bindgen(method, js_name = setProgressFunc)]
    pub fn set_progress_func(this: &EngineObject, callback: &Function);

    #[wasm_bindgen(method, js_name = setStdoutFunc)]
    pub fn set_stdout_func(this: &EngineObject, callback: &Function);

    #[wasm_bindgen(method, js_name = setStderrFunc)]
    pub fn set_stderr_func(this: &EngineObject, callback: &Function);
}
