//! In-page stand-in for the loader's `Engine` class
//!
//! Every call is appended to `Engine.calls`. `startGame` throws
//! `Engine.throwWith` or rejects with `Engine.rejectWith` when either is set.
//! Instances keep the callbacks handed to them as `stdout`, `stderr` and
//! `progress`.

use js_sys::{Array, Function, Reflect, JSON};
use wasm_bindgen::prelude::*;

const SOURCE: &str = r#"
const calls = [];
function Engine() {
    calls.push(['new']);
    Engine.instances.push(this);
}
Engine.calls = calls;
Engine.instances = [];
Engine.load = function (basePath) {
    calls.push(['load', basePath]);
    return Promise.resolve('loaded');
};
Engine.unload = function () {
    calls.push(['unload']);
};
Engine.isWebGLAvailable = function (major) {
    calls.push(['isWebGLAvailable', major === undefined ? null : major]);
    return (major === undefined ? 1 : major) <= 2;
};
Engine.setWebAssemblyFilenameExtension = function (ext) {
    calls.push(['setWebAssemblyFilenameExtension', ext]);
};
Engine.prototype.init = function (basePath) {
    calls.push(['init', basePath === undefined ? null : basePath]);
    return Promise.resolve();
};
Engine.prototype.preloadFile = function (file, path) {
    calls.push(['preloadFile', file, path === undefined ? null : path]);
    return Promise.resolve();
};
Engine.prototype.start = function (...args) {
    calls.push(['start'].concat(args));
    return Promise.resolve();
};
Engine.prototype.startGame = function (execName, mainPack) {
    calls.push(['startGame', execName, mainPack]);
    if (Engine.throwWith !== undefined) {
        throw Engine.throwWith;
    }
    return Engine.rejectWith === undefined ? Promise.resolve() : Promise.reject(Engine.rejectWith);
};
['setUnloadAfterInit', 'setCanvas', 'setCanvasResizedOnStart', 'setLocale', 'setExecutableName'].forEach(function (name) {
    Engine.prototype[name] = function (value) {
        calls.push([name, value]);
    };
});
Engine.prototype.setStdoutFunc = function (f) {
    calls.push(['setStdoutFunc']);
    this.stdout = f;
};
Engine.prototype.setStderrFunc = function (f) {
    calls.push(['setStderrFunc']);
    this.stderr = f;
};
Engine.prototype.setProgressFunc = function (f) {
    calls.push(['setProgressFunc']);
    this.progress = f;
};
return Engine;
"#;

/// A fresh `Engine` class with an empty call log
pub fn class() -> JsValue {
    Function::new_no_args(SOURCE).call0(&JsValue::NULL).unwrap()
}

/// The call log as JSON, one array per call
pub fn calls(class: &JsValue) -> String {
    let calls = Reflect::get(class, &JsValue::from_str("calls")).unwrap();
    JSON::stringify(&calls).unwrap().into()
}

pub fn set(class: &JsValue, key: &str, value: &JsValue) {
    Reflect::set(class, &JsValue::from_str(key), value).unwrap();
}

/// Most recently constructed instance
pub fn last_instance(class: &JsValue) -> JsValue {
    let instances: Array = Reflect::get(class, &JsValue::from_str("instances")).unwrap().into();
    instances.get(instances.length() - 1)
}

/// Call the callback an instance stored under `name`
pub fn invoke(instance: &JsValue, name: &str, args: &[JsValue]) {
    let callback: Function = Reflect::get(instance, &JsValue::from_str(name)).unwrap().into();
    let args: Array = args.iter().collect();
    callback.apply(&JsValue::NULL, &args).unwrap();
}
