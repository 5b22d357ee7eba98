use wasm_bindgen::prelude::*;

use crate::codegen::{CompileMode, CompileOptions};

#[wasm_bindgen]
pub fn compile_mapping_config(
    config_json: &str,
    registry_json: &str,
    permissive: bool,
) -> Result<String, JsValue> {
    let mode = if permissive {
        CompileMode::Permissive
    } else {
        CompileMode::Strict
    };
    crate::compile_json(config_json, registry_json, CompileOptions { mode })
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
