use modguid_core::catalog::HostCatalog;
use modguid_core::core_api::Engine;
use modguid_core::{CoreConfig, CounterScope};
use modguid_render::{
    JsonStyle, TextRenderOptions, TextStyle, render_json_full, render_text_with_options,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WebRenderOptions {
    pub json_output: bool,
    pub verbose: bool,
    pub per_type_counters: bool,
    /// Host catalog document, same shape as the CLI's `--catalog` file.
    pub catalog: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct WebError {
    code: &'static str,
    message: String,
}

#[derive(Debug, Clone, Serialize)]
struct WebErrorPayload {
    code: String,
    message: String,
}

impl WebError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_js_value(&self) -> JsValue {
        let payload = WebErrorPayload {
            code: self.code.to_string(),
            message: self.message.clone(),
        };
        serde_wasm_bindgen::to_value(&payload).unwrap_or_else(|_| {
            JsValue::from_str(&format!("{}: {}", payload.code, payload.message))
        })
    }
}

#[wasm_bindgen]
pub fn render_save_text(save_bytes: &[u8], options: JsValue) -> Result<String, JsValue> {
    let parsed_options = parse_options(options).map_err(|err| err.to_js_value())?;
    render_save_text_impl(save_bytes, &parsed_options).map_err(|err| err.to_js_value())
}

fn render_save_text_impl(
    save_bytes: &[u8],
    options: &WebRenderOptions,
) -> Result<String, WebError> {
    if save_bytes.is_empty() {
        return Err(WebError::new(
            "unsupported_file",
            "The uploaded file is empty. Please provide a ModdedSaveFile.gwsave file.",
        ));
    }

    let engine = build_engine(options)?;
    let session = engine
        .open_bytes(save_bytes)
        .map_err(|err| WebError::new("parse_failed", err.to_string()))?;

    if options.json_output {
        let value = render_json_full(&session, JsonStyle::CanonicalV1);
        return serde_json::to_string_pretty(&value).map_err(|err| {
            WebError::new(
                "render_failed",
                format!("failed to serialize rendered JSON output: {err}"),
            )
        });
    }

    Ok(render_text_with_options(
        &session,
        TextStyle::Summary,
        TextRenderOptions {
            verbose: options.verbose,
        },
    ))
}

fn build_engine(options: &WebRenderOptions) -> Result<Engine, WebError> {
    let mut config = CoreConfig::default();
    if options.per_type_counters {
        config.counter_scope = CounterScope::PerType;
    }
    let engine = Engine::with_config(config)
        .map_err(|err| WebError::new("invalid_options", err.to_string()))?;

    let Some(raw_catalog) = options.catalog.as_ref() else {
        return Ok(engine);
    };
    let bytes = serde_json::to_vec(raw_catalog)
        .map_err(|err| WebError::new("invalid_options", err.to_string()))?;
    let catalog = HostCatalog::from_json_slice(&bytes, engine.config().base_offset)
        .map_err(|err| WebError::new("invalid_options", format!("Invalid catalog: {err}")))?;
    engine
        .with_catalog(catalog)
        .map_err(|err| WebError::new("invalid_options", format!("Invalid catalog: {err}")))
}

fn parse_options(options: JsValue) -> Result<WebRenderOptions, WebError> {
    if options.is_null() || options.is_undefined() {
        return Ok(WebRenderOptions::default());
    }

    serde_wasm_bindgen::from_value(options).map_err(|err| {
        WebError::new(
            "invalid_options",
            format!("Failed to parse web render options: {err}"),
        )
    })
}
