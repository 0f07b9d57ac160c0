//! JsRetype - the handle returned to JavaScript.

use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use retype_browser::Retype;

use crate::option::parse_option;
use crate::types::JsRetypeConfig;

/// Attach retype to an editable element.
///
/// `option` is a trigger string, an array of trigger strings, or a rewrite
/// function. Calling this again on the same element reconfigures it and keeps
/// its undo history.
#[wasm_bindgen]
pub fn retype(element: HtmlElement, option: JsValue, config: JsValue) -> Result<JsRetype, JsError> {
    let config = JsRetypeConfig::from_js_config(config)?;
    let trigger = parse_option(&element, &option);
    let inner = retype_browser::retype(&element, trigger, config.into())
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(JsRetype { inner, element })
}

/// A bound element.
#[wasm_bindgen]
pub struct JsRetype {
    inner: Retype,
    element: HtmlElement,
}

#[wasm_bindgen]
impl JsRetype {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.id().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn element(&self) -> HtmlElement {
        self.element.clone()
    }

    #[wasm_bindgen(js_name = isAttached)]
    pub fn is_attached(&self) -> bool {
        self.inner.is_attached()
    }

    /// Get the current markup, or `undefined` once detached.
    #[wasm_bindgen]
    pub fn content(&self) -> Option<String> {
        self.inner.content()
    }

    /// Replace the markup as one undoable step.
    #[wasm_bindgen(js_name = setContent)]
    pub fn set_content(&self, content: &str) -> bool {
        self.inner.set_content(content)
    }

    /// Swap the trigger option. History is kept.
    #[wasm_bindgen(js_name = setTrigger)]
    pub fn set_trigger(&self, option: JsValue) -> bool {
        self.inner.set_trigger(parse_option(&self.element, &option))
    }

    /// Register a callback receiving the new markup after each change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) -> bool {
        self.inner.on_change(move |content| {
            let this = JsValue::null();
            if let Err(e) = callback.call1(&this, &JsValue::from_str(content)) {
                tracing::warn!(target: "retype::browser", error = ?e, "onChange callback threw");
            }
        })
    }

    #[wasm_bindgen]
    pub fn undo(&self) -> bool {
        self.inner.undo()
    }

    #[wasm_bindgen]
    pub fn redo(&self) -> bool {
        self.inner.redo()
    }

    /// Remove listeners and forget history.
    #[wasm_bindgen]
    pub fn detach(&self) -> bool {
        self.inner.detach()
    }
}
