//! Parsing the `option` argument of `retype()` and `setTrigger()`.
//!
//! - a function becomes the rewrite, called with `this` set to the element
//! - a string is split into trigger characters
//! - an array contributes the characters of each string element
//! - a falsy value keeps the current rewrite
//!
//! Anything else disables highlighting.

use js_sys::{Array, Function};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use retype_core::{Rewrite, TriggerSpec};

/// A JavaScript rewrite callback.
///
/// Called with the element as `this` and the current markup (caret marker
/// included) as its argument. A string return value becomes the new markup;
/// otherwise whatever the callback left in the element is used.
pub struct JsRewrite {
    element: HtmlElement,
    function: Function,
}

impl JsRewrite {
    pub fn new(element: HtmlElement, function: Function) -> Self {
        Self { element, function }
    }
}

impl Rewrite for JsRewrite {
    fn rewrite(&self, content: &str) -> String {
        match self.function.call1(&self.element, &JsValue::from_str(content)) {
            Ok(value) => value.as_string().unwrap_or_else(|| self.element.inner_html()),
            Err(e) => {
                tracing::warn!(target: "retype::browser", error = ?e, "rewrite callback threw");
                self.element.inner_html()
            }
        }
    }
}

/// Interpret `option` for `element`.
pub fn parse_option(element: &HtmlElement, option: &JsValue) -> TriggerSpec {
    if option.is_falsy() {
        return TriggerSpec::Keep;
    }

    if let Some(function) = option.dyn_ref::<Function>() {
        return TriggerSpec::rewrite(JsRewrite::new(element.clone(), function.clone()));
    }

    if let Some(triggers) = option.as_string() {
        return TriggerSpec::chars(&triggers);
    }

    if Array::is_array(option) {
        let triggers: Vec<char> = Array::from(option)
            .iter()
            .filter_map(|item| item.as_string())
            .flat_map(|item| item.chars().collect::<Vec<_>>())
            .collect();
        return TriggerSpec::Triggers(triggers);
    }

    tracing::debug!(target: "retype::browser", ?option, "unrecognized trigger option");
    TriggerSpec::Triggers(Vec::new())
}
