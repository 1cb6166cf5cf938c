//! Page document access: anti-forgery token lookup and hidden-form submission

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlFormElement};

use crate::error::{HelperError, Result};

/// A transient, invisible form to be submitted once and discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenForm {
    pub method: &'static str,
    pub action: String,
    /// Browsing context the response opens in, e.g. `_blank`
    pub target: String,
    /// `(name, value)` of each hidden input, in document order
    pub fields: Vec<(String, String)>,
}

impl HiddenForm {
    pub fn post(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: "post",
            action: action.into(),
            target: target.into(),
            fields: Vec::new(),
        }
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// What the request helpers need from the page
pub trait PageDocument {
    /// `content` attribute of the `<meta>` element with the given name or id
    fn meta_content(&self, name: &str) -> Option<String>;

    /// Attach the form to the document, submit it, then detach it
    fn submit_form(&self, form: &HiddenForm) -> Result<()>;
}

/// [`PageDocument`] over the live `window.document`
#[derive(Debug, Clone)]
pub struct BrowserDocument {
    document: Document,
}

fn dom_error(action: &str, e: wasm_bindgen::JsValue) -> HelperError {
    HelperError::Dom(format!("{} failed: {:?}", action, e))
}

impl BrowserDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn from_window() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| HelperError::Unsupported("No window object".into()))?;
        let document = window
            .document()
            .ok_or_else(|| HelperError::Unsupported("No document object".into()))?;
        Ok(Self::new(document))
    }

    fn hidden_input(&self, name: &str, value: &str) -> Result<Element> {
        let input = self
            .document
            .create_element("input")
            .map_err(|e| dom_error("createElement(input)", e))?;
        input
            .set_attribute("type", "hidden")
            .map_err(|e| dom_error("setAttribute(type)", e))?;
        input
            .set_attribute("name", name)
            .map_err(|e| dom_error("setAttribute(name)", e))?;
        input
            .set_attribute("value", value)
            .map_err(|e| dom_error("setAttribute(value)", e))?;
        Ok(input)
    }

    /// Detached `<form>` element with one hidden input per field
    pub fn build_form(&self, form: &HiddenForm) -> Result<HtmlFormElement> {
        let element: HtmlFormElement = self
            .document
            .create_element("form")
            .map_err(|e| dom_error("createElement(form)", e))?
            .dyn_into()
            .map_err(|_| HelperError::Dom("created element is not a form".into()))?;

        element.set_target(&form.target);
        element
            .set_attribute("method", form.method)
            .map_err(|e| dom_error("setAttribute(method)", e))?;
        element
            .set_attribute("action", &form.action)
            .map_err(|e| dom_error("setAttribute(action)", e))?;

        for (name, value) in &form.fields {
            let input = self.hidden_input(name, value)?;
            element
                .append_child(&input)
                .map_err(|e| dom_error("appendChild(input)", e))?;
        }
        Ok(element)
    }
}

impl PageDocument for BrowserDocument {
    fn meta_content(&self, name: &str) -> Option<String> {
        self.document
            .get_elements_by_tag_name("meta")
            .named_item(name)?
            .get_attribute("content")
    }

    fn submit_form(&self, form: &HiddenForm) -> Result<()> {
        let body = self
            .document
            .body()
            .ok_or_else(|| HelperError::Dom("document has no body".into()))?;

        let element = self.build_form(form)?;
        body.append_child(&element)
            .map_err(|e| dom_error("appendChild(form)", e))?;

        element.submit().map_err(|e| dom_error("submit", e))?;

        // Navigation may already be under way; a leftover form is harmless.
        if let Err(e) = body.remove_child(&element) {
            log::warn!("Failed to remove submitted form: {:?}", e);
        }
        Ok(())
    }
}
