//! Request parameters

use js_sys::{Array, Object};
use wasm_bindgen::{JsCast, JsValue};

use super::encoding::encode_pairs;

/// Ordered key/value parameters for a request.
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Percent-encoded `key=value` pairs joined with `&`
    pub fn encode(&self) -> String {
        encode_pairs(self.iter())
    }

    /// Read the own enumerable properties of a JS value, in
    /// `Object.entries` order.
    ///
    /// `undefined` and `null` give empty params. Primitives are boxed first,
    /// so a string gives one `index=char` pair per UTF-16 unit and numbers
    /// or booleans give nothing. Values are stringified the way
    /// `String(value)` does.
    pub fn from_js(value: &JsValue) -> Self {
        if value.is_undefined() || value.is_null() {
            return Self::new();
        }

        let mut params = Self::new();
        let entries = Object::entries(value.unchecked_ref::<Object>());
        for entry in entries.iter() {
            let pair: Array = entry.unchecked_into();
            let key = pair.get(0).as_string().unwrap_or_default();
            params.insert(key, js_to_string(&pair.get(1)));
        }
        params
    }
}

/// `String(value)`
fn js_to_string(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if value.is_undefined() {
        return "undefined".into();
    }
    if value.is_null() {
        return "null".into();
    }
    value.unchecked_ref::<Object>().to_string().into()
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
