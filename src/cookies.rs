//! Cookie persistence
//!
//! Names and values are encoded the way the page's cookie library encodes
//! them: percent-encoding restricted to the bytes a cookie cannot carry.

use std::cell::RefCell;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlDocument;

use crate::error::{HelperError, Result};

/// Bytes outside the cookie-octet grammar, plus `%` itself
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Names additionally may not contain separators
const COOKIE_NAME: &AsciiSet = &COOKIE_VALUE.add(b'=').add(b'(').add(b')');

/// Attributes attached to a written cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Expiry, in epoch milliseconds
    pub expires_millis: u64,
    pub path: String,
}

/// Name/value cookie storage
pub trait CookieStore {
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()>;
    fn get(&self, name: &str) -> Option<String>;
}

/// `name=value; expires=<date>; path=<path>`
///
/// `expires` must already be an HTTP date (`toUTCString()` format).
pub fn serialize_cookie(name: &str, value: &str, expires: &str, path: &str) -> String {
    format!(
        "{}={}; expires={}; path={}",
        utf8_percent_encode(name, COOKIE_NAME),
        utf8_percent_encode(value, COOKIE_VALUE),
        expires,
        path
    )
}

/// Find a cookie in a `document.cookie` string and decode its value.
///
/// A value wrapped in double quotes is unquoted.
pub fn parse_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim_start().split_once('='))
        .find(|(key, _)| percent_decode_str(key).decode_utf8_lossy() == name)
        .map(|(_, value)| {
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            percent_decode_str(value).decode_utf8_lossy().into_owned()
        })
}

/// [`CookieStore`] over `document.cookie`
#[derive(Debug, Clone)]
pub struct DocumentCookieStore {
    document: HtmlDocument,
}

impl DocumentCookieStore {
    pub fn new(document: HtmlDocument) -> Self {
        Self { document }
    }

    pub fn from_window() -> Result<Self> {
        let document = web_sys::window()
            .ok_or_else(|| HelperError::Unsupported("No window object".into()))?
            .document()
            .ok_or_else(|| HelperError::Unsupported("No document object".into()))?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| HelperError::Unsupported("Document is not an HTML document".into()))?;
        Ok(Self::new(document))
    }
}

impl CookieStore for DocumentCookieStore {
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let expires: String = js_sys::Date::new(&JsValue::from_f64(options.expires_millis as f64))
            .to_utc_string()
            .into();
        let cookie = serialize_cookie(name, value, &expires, &options.path);
        log::debug!("Setting cookie {}", cookie);
        self.document
            .set_cookie(&cookie)
            .map_err(|e| HelperError::Cookie(format!("Failed to set {}: {:?}", name, e)))
    }

    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.document.cookie().ok()?;
        parse_cookie(&cookies, name)
    }
}

/// A cookie held by [`MemoryCookieStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

/// In-memory [`CookieStore`] for hosts without a document
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: RefCell<Vec<StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cookie, in the order first written
    pub fn cookies(&self) -> Vec<StoredCookie> {
        self.cookies.borrow().clone()
    }

    pub fn options(&self, name: &str) -> Option<CookieOptions> {
        self.cookies
            .borrow()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.options.clone())
    }
}

impl CookieStore for MemoryCookieStore {
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let mut cookies = self.cookies.borrow_mut();
        let cookie = StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            options: options.clone(),
        };
        match cookies.iter_mut().find(|c| c.name == name) {
            Some(existing) => *existing = cookie,
            None => cookies.push(cookie),
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .borrow()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_cookie() {
        assert_eq!(
            serialize_cookie("time_zone_offset", "-300", "Fri, 16 Oct 2026 00:00:00 GMT", "/"),
            "time_zone_offset=-300; expires=Fri, 16 Oct 2026 00:00:00 GMT; path=/"
        );
    }

    #[test]
    fn test_serialize_escapes_separators() {
        let cookie = serialize_cookie("a=b", "x; y,z", "never", "/");
        assert!(cookie.starts_with("a%3Db=x%3B%20y%2Cz;"));
    }

    #[test]
    fn test_parse_cookie() {
        let header = "csrfCookie=abc; time_zone_offset=120; time_zone_dst=1";
        assert_eq!(parse_cookie(header, "time_zone_offset").as_deref(), Some("120"));
        assert_eq!(parse_cookie(header, "time_zone_dst").as_deref(), Some("1"));
        assert_eq!(parse_cookie(header, "time_zone"), None);
        assert_eq!(parse_cookie("", "time_zone_dst"), None);
    }

    #[test]
    fn test_parse_cookie_decodes_and_unquotes() {
        assert_eq!(
            parse_cookie("note=\"hello%20world\"", "note").as_deref(),
            Some("hello world")
        );
        assert_eq!(parse_cookie("a%3Db=1", "a=b").as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryCookieStore::new();
        let first = CookieOptions {
            expires_millis: 1,
            path: "/".into(),
        };
        let second = CookieOptions {
            expires_millis: 2,
            path: "/".into(),
        };

        store.set("time_zone_dst", "0", &first).unwrap();
        store.set("time_zone_dst", "1", &second).unwrap();

        assert_eq!(store.get("time_zone_dst").as_deref(), Some("1"));
        assert_eq!(store.options("time_zone_dst"), Some(second));
        assert_eq!(store.cookies().len(), 1);
        assert_eq!(store.get("missing"), None);
    }
}
