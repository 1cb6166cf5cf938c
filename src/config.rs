//! Page-wide helper configuration.
//!
//! Defaults match what the server side expects: the `csrf.Token` meta tag,
//! the `X-CSRF-Token` header and `csrfToken` form field read by the CSRF
//! middleware, and the two timezone cookies on path `/` for a year.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{HelperError, Result};

/// Milliseconds in one day.
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Configuration shared by the request helpers and the timezone detector.
/// Every field has a default, so a JS caller only passes what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HelperConfig {
    // Requests
    pub cache_buster_param: String,
    pub csrf_meta_name: String,
    pub csrf_header: String,
    pub csrf_field_name: String,
    pub navigate_target: String,
    // Timezone cookies
    pub offset_cookie: String,
    pub dst_cookie: String,
    pub cookie_lifetime_days: u32,
    pub cookie_path: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            cache_buster_param: "lrt".into(),
            csrf_meta_name: "csrf.Token".into(),
            csrf_header: "X-CSRF-Token".into(),
            csrf_field_name: "csrfToken".into(),
            navigate_target: "_blank".into(),
            offset_cookie: "time_zone_offset".into(),
            dst_cookie: "time_zone_dst".into(),
            cookie_lifetime_days: 365,
            cookie_path: "/".into(),
        }
    }
}

impl HelperConfig {
    /// Read a config from a JS options object.
    ///
    /// `undefined`/`null` yield the defaults. Options that fail to
    /// deserialize or validate are logged and replaced by the defaults.
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }

        let parsed: Self = match serde_wasm_bindgen::from_value(options) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed helper options: {}", e);
                return Self::default();
            }
        };

        match parsed.validate() {
            Ok(()) => parsed,
            Err(e) => {
                log::warn!("Ignoring invalid helper options: {}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("cacheBusterParam", &self.cache_buster_param),
            ("csrfMetaName", &self.csrf_meta_name),
            ("csrfHeader", &self.csrf_header),
            ("csrfFieldName", &self.csrf_field_name),
            ("offsetCookie", &self.offset_cookie),
            ("dstCookie", &self.dst_cookie),
            ("cookiePath", &self.cookie_path),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(HelperError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.offset_cookie == self.dst_cookie {
            return Err(HelperError::Config(
                "offsetCookie and dstCookie must differ".into(),
            ));
        }
        if self.cookie_lifetime_days == 0 {
            return Err(HelperError::Config(
                "cookieLifetimeDays must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Cookie lifetime in milliseconds
    pub fn cookie_lifetime_ms(&self) -> u64 {
        u64::from(self.cookie_lifetime_days) * DAY_MS
    }
}
