//! # Page Helpers (WASM)
//!
//! Browser-side page helpers compiled to WebAssembly.
//!
//! ## Architecture
//!
//! ```text
//! getAJAX / postAJAX / sendPOST        setDstDetails
//!   ↓                                    ↓
//! RequestHelper                        TimezoneDetector
//!   ↓            ↓                       ↓               ↓
//! Transport   PageDocument           LocalCalendar   CookieStore
//! (XHR)       (meta tag, forms)      (js Date)       (document.cookie)
//! ```
//!
//! The two halves share nothing but the page-wide [`HelperConfig`].
//!
//! ## Usage
//!
//! ```javascript
//! import init, { getAJAX, postAJAX, sendPOST, setDstDetails } from './pkg/page_helpers_wasm.js';
//! await init();
//! setDstDetails();
//! getAJAX('/rates', { base: 'USD' }, (body) => render(JSON.parse(body)));
//! ```

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

// Modules
pub mod clock;
pub mod config;
pub mod cookies;
mod error;
pub mod page;
pub mod request;
pub mod timezone;
pub mod transport;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::HelperConfig;
pub use cookies::{CookieOptions, CookieStore, DocumentCookieStore, MemoryCookieStore};
pub use error::{ErrorCode, ErrorInfo, HelperError, Result};
pub use page::{BrowserDocument, HiddenForm, PageDocument};
pub use request::{RequestHelper, RequestParams};
pub use timezone::{
    BrowserCalendar, Hemisphere, LocalCalendar, OffsetSample, PersistedTimezone,
    TimezoneDetector, TimezoneFacts,
};
pub use transport::{Method, OutboundRequest, ReadyState, Transport, TransportResponse, XhrTransport};

thread_local! {
    static CONFIG: RefCell<HelperConfig> = RefCell::new(HelperConfig::default());
}

/// Snapshot of the page-wide configuration
pub fn current_config() -> HelperConfig {
    CONFIG.with(|config| config.borrow().clone())
}

type BrowserRequestHelper = RequestHelper<XhrTransport, BrowserDocument, SystemClock>;

fn browser_request_helper() -> Result<BrowserRequestHelper> {
    Ok(RequestHelper::new(
        XhrTransport::new()?,
        BrowserDocument::from_window()?,
        SystemClock,
        current_config(),
    ))
}

fn js_callback(callback: Option<js_sys::Function>) -> Option<impl FnOnce(String)> {
    callback.map(|f| {
        move |body: String| {
            if let Err(e) = f.call1(&JsValue::NULL, &JsValue::from_str(&body)) {
                log::warn!("Request callback threw: {:?}", e);
            }
        }
    })
}

fn to_js<T: serde::Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| HelperError::Internal(format!("serialization failed: {}", e)).into())
}

/// Initialize the helpers
///
/// Sets up logging. Timezone detection is not run here; the page calls
/// `setDstDetails()` when it wants the cookies written.
#[wasm_bindgen(start)]
pub fn init() {
    // Another module may already own the logger
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("Page helpers initialized");
}

/// Replace the page-wide configuration.
///
/// Unknown or invalid options fall back to the defaults. Returns the
/// configuration now in effect.
#[wasm_bindgen]
pub fn configure(options: JsValue) -> std::result::Result<JsValue, JsValue> {
    let config = HelperConfig::from_js(options);
    CONFIG.with(|current| *current.borrow_mut() = config.clone());
    to_js(&config)
}

/// GET `path?lrt=<now>&<params>`; `callback(responseText)` on HTTP 200.
#[wasm_bindgen(js_name = getAJAX)]
pub fn get_ajax(
    path: String,
    params: JsValue,
    callback: Option<js_sys::Function>,
) -> std::result::Result<(), JsValue> {
    let helper = browser_request_helper()?;
    let params = RequestParams::from_js(&params);
    let request = helper.build_get(&path, &params);
    let on_complete = js_callback(callback);

    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = helper.dispatch(request, on_complete).await {
            log::error!("Request helpers unusable: {}", e);
        }
    });
    Ok(())
}

/// POST form-urlencoded `params` to `path?lrt=<now>`; `callback(responseText)`
/// on HTTP 200.
#[wasm_bindgen(js_name = postAJAX)]
pub fn post_ajax(
    path: String,
    params: JsValue,
    callback: Option<js_sys::Function>,
) -> std::result::Result<(), JsValue> {
    let helper = browser_request_helper()?;
    let params = RequestParams::from_js(&params);
    let request = helper.build_post(&path, &params);
    let on_complete = js_callback(callback);

    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = helper.dispatch(request, on_complete).await {
            log::error!("Request helpers unusable: {}", e);
        }
    });
    Ok(())
}

/// POST `params` through a hidden form, opening the response in a new tab.
#[wasm_bindgen(js_name = sendPOST)]
pub fn send_post(path: String, params: JsValue) -> std::result::Result<(), JsValue> {
    let helper = browser_request_helper()?;
    let params = RequestParams::from_js(&params);
    helper.post_and_navigate(&path, &params)?;
    Ok(())
}

/// Detect the UTC offset and DST status and write both timezone cookies.
///
/// Returns `{ offsetMinutes, dstActive, hemisphere, expiresMillis }`.
#[wasm_bindgen(js_name = setDstDetails)]
pub fn set_dst_details() -> std::result::Result<JsValue, JsValue> {
    let store = DocumentCookieStore::from_window()?;
    let detector = TimezoneDetector::new(SystemClock, BrowserCalendar, current_config());
    let facts = detector.detect_and_persist(&store)?;
    log::info!(
        "Timezone cookies written: offset {} min, dst {}",
        facts.offset_minutes,
        facts.dst_active
    );
    to_js(&facts)
}

/// Read back the timezone cookies: `{ offsetMinutes, dstActive }` or `null`.
#[wasm_bindgen(js_name = readTimezoneCookies)]
pub fn read_timezone_cookies() -> std::result::Result<JsValue, JsValue> {
    let store = DocumentCookieStore::from_window()?;
    match PersistedTimezone::read(&store, &current_config()) {
        Some(persisted) => to_js(&persisted),
        None => Ok(JsValue::NULL),
    }
}
