//! XMLHttpRequest transport for WASM
//!
//! Opens an asynchronous XHR, sets the request headers, sends, and resolves
//! once `readyState` reaches DONE. The `onreadystatechange` handler is kept
//! alive only for the lifetime of the request.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::XmlHttpRequest;

use super::{OutboundRequest, ReadyState, Transport, TransportResponse};
use crate::error::{HelperError, Result};

/// Browser transport backed by `XMLHttpRequest`
#[derive(Debug, Clone, Copy)]
pub struct XhrTransport;

impl XhrTransport {
    /// Fails with [`HelperError::Unsupported`] when the page has no usable
    /// `XMLHttpRequest` constructor.
    pub fn new() -> Result<Self> {
        XmlHttpRequest::new().map_err(unavailable)?;
        Ok(Self)
    }
}

fn unavailable(e: JsValue) -> HelperError {
    HelperError::Unsupported(format!("XMLHttpRequest unavailable: {:?}", e))
}

type ReadyStateHandler = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Promise that resolves once the XHR reports DONE.
///
/// Must be installed before `send()`. Network failures also end in DONE
/// (with status 0), so the promise never rejects. A request that never
/// completes leaves it pending.
fn done_promise(xhr: &XmlHttpRequest) -> (Promise, ReadyStateHandler) {
    let handler: ReadyStateHandler = Rc::new(RefCell::new(None));

    let promise = Promise::new(&mut |resolve, _reject| {
        let watched = xhr.clone();
        let on_change = Closure::wrap(Box::new(move || {
            if ReadyState::from(watched.ready_state()) == ReadyState::Done {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }) as Box<dyn FnMut()>);

        xhr.set_onreadystatechange(Some(on_change.as_ref().unchecked_ref()));
        *handler.borrow_mut() = Some(on_change);
    });

    (promise, handler)
}

#[async_trait(?Send)]
impl Transport for XhrTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse> {
        let xhr = XmlHttpRequest::new().map_err(unavailable)?;

        xhr.open_with_async(request.method.as_str(), &request.url, true)
            .map_err(|e| HelperError::Transport(format!("open failed: {:?}", e)))?;

        for (name, value) in &request.headers {
            xhr.set_request_header(name, value)
                .map_err(|e| HelperError::Transport(format!("set header {} failed: {:?}", name, e)))?;
        }

        let (done, handler) = done_promise(&xhr);

        let sent = match request.body.as_deref() {
            Some(body) => xhr.send_with_opt_str(Some(body)),
            None => xhr.send(),
        };
        if let Err(e) = sent {
            xhr.set_onreadystatechange(None);
            return Err(HelperError::Transport(format!("send failed: {:?}", e)));
        }

        log::debug!("{} {} dispatched", request.method.as_str(), request.url);

        let completed = JsFuture::from(done).await;
        xhr.set_onreadystatechange(None);
        handler.borrow_mut().take();
        completed.map_err(|e| HelperError::Transport(format!("completion failed: {:?}", e)))?;

        Ok(TransportResponse {
            ready_state: ReadyState::from(xhr.ready_state()),
            status: xhr.status().unwrap_or(0),
            body: xhr.response_text().ok().flatten().unwrap_or_default(),
        })
    }
}
