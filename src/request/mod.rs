//! Request helpers
//!
//! Three ways of talking to the server from a page:
//!
//! - GET with parameters in the query string
//! - POST with an `application/x-www-form-urlencoded` body
//! - POST through a hidden form whose response opens in a new browsing
//!   context
//!
//! Every URL carries a cache-buster (`?lrt=<epoch millis>`), and the page's
//! anti-forgery token is attached when the page has one. The token is read
//! from the page on every call.
//!
//! The callback-style helpers ([`RequestHelper::get_async`],
//! [`RequestHelper::post_async`]) invoke their callback only for a finished
//! request answered with HTTP 200. Anything else is dropped without a
//! callback, except fatal errors (no usable transport), which are returned.
//! [`RequestHelper::get`] and [`RequestHelper::post`] expose the
//! same requests with the failure kept as an error.

pub mod encoding;
mod params;

pub use params::RequestParams;

use crate::clock::Clock;
use crate::config::HelperConfig;
use crate::error::Result;
use crate::page::{HiddenForm, PageDocument};
use crate::transport::{Method, OutboundRequest, Transport};

use encoding::{cache_busted_url, encode_uri_component};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Builds and issues page requests over the given collaborators
pub struct RequestHelper<T, D, C> {
    transport: T,
    document: D,
    clock: C,
    config: HelperConfig,
}

impl<T, D, C> RequestHelper<T, D, C>
where
    T: Transport,
    D: PageDocument,
    C: Clock,
{
    pub fn new(transport: T, document: D, clock: C, config: HelperConfig) -> Self {
        Self {
            transport,
            document,
            clock,
            config,
        }
    }

    /// Current anti-forgery token, if the page has one
    pub fn anti_forgery_token(&self) -> Option<String> {
        self.document.meta_content(&self.config.csrf_meta_name)
    }

    fn cache_busted(&self, path: &str) -> String {
        cache_busted_url(path, &self.config.cache_buster_param, self.clock.now_millis())
    }

    fn with_token(&self, request: OutboundRequest) -> OutboundRequest {
        match self.anti_forgery_token() {
            Some(token) => request.with_header(self.config.csrf_header.as_str(), token),
            None => request,
        }
    }

    /// `GET path?lrt=<now>&<params>`
    ///
    /// The `&` after the cache-buster is always present, even with no params.
    pub fn build_get(&self, path: &str, params: &RequestParams) -> OutboundRequest {
        let url = format!("{}&{}", self.cache_busted(path), params.encode());
        self.with_token(OutboundRequest::new(Method::Get, url))
    }

    /// `POST path?lrt=<now>` with the params as a form-urlencoded body
    pub fn build_post(&self, path: &str, params: &RequestParams) -> OutboundRequest {
        let request = self.with_token(OutboundRequest::new(Method::Post, self.cache_busted(path)));
        request
            .with_header("Content-Type", FORM_URLENCODED)
            .with_body(params.encode())
    }

    /// The hidden form submitted by [`post_and_navigate`](Self::post_and_navigate)
    ///
    /// Field names and values are percent-encoded. The token field is named
    /// after the configured CSRF form field.
    pub fn build_navigate_form(&self, path: &str, params: &RequestParams) -> HiddenForm {
        let mut form = HiddenForm::post(self.cache_busted(path), self.config.navigate_target.as_str());
        for (key, value) in params.iter() {
            form.push_field(encode_uri_component(key), encode_uri_component(value));
        }
        if let Some(token) = self.anti_forgery_token() {
            form.push_field(
                self.config.csrf_field_name.as_str(),
                encode_uri_component(&token),
            );
        }
        form
    }

    /// Send a built request; `Ok` only for a finished HTTP 200
    pub async fn execute(&self, request: OutboundRequest) -> Result<String> {
        self.transport.send(request).await?.into_body()
    }

    pub async fn get(&self, path: &str, params: &RequestParams) -> Result<String> {
        self.execute(self.build_get(path, params)).await
    }

    pub async fn post(&self, path: &str, params: &RequestParams) -> Result<String> {
        self.execute(self.build_post(path, params)).await
    }

    /// Send a built request and hand the body to `on_complete` on success.
    ///
    /// Failures are logged and dropped. Only a fatal error is returned.
    pub async fn dispatch<F>(&self, request: OutboundRequest, on_complete: Option<F>) -> Result<()>
    where
        F: FnOnce(String),
    {
        let method = request.method;
        let url = request.url.clone();
        match self.execute(request).await {
            Ok(body) => {
                if let Some(callback) = on_complete {
                    callback(body);
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("{} {} dropped: {}", method.as_str(), url, e);
                Ok(())
            }
        }
    }

    pub async fn get_async<F>(
        &self,
        path: &str,
        params: &RequestParams,
        on_complete: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(String),
    {
        let request = self.build_get(path, params);
        self.dispatch(request, on_complete).await
    }

    pub async fn post_async<F>(
        &self,
        path: &str,
        params: &RequestParams,
        on_complete: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(String),
    {
        let request = self.build_post(path, params);
        self.dispatch(request, on_complete).await
    }

    /// Submit the params through a hidden form; the response opens in the
    /// configured target (a new browsing context by default).
    pub fn post_and_navigate(&self, path: &str, params: &RequestParams) -> Result<()> {
        let form = self.build_navigate_form(path, params);
        log::debug!("Submitting hidden form to {}", form.action);
        self.document.submit_form(&form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::HelperError;
    use crate::transport::{ReadyState, TransportResponse};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};

    const NOW: u64 = 1_700_000_000_000;

    struct MockTransport {
        response: Result<TransportResponse>,
        sent: RefCell<Vec<OutboundRequest>>,
    }

    impl MockTransport {
        fn answering(response: TransportResponse) -> Self {
            Self {
                response: Ok(response),
                sent: RefCell::new(Vec::new()),
            }
        }

        fn failing(error: HelperError) -> Self {
            Self {
                response: Err(error),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl Transport for MockTransport {
        async fn send(&self, request: OutboundRequest) -> Result<TransportResponse> {
            self.sent.borrow_mut().push(request);
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct MockDocument {
        token: Option<String>,
        submitted: RefCell<Vec<HiddenForm>>,
        token_reads: Cell<u32>,
    }

    impl MockDocument {
        fn with_token(token: &str) -> Self {
            Self {
                token: Some(token.into()),
                ..Default::default()
            }
        }
    }

    impl PageDocument for MockDocument {
        fn meta_content(&self, name: &str) -> Option<String> {
            assert_eq!(name, "csrf.Token");
            self.token_reads.set(self.token_reads.get() + 1);
            self.token.clone()
        }

        fn submit_form(&self, form: &HiddenForm) -> Result<()> {
            self.submitted.borrow_mut().push(form.clone());
            Ok(())
        }
    }

    fn helper(
        transport: MockTransport,
        document: MockDocument,
    ) -> RequestHelper<MockTransport, MockDocument, FixedClock> {
        RequestHelper::new(transport, document, FixedClock(NOW), HelperConfig::default())
    }

    fn params() -> RequestParams {
        RequestParams::new().with("from", "USD").with("to", "EUR & GBP")
    }

    #[test]
    fn test_get_url_and_token_header() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::with_token("s3cr3t"),
        );

        let request = helper.build_get("/rates", &params());
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "/rates?lrt=1700000000000&from=USD&to=EUR%20%26%20GBP"
        );
        assert_eq!(request.header("X-CSRF-Token"), Some("s3cr3t"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_get_without_params_keeps_separator() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::default(),
        );
        let request = helper.build_get("/ping", &RequestParams::new());
        assert_eq!(request.url, "/ping?lrt=1700000000000&");
    }

    #[test]
    fn test_post_body_and_headers() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::with_token("tok"),
        );

        let request = helper.build_post("/users/save", &params());
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "/users/save?lrt=1700000000000");
        assert_eq!(request.body.as_deref(), Some("from=USD&to=EUR%20%26%20GBP"));
        assert_eq!(
            request.headers,
            vec![
                ("X-CSRF-Token".to_string(), "tok".to_string()),
                ("Content-Type".to_string(), FORM_URLENCODED.to_string()),
            ]
        );
    }

    #[test]
    fn test_no_token_means_no_header() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::default(),
        );

        assert_eq!(helper.build_get("/a", &params()).header("X-CSRF-Token"), None);
        let post = helper.build_post("/a", &params());
        assert_eq!(post.header("X-CSRF-Token"), None);
        assert_eq!(post.header("Content-Type"), Some(FORM_URLENCODED));
    }

    #[test]
    fn test_token_is_read_on_every_request() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::with_token("tok"),
        );
        helper.build_get("/a", &params());
        helper.build_post("/b", &params());
        helper.build_navigate_form("/c", &params());
        assert_eq!(helper.document.token_reads.get(), 3);
    }

    #[test]
    fn test_callback_on_done_200() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "{\"ok\":true}")),
            MockDocument::default(),
        );

        let received = RefCell::new(None);
        block_on(helper.get_async("/rates", &params(), Some(|body: String| {
            *received.borrow_mut() = Some(body);
        })))
        .unwrap();

        assert_eq!(received.into_inner().as_deref(), Some("{\"ok\":true}"));
        assert_eq!(helper.transport.sent.borrow().len(), 1);
    }

    #[test]
    fn test_no_callback_on_error_status() {
        for status in [0u16, 204, 301, 404, 500] {
            let helper = helper(
                MockTransport::answering(TransportResponse::done(status, "nope")),
                MockDocument::default(),
            );
            let called = Cell::new(false);
            block_on(helper.post_async("/save", &params(), Some(|_: String| called.set(true))))
                .unwrap();
            assert!(!called.get(), "callback fired for status {}", status);
        }
    }

    #[test]
    fn test_no_callback_when_incomplete_or_transport_fails() {
        let incomplete = helper(
            MockTransport::answering(TransportResponse {
                ready_state: ReadyState::Loading,
                status: 200,
                body: "partial".into(),
            }),
            MockDocument::default(),
        );
        let called = Cell::new(false);
        block_on(incomplete.get_async("/a", &params(), Some(|_: String| called.set(true)))).unwrap();
        assert!(!called.get());

        let failing = helper(
            MockTransport::failing(HelperError::Transport("offline".into())),
            MockDocument::default(),
        );
        block_on(failing.get_async("/a", &params(), Some(|_: String| called.set(true)))).unwrap();
        assert!(!called.get());
    }

    #[test]
    fn test_missing_transport_is_returned() {
        let helper = helper(
            MockTransport::failing(HelperError::Unsupported("XMLHttpRequest unavailable".into())),
            MockDocument::default(),
        );
        let called = Cell::new(false);

        let result = block_on(helper.get_async("/a", &params(), Some(|_: String| called.set(true))));
        assert_eq!(
            result,
            Err(HelperError::Unsupported("XMLHttpRequest unavailable".into()))
        );
        assert!(block_on(helper.post_async("/b", &params(), None::<fn(String)>))
            .unwrap_err()
            .is_fatal());

        assert!(!called.get());
        assert_eq!(helper.transport.sent.borrow().len(), 2);
    }

    #[test]
    fn test_absent_callback_still_sends() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "ok")),
            MockDocument::default(),
        );
        block_on(helper.post_async("/fire", &params(), None::<fn(String)>)).unwrap();
        assert_eq!(helper.transport.sent.borrow().len(), 1);
    }

    #[test]
    fn test_result_paths_report_failures() {
        let ok = helper(
            MockTransport::answering(TransportResponse::done(200, "body")),
            MockDocument::default(),
        );
        assert_eq!(block_on(ok.get("/a", &params())), Ok("body".to_string()));

        let not_found = helper(
            MockTransport::answering(TransportResponse::done(404, "")),
            MockDocument::default(),
        );
        assert_eq!(
            block_on(not_found.post("/a", &params())),
            Err(HelperError::Status(404))
        );
    }

    #[test]
    fn test_navigate_form_with_token() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::with_token("a+b/c="),
        );

        helper
            .post_and_navigate("/report", &RequestParams::new().with("user name", "Zoë"))
            .unwrap();

        let submitted = helper.document.submitted.borrow();
        assert_eq!(submitted.len(), 1);
        let form = &submitted[0];
        assert_eq!(form.method, "post");
        assert_eq!(form.action, "/report?lrt=1700000000000");
        assert_eq!(form.target, "_blank");
        assert_eq!(
            form.fields,
            vec![
                ("user%20name".to_string(), "Zo%C3%AB".to_string()),
                ("csrfToken".to_string(), "a%2Bb%2Fc%3D".to_string()),
            ]
        );
        assert!(helper.transport.sent.borrow().is_empty());
    }

    #[test]
    fn test_navigate_form_without_token() {
        let helper = helper(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::default(),
        );
        let form = helper.build_navigate_form("/report", &params());
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.field("csrfToken"), None);
    }

    #[test]
    fn test_configured_names_are_used() {
        let config = HelperConfig {
            cache_buster_param: "t".into(),
            csrf_header: "X-XSRF".into(),
            csrf_field_name: "_token".into(),
            navigate_target: "_self".into(),
            ..Default::default()
        };
        let helper = RequestHelper::new(
            MockTransport::answering(TransportResponse::done(200, "")),
            MockDocument::with_token("tok"),
            FixedClock(7),
            config,
        );

        let get = helper.build_get("/a", &RequestParams::new().with("k", "v"));
        assert_eq!(get.url, "/a?t=7&k=v");
        assert_eq!(get.header("X-XSRF"), Some("tok"));

        let form = helper.build_navigate_form("/b", &RequestParams::new());
        assert_eq!(form.target, "_self");
        assert_eq!(form.field("_token"), Some("tok"));
    }
}
