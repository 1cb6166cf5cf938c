//! Error types for the page helpers
//!
//! Most failures in this crate never reach the page: the callback-style
//! request helpers swallow them. They still get a proper taxonomy so the
//! `Result`-returning paths and the JS exports can report them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, HelperError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Transport errors (1xx)
    TransportFailed = 100,
    UnexpectedStatus = 101,
    Incomplete = 102,

    // Document errors (2xx)
    DomError = 200,

    // Cookie errors (3xx)
    CookieError = 300,

    // Configuration errors (8xx)
    ConfigError = 800,

    // Environment errors (9xx)
    Unsupported = 900,
    InternalError = 901,
}

/// Main error type for the page helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HelperError {
    // ===== Transport Errors =====
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Request did not complete (ready state {0})")]
    Incomplete(u16),

    // ===== Document Errors =====
    #[error("DOM error: {0}")]
    Dom(String),

    // ===== Cookie Errors =====
    #[error("Cookie error: {0}")]
    Cookie(String),

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ===== Environment Errors =====
    #[error("Unsupported environment: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HelperError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            HelperError::Transport(_) => ErrorCode::TransportFailed,
            HelperError::Status(_) => ErrorCode::UnexpectedStatus,
            HelperError::Incomplete(_) => ErrorCode::Incomplete,
            HelperError::Dom(_) => ErrorCode::DomError,
            HelperError::Cookie(_) => ErrorCode::CookieError,
            HelperError::Config(_) => ErrorCode::ConfigError,
            HelperError::Unsupported(_) => ErrorCode::Unsupported,
            HelperError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether this error means the page cannot use the helpers at all
    ///
    /// Raised when a platform capability (window, document, XMLHttpRequest)
    /// is missing. There is no fallback transport.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HelperError::Unsupported(_))
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            HelperError::Transport(_) => {
                "The request could not be sent. Please check your connection.".into()
            }
            HelperError::Status(status) => {
                format!("The server answered with status {}.", status)
            }
            HelperError::Incomplete(_) => "The request did not finish.".into(),
            HelperError::Dom(_) => "The page could not be updated.".into(),
            HelperError::Cookie(_) => {
                "Failed to save cookies. Please check your browser settings.".into()
            }
            HelperError::Config(_) => "Invalid helper configuration.".into(),
            HelperError::Unsupported(_) => {
                "This browser does not support the required features.".into()
            }
            HelperError::Internal(_) => "An internal error occurred. Please report this bug.".into(),
        }
    }
}

/// Errors reach JS as an [`ErrorInfo`] object, or as the plain message if
/// that cannot be built.
impl From<HelperError> for JsValue {
    fn from(err: HelperError) -> Self {
        serde_wasm_bindgen::to_value(&ErrorInfo::from(&err))
            .unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
    }
}

/// Error information for JavaScript consumption
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub is_fatal: bool,
}

impl From<&HelperError> for ErrorInfo {
    fn from(err: &HelperError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
            is_fatal: err.is_fatal(),
        }
    }
}
