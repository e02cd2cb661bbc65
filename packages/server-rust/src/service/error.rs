//! Error taxonomy for dispatched calls.
//!
//! Every failure is resolved inside the call that produced it: it turns into
//! a status code and a `{"message"}` body and never escapes the call.

use cedar_core::ErrorBody;
use http::{Method, StatusCode};

// ---------------------------------------------------------------------------
// HandlerError
// ---------------------------------------------------------------------------

/// Failure reported by a handler.
///
/// The message is sent to the client verbatim. The dispatcher never inspects
/// or reclassifies it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate form joins the context chain: "outer: inner".
        Self::new(format!("{err:#}"))
    }
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Terminal rejection or failure of a single call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("method not allowed: {method}")]
    MethodNotAllowed { method: Method },
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("missing operation selector `{param}`")]
    MissingOperation { param: &'static str },
    #[error("invalid function: {name}")]
    UnknownOperation { name: String },
    #[error("no handler registered for {service}.{operation}")]
    OperationNotRegistered {
        service: &'static str,
        operation: &'static str,
    },
    #[error("bad request: {reason}")]
    BadRequest { reason: String },
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("failed to encode response: {reason}")]
    Encoding { reason: String },
}

impl DispatchError {
    pub(crate) fn bad_request(err: impl std::fmt::Display) -> Self {
        Self::BadRequest {
            reason: err.to_string(),
        }
    }

    /// Transport status for this error.
    ///
    /// Misconfiguration and handler failures are server errors; anything the
    /// client could fix by changing its request is a 4xx.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingOperation { .. }
            | Self::UnknownOperation { .. }
            | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::OperationNotRegistered { .. } | Self::Handler(_) | Self::Encoding { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::MissingOperation { .. } => "missing_operation",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::OperationNotRegistered { .. } => "operation_not_registered",
            Self::BadRequest { .. } => "bad_request",
            Self::Handler(_) => "handler_error",
            Self::Encoding { .. } => "encoding_error",
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Client-visible error body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.to_string())
    }
}
