//! JSON wire format shared by servers and clients.

use serde::{Deserialize, Serialize};

/// Content type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Structured error body: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The empty record, returned by operations that produce no value.
///
/// Encodes as `{}` so clients always receive a JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {}
