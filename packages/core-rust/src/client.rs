//! Typed HTTP client for Cedar services (requires the `client` feature).
//!
//! The client is the counterpart of the server-side dispatcher: it encodes an
//! operation's request as JSON, posts it to the service endpoint using the
//! service's selection convention, and decodes either the typed response or
//! the structured error body.

use std::marker::PhantomData;

use tracing::debug;

use crate::operation::{Operation, OperationSelector, ServiceContract};
use crate::wire::ErrorBody;

/// Errors returned by [`RpcClient::call`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connect, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("{service}.{operation} failed with status {status}: {message}")]
    Rpc {
        service: &'static str,
        operation: &'static str,
        status: u16,
        message: String,
    },
    /// The success body did not decode into the operation's response type.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an `Rpc` error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rpc { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client bound to one service endpoint, e.g. `http://localhost:8081/todos`.
pub struct RpcClient<S> {
    http: reqwest::Client,
    endpoint: String,
    _service: PhantomData<fn() -> S>,
}

impl<S> Clone for RpcClient<S> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            _service: PhantomData,
        }
    }
}

impl<S: ServiceContract> RpcClient<S> {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), endpoint)
    }

    /// Reuses an existing `reqwest` client (connection pool, timeouts, TLS).
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            _service: PhantomData,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Calls `Op` and decodes its typed response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rpc` when the server reports a failure,
    /// `ClientError::Transport` when no response arrives, and
    /// `ClientError::Decode` when the success body does not match
    /// `Op::Response`.
    pub async fn call<Op>(&self, request: &Op::Request) -> Result<Op::Response, ClientError>
    where
        Op: Operation<Service = S>,
    {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let OperationSelector::Named { param } = S::SELECTOR {
            builder = builder.query(&[(param, Op::NAME)]);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(
            service = S::NAME,
            operation = Op::NAME,
            status = status.as_u16(),
            bytes = body.len(),
            "rpc response received"
        );

        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        let message = serde_json::from_slice::<ErrorBody>(&body).map_or_else(
            |_| String::from_utf8_lossy(&body).into_owned(),
            |err| err.message,
        );
        Err(ClientError::Rpc {
            service: S::NAME,
            operation: Op::NAME,
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::echo::Echo;

    #[test]
    fn status_only_for_rpc_errors() {
        let err = ClientError::Rpc {
            service: "Todos",
            operation: "getTodo",
            status: 500,
            message: "todo not found".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            err.to_string(),
            "Todos.getTodo failed with status 500: todo not found"
        );

        let decode = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(ClientError::from(decode).status(), None);
    }

    #[test]
    fn clone_keeps_endpoint() {
        let client = RpcClient::<Echo>::new("http://localhost:9090/echo");
        assert_eq!(client.clone().endpoint(), "http://localhost:9090/echo");
    }
}
