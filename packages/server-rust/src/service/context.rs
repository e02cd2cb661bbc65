//! Per-call ambient data handed to handlers next to the typed request.

use std::collections::HashMap;

use axum::extract::Query;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri, Version};

/// Header set by the transport's request-id layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport metadata for a single call.
///
/// Owned by the call and lent to the handler as `&CallContext`, so handlers
/// can read headers or request extensions but cannot keep them past the call.
#[derive(Debug)]
pub struct CallContext {
    call_id: u64,
    service: &'static str,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
}

impl CallContext {
    /// Builds a context from the head of an inbound HTTP request.
    #[must_use]
    pub fn from_parts(call_id: u64, service: &'static str, parts: Parts) -> Self {
        Self {
            call_id,
            service,
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
        }
    }

    /// Context for an in-process call that never crossed a transport.
    #[must_use]
    pub fn local(service: &'static str) -> Self {
        Self {
            call_id: 0,
            service,
            method: Method::POST,
            uri: Uri::from_static("/"),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
        }
    }

    #[must_use]
    pub fn with_call_id(mut self, call_id: u64) -> Self {
        self.call_id = call_id;
        self
    }

    /// Replaces the headers, mainly for in-process calls that carry auth.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns a header as a string. Non-UTF-8 values read as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a decoded query-string parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&self.uri).ok()?;
        params.remove(name)
    }

    /// The transport-assigned request id, when the request-id layer ran.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }
}
