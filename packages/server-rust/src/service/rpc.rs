//! `RpcService`: a service object that answers HTTP calls for one contract.
//!
//! Lifecycle: construct once, wire one handler per operation with
//! [`RpcService::handle`], then hand clones to the transport. Every clone
//! shares the same registry.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use cedar_core::{Operation, ServiceContract, JSON_CONTENT_TYPE};
use http::header::{ALLOW, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderValue, Method, Request};
use http_body_util::LengthLimitError;
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing::debug;

use super::config::DispatchConfig;
use super::context::CallContext;
use super::dispatcher::{Call, Dispatcher};
use super::error::{DispatchError, HandlerError};
use super::middleware::{MetricsLayer, MetricsService};
use super::registry::OperationRegistry;
use super::selector::select_operation;

type CallPipeline<S> = MetricsService<Dispatcher<S>>;

struct RpcInner<S> {
    registry: Arc<OperationRegistry<S>>,
    pipeline: CallPipeline<S>,
    config: DispatchConfig,
    next_call_id: AtomicU64,
}

/// Typed RPC endpoint for service `S`.
///
/// Implements `tower::Service<http::Request<Body>>` with `Error =
/// Infallible`: every failure becomes a status code and a `{"message"}` body,
/// so it can be mounted with `axum::Router::route_service`.
pub struct RpcService<S> {
    inner: Arc<RpcInner<S>>,
}

impl<S> Clone for RpcService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ServiceContract> RpcService<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DispatchConfig) -> Self {
        let registry = Arc::new(OperationRegistry::new());
        let pipeline = ServiceBuilder::new()
            .layer(MetricsLayer::for_contract::<S>())
            .service(Dispatcher::new(Arc::clone(&registry)));

        Self {
            inner: Arc::new(RpcInner {
                registry,
                pipeline,
                config,
                next_call_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers the handler for `Op`, replacing any previous one.
    ///
    /// Handlers are synchronous and run inline on the task that polls the
    /// call, which is a tokio worker when served over HTTP. A handler that
    /// blocks holds that worker, and the transport timeout cannot answer
    /// until it returns; move blocking work behind
    /// `tokio::task::block_in_place` or a dedicated thread.
    ///
    /// Returns `self` so registrations chain.
    pub fn handle<Op>(
        &self,
        handler: impl Fn(&CallContext, Op::Request) -> Result<Op::Response, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self
    where
        Op: Operation<Service = S>,
    {
        self.inner.registry.register::<Op>(handler);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        S::NAME
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry<S> {
        &self.inner.registry
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// A fresh context for an in-process call.
    #[must_use]
    pub fn local_context(&self) -> CallContext {
        CallContext::local(S::NAME).with_call_id(self.next_call_id())
    }

    fn next_call_id(&self) -> u64 {
        self.inner.next_call_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Runs an already-selected call through the pipeline.
    ///
    /// # Errors
    ///
    /// Any dispatch-stage `DispatchError`: unknown or unregistered
    /// operation, undecodable payload, handler failure, encoding failure.
    pub async fn dispatch(
        &self,
        ctx: CallContext,
        operation: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes, DispatchError> {
        self.inner
            .pipeline
            .clone()
            .oneshot(Call::new(ctx, operation, payload))
            .await
    }

    /// Typed in-process call: encodes `request`, dispatches, decodes the reply.
    ///
    /// # Errors
    ///
    /// Same as [`RpcService::dispatch`]. A request that cannot be encoded is
    /// a `BadRequest`; a reply that cannot be decoded is an `Encoding` error.
    pub async fn call<Op>(
        &self,
        ctx: CallContext,
        request: &Op::Request,
    ) -> Result<Op::Response, DispatchError>
    where
        Op: Operation<Service = S>,
    {
        let payload = serde_json::to_vec(request).map_err(DispatchError::bad_request)?;
        let bytes = self.dispatch(ctx, Op::NAME, payload).await?;
        serde_json::from_slice(&bytes).map_err(|e| DispatchError::Encoding {
            reason: e.to_string(),
        })
    }

    /// Answers one HTTP request.
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let call_id = self.next_call_id();

        let outcome = match self.prepare(call_id, parts, body).await {
            Ok(call) => self.inner.pipeline.clone().oneshot(call).await,
            Err(err) => {
                debug!(
                    service = S::NAME,
                    call_id,
                    error = %err,
                    "call rejected before dispatch"
                );
                Err(err)
            }
        };

        match outcome {
            Ok(bytes) => ([(CONTENT_TYPE, JSON_CONTENT_TYPE)], bytes).into_response(),
            Err(err) => error_response(&err),
        }
    }

    /// Transport checks and operation selection.
    async fn prepare(&self, call_id: u64, parts: Parts, body: Body) -> Result<Call, DispatchError> {
        let config = &self.inner.config;
        if config.require_post && parts.method != Method::POST {
            return Err(DispatchError::MethodNotAllowed {
                method: parts.method,
            });
        }

        let payload = read_body(body, config.max_request_bytes).await?;
        let ctx = CallContext::from_parts(call_id, S::NAME, parts);
        let operation = select_operation(S::SELECTOR, &ctx, &payload)?;
        Ok(Call {
            ctx,
            operation,
            payload,
        })
    }
}

impl<S: ServiceContract> Default for RpcService<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ServiceContract> Service<Request<Body>> for RpcService<S> {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.serve(request).await) })
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, DispatchError> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let source = err.into_inner();
        if source.is::<LengthLimitError>() {
            DispatchError::PayloadTooLarge { limit }
        } else {
            DispatchError::bad_request(format!("failed to read request body: {source}"))
        }
    })
}

fn error_response(err: &DispatchError) -> Response {
    let mut response = (err.status_code(), Json(err.to_body())).into_response();
    if matches!(err, DispatchError::MethodNotAllowed { .. }) {
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST"));
    }
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
