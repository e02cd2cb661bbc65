//! The dispatch core: resolve, look up, decode, invoke, encode.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use cedar_core::ServiceContract;
use tower::Service;

use super::context::CallContext;
use super::error::DispatchError;
use super::registry::OperationRegistry;

/// One inbound call after transport-level checks.
#[derive(Debug)]
pub struct Call {
    pub ctx: CallContext,
    /// Operation name as selected from the request. Not yet validated.
    pub operation: String,
    /// Serialized request payload.
    pub payload: Bytes,
}

impl Call {
    #[must_use]
    pub fn new(ctx: CallContext, operation: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            ctx,
            operation: operation.into(),
            payload: payload.into(),
        }
    }
}

type DispatchFuture = Pin<Box<dyn Future<Output = Result<Bytes, DispatchError>> + Send>>;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes a [`Call`] to the handler registered for its operation.
///
/// Holds no per-call state: every call owns its context and payload, so any
/// number of calls may run through clones of one dispatcher at once. The
/// handler runs when the returned future is polled.
pub struct Dispatcher<S> {
    registry: Arc<OperationRegistry<S>>,
    _service: PhantomData<fn() -> S>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            _service: PhantomData,
        }
    }
}

impl<S: ServiceContract> Dispatcher<S> {
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry<S>>) -> Self {
        Self {
            registry,
            _service: PhantomData,
        }
    }

    /// Runs one call to completion on the current thread.
    ///
    /// # Errors
    ///
    /// `UnknownOperation` if the service does not declare the name,
    /// `OperationNotRegistered` if its slot is empty, `BadRequest` if the
    /// payload does not decode, and `Handler`/`Encoding` from the slot.
    pub fn dispatch(&self, call: &Call) -> Result<Bytes, DispatchError> {
        let operation =
            S::declares(&call.operation).ok_or_else(|| DispatchError::UnknownOperation {
                name: call.operation.clone(),
            })?;

        let handler = self
            .registry
            .lookup(operation)
            .ok_or(DispatchError::OperationNotRegistered {
                service: S::NAME,
                operation,
            })?;

        handler.invoke(&call.ctx, &call.payload)
    }
}

impl<S: ServiceContract> Service<Call> for Dispatcher<S> {
    type Response = Bytes;
    type Error = DispatchError;
    type Future = DispatchFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(&call) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
