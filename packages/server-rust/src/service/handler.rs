//! Typed handlers and their type-erased registry slots.
//!
//! A handler is written against one operation's concrete request and
//! response types. The registry stores it behind [`ErasedHandler`], which
//! owns the decode and encode steps, so no code outside the slot ever sees a
//! mismatched type.

use std::marker::PhantomData;

use bytes::Bytes;
use cedar_core::Operation;

use super::context::CallContext;
use super::error::{DispatchError, HandlerError};

/// The function shape every handler for `Op` must have.
pub trait HandlerFn<Op: Operation>:
    Fn(&CallContext, Op::Request) -> Result<Op::Response, HandlerError> + Send + Sync + 'static
{
}

impl<Op, F> HandlerFn<Op> for F
where
    Op: Operation,
    F: Fn(&CallContext, Op::Request) -> Result<Op::Response, HandlerError> + Send + Sync + 'static,
{
}

/// A registry slot: decode, invoke, encode.
pub(crate) trait ErasedHandler: Send + Sync {
    fn invoke(&self, ctx: &CallContext, payload: &[u8]) -> Result<Bytes, DispatchError>;
}

/// Adapter that erases the request/response types of a handler for `Op`.
pub(crate) struct TypedHandler<Op, F> {
    handler: F,
    _operation: PhantomData<fn() -> Op>,
}

impl<Op, F> TypedHandler<Op, F> {
    pub(crate) fn new(handler: F) -> Self {
        Self {
            handler,
            _operation: PhantomData,
        }
    }
}

impl<Op, F> ErasedHandler for TypedHandler<Op, F>
where
    Op: Operation,
    F: HandlerFn<Op>,
{
    fn invoke(&self, ctx: &CallContext, payload: &[u8]) -> Result<Bytes, DispatchError> {
        let request: Op::Request =
            serde_json::from_slice(payload).map_err(DispatchError::bad_request)?;

        let response = (self.handler)(ctx, request)?;

        serde_json::to_vec(&response)
            .map(Bytes::from)
            .map_err(|e| DispatchError::Encoding {
                reason: e.to_string(),
            })
    }
}
