use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use arc_swap::ArcSwap;
use cedar_core::{Operation, ServiceContract};

use super::context::CallContext;
use super::error::HandlerError;
use super::handler::{ErasedHandler, TypedHandler};

type Slots = HashMap<&'static str, Arc<dyn ErasedHandler>>;

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// One handler slot per declared operation of service `S`.
///
/// The slot map is copy-on-write behind an `ArcSwap`: lookups are lock-free
/// and always observe a fully-formed handler, and each registration publishes
/// a new map atomically. Registration normally happens once during startup,
/// but late registration is safe; an in-flight call keeps the handler it
/// already looked up.
pub struct OperationRegistry<S> {
    slots: ArcSwap<Slots>,
    _service: PhantomData<fn() -> S>,
}

impl<S: ServiceContract> OperationRegistry<S> {
    /// Creates a registry with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: ArcSwap::from_pointee(HashMap::new()),
            _service: PhantomData,
        }
    }

    /// Stores `handler` in the slot for `Op`, replacing any previous handler.
    ///
    /// The slot key and the handler's request/response types both come from
    /// `Op`, so a handler can never be registered under the wrong operation.
    pub fn register<Op>(
        &self,
        handler: impl Fn(&CallContext, Op::Request) -> Result<Op::Response, HandlerError>
            + Send
            + Sync
            + 'static,
    ) where
        Op: Operation<Service = S>,
    {
        let slot: Arc<dyn ErasedHandler> = Arc::new(TypedHandler::<Op, _>::new(handler));
        self.slots.rcu(|current| {
            let mut next = Slots::clone(current);
            next.insert(Op::NAME, Arc::clone(&slot));
            next
        });
        tracing::debug!(service = S::NAME, operation = Op::NAME, "handler registered");
    }

    pub(crate) fn lookup(&self, operation: &str) -> Option<Arc<dyn ErasedHandler>> {
        self.slots.load().get(operation).cloned()
    }

    #[must_use]
    pub fn is_registered(&self, operation: &str) -> bool {
        self.slots.load().contains_key(operation)
    }

    /// Names of the operations that currently have a handler, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.load().keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<S: ServiceContract> Default for OperationRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
