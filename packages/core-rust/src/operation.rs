//! Compile-time service and operation contracts.
//!
//! These traits stand in for what a schema compiler would emit: a named
//! service, the fixed set of operation names it declares, and for each
//! operation the request and response types it carries on the wire.

use serde::de::DeserializeOwned;
use serde::Serialize;

// ---------------------------------------------------------------------------
// OperationSelector
// ---------------------------------------------------------------------------

/// How an inbound call picks the operation it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSelector {
    /// Several operations share one endpoint.
    ///
    /// The operation name is read from the `param` query parameter
    /// (`POST /todos?fn=addTodo`). When the query parameter is absent it is
    /// read from the same-named string field of the JSON body, and the rest of
    /// the body is the request.
    Named { param: &'static str },
    /// The endpoint is bound to exactly one operation and the whole body is
    /// its request.
    Fixed { operation: &'static str },
}

// ---------------------------------------------------------------------------
// ServiceContract
// ---------------------------------------------------------------------------

/// A named group of operations sharing one registry and one endpoint.
pub trait ServiceContract: Send + Sync + 'static {
    /// Service name, used in logs, metrics, and the health report.
    const NAME: &'static str;

    /// Operation selection convention for this service's endpoint.
    const SELECTOR: OperationSelector;

    /// Every operation name the service declares. Fixed at definition time.
    const OPERATIONS: &'static [&'static str];

    /// Resolves a wire name to the declared operation name, if any.
    #[must_use]
    fn declares(name: &str) -> Option<&'static str> {
        Self::OPERATIONS.iter().copied().find(|op| *op == name)
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single remote call with a fixed request/response type pair.
///
/// Implemented by zero-sized marker types, one per operation. The marker is
/// only ever used as a type parameter.
pub trait Operation: Send + Sync + 'static {
    /// The service this operation belongs to.
    type Service: ServiceContract;

    /// Request payload decoded from the call body.
    type Request: Serialize + DeserializeOwned + Send + 'static;

    /// Success payload encoded into the response body.
    type Response: Serialize + DeserializeOwned + Send + 'static;

    /// Wire name of the operation. Must appear in `Service::OPERATIONS`.
    const NAME: &'static str;
}
