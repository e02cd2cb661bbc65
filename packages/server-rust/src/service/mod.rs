//! Typed operation dispatch.
//!
//! A call flows through these stages:
//!
//! 1. **Selection** (`selector`): HTTP request -> operation name
//! 2. **Middleware** (`middleware`): Tower layers around the dispatcher (metrics)
//! 3. **Dispatch** (`dispatcher`): declared-name check, registry lookup
//! 4. **Handler slot** (`handler`): decode -> invoke -> encode
//!
//! `RpcService` ties the stages together for one service contract and is
//! what the network layer mounts. `domain` holds the demo services.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod registry;
pub mod rpc;
pub mod selector;

pub use config::DispatchConfig;
pub use context::{CallContext, REQUEST_ID_HEADER};
pub use dispatcher::{Call, Dispatcher};
pub use error::{DispatchError, HandlerError};
pub use handler::HandlerFn;
pub use registry::OperationRegistry;
pub use rpc::RpcService;
pub use selector::select_operation;
