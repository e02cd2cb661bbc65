//! Cedar server: typed RPC dispatch over HTTP, built on axum and tower.
//!
//! Services are declared in `cedar-core` as [`ServiceContract`] markers with
//! one [`Operation`] per call. An [`RpcService`] holds the handlers for one
//! contract and a [`NetworkModule`] hosts any number of them.
//!
//! [`ServiceContract`]: cedar_core::ServiceContract
//! [`Operation`]: cedar_core::Operation

pub mod network;
pub mod service;
pub mod telemetry;

pub use network::{NetworkConfig, NetworkModule};
pub use service::{
    CallContext, DispatchConfig, DispatchError, HandlerError, OperationRegistry, RpcService,
};
