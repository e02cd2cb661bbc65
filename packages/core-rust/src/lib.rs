//! Cedar core: service contracts and their JSON wire format, plus a typed HTTP client.
//!
//! A service is described once, at compile time, by a [`ServiceContract`] and
//! one [`Operation`] marker per remote call. Servers and clients both key off
//! these contracts, so a request or response type can never drift between the
//! two sides.

pub mod contracts;
pub mod operation;
pub mod wire;

#[cfg(feature = "client")]
pub mod client;

pub use operation::{Operation, OperationSelector, ServiceContract};
pub use wire::{ErrorBody, Unit, JSON_CONTENT_TYPE};

#[cfg(feature = "client")]
pub use client::{ClientError, RpcClient};
