//! Pre-generated service contracts.
//!
//! Each submodule is what the schema compiler emits for one service: record
//! types, one `*Request` struct per operation, the service marker, and the
//! operation markers binding names to request/response types.

pub mod echo;
pub mod todos;
