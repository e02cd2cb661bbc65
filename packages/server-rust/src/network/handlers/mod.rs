//! Built-in HTTP handlers and the state they share.

pub mod health;

pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use cedar_core::ServiceContract;

use super::ShutdownController;
use crate::service::RpcService;

/// Read-only view of a mounted service, for health reporting.
pub trait MountedService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Operations that currently have a handler, sorted.
    fn operations(&self) -> Vec<&'static str>;
}

impl<S: ServiceContract> MountedService for RpcService<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn operations(&self) -> Vec<&'static str> {
        self.registry().registered()
    }
}

/// A service together with the path it is mounted at.
#[derive(Clone)]
pub struct ServiceMount {
    pub path: String,
    pub service: Arc<dyn MountedService>,
}

/// State for the built-in handlers, passed via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub shutdown: Arc<ShutdownController>,
    /// Server start time, for uptime.
    pub start_time: Instant,
    pub services: Arc<Vec<ServiceMount>>,
}
