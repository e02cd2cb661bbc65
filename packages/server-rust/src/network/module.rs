//! Network module with deferred startup lifecycle.
//!
//! `new()` creates shared state, `mount()` attaches services, `start()` binds
//! the TCP listener and `serve()` accepts connections until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context as _};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use cedar_core::ServiceContract;
use tokio::net::TcpListener;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    health_handler, liveness_handler, readiness_handler, AppState, ServiceMount,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::service::RpcService;

/// Longest wait for in-flight calls once shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

const RESERVED_PATHS: &[&str] = &["/health", "/health/live", "/health/ready"];

/// Hosts any number of `RpcService`s on one HTTP listener.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    rpc_routes: Router,
    mounts: Vec<ServiceMount>,
    start_time: Instant,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            rpc_routes: Router::new(),
            mounts: Vec::new(),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Attaches `service` at `path`.
    ///
    /// The service keeps accepting registrations after it is mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not start with `/`, is already taken,
    /// or collides with a built-in route.
    pub fn mount<S: ServiceContract>(
        &mut self,
        path: &str,
        service: RpcService<S>,
    ) -> anyhow::Result<&mut Self> {
        if !path.starts_with('/') {
            bail!("mount path `{path}` must start with `/`");
        }
        if RESERVED_PATHS.contains(&path) || (path == "/" && self.config.static_index.is_some()) {
            bail!("mount path `{path}` is reserved");
        }
        if self.mounts.iter().any(|m| m.path == path) {
            bail!("mount path `{path}` is already in use");
        }

        info!(service = S::NAME, path, "service mounted");
        self.rpc_routes = std::mem::take(&mut self.rpc_routes).route_service(path, service.clone());
        self.mounts.push(ServiceMount {
            path: path.to_string(),
            service: Arc::new(service),
        });
        Ok(self)
    }

    /// Assembles the router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `GET /` -- the static index file, when configured
    /// - one route per mounted service
    pub fn build_router(&self) -> Router {
        let state = AppState {
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            services: Arc::new(self.mounts.clone()),
        };

        let rpc = self
            .rpc_routes
            .clone()
            .layer(from_fn_with_state(Arc::clone(&self.shutdown), track_in_flight));

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .with_state(state)
            .merge(rpc);

        if let Some(index) = &self.config.static_index {
            router = router.route_service("/", ServeFile::new(index));
        }

        router.layer(build_http_layers(&self.config))
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// With port 0 the OS picks the port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains.
    ///
    /// Once `shutdown` resolves the state moves to `Draining`, mounted
    /// services answer 503 to new calls, and in-flight calls get up to 30
    /// seconds to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            bail!("start() must be called before serve()");
        };

        let router = self.build_router();
        let controller = Arc::clone(&self.shutdown);
        controller.set_ready();

        let signal_controller = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("shutdown signalled, draining");
                signal_controller.trigger_shutdown();
            })
            .await?;

        if controller.wait_for_drain(DRAIN_TIMEOUT).await {
            info!("all calls drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with calls in flight"
            );
        }
        Ok(())
    }
}
