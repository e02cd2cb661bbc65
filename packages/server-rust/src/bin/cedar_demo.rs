//! Demo server hosting the `Todos` and `Echo` services.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use cedar_server::network::{NetworkConfig, NetworkModule};
use cedar_server::service::domain::{register_echo, register_todos, TodoStore};
use cedar_server::service::{DispatchConfig, RpcService};
use cedar_server::telemetry::{init_tracing, LogFormat};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cedar-demo")]
#[command(about = "Serves the Todos and Echo demo services over HTTP")]
struct Args {
    /// Bind address
    #[arg(long, env = "CEDAR_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port (0 lets the OS pick)
    #[arg(long, env = "CEDAR_PORT", default_value_t = 8081)]
    port: u16,

    /// File served at `GET /`
    #[arg(long, env = "CEDAR_STATIC_INDEX", value_name = "PATH")]
    static_index: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "CEDAR_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "CEDAR_MAX_REQUEST_BYTES", default_value_t = 1024 * 1024)]
    max_request_bytes: usize,

    #[arg(long, env = "CEDAR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "CEDAR_METRICS_ADDR", value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            static_index: self.static_index.clone(),
            ..NetworkConfig::default()
        }
    }

    fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_request_bytes: self.max_request_bytes,
            ..DispatchConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let todos = RpcService::with_config(args.dispatch_config());
    register_todos(&todos, Arc::new(TodoStore::new()));
    let echo = RpcService::with_config(args.dispatch_config());
    register_echo(&echo);

    let mut network = NetworkModule::new(args.network_config());
    network.mount("/todos", todos)?.mount("/echo", echo)?;

    let port = network.start().await?;
    info!(port, "cedar-demo ready");

    network.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
