//! HTTP middleware for hosted services.
//!
//! Layer ordering follows the outer-to-inner convention: the first layer
//! listed is the outermost (sees the request first and the response last).

use std::any::Any;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cedar_core::ErrorBody;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, Any as AnyHeader, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;
use crate::service::REQUEST_ID_HEADER;

type PanicResponder = fn(Box<dyn Any + Send + 'static>) -> Response;

/// The composed layer type produced by [`build_http_layers`].
type HttpLayers = Stack<
    CatchPanicLayer<PanicResponder>,
    Stack<
        PropagateRequestIdLayer,
        Stack<
            TimeoutLayer,
            Stack<
                CorsLayer,
                Stack<
                    TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                    Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
                >,
            >,
        >,
    >,
>;

/// Builds the transport middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- UUID v4 `x-request-id` on every request
/// 2. `Tracing` -- access span per request
/// 3. `CORS` -- from the configured origins
/// 4. `Timeout` -- 408 after `request_timeout`
/// 5. `PropagateRequestId` -- copies `x-request-id` onto the response
/// 6. `CatchPanic` -- a panicking handler becomes a 500 with a JSON body
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(CatchPanicLayer::custom(panic_response as PanicResponder))
        .into_inner()
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AnyHeader)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("internal server error")),
    )
        .into_response()
}

/// Admits a call only while the server accepts calls, and counts it as
/// in flight until the response is produced.
pub async fn track_in_flight(
    State(shutdown): State<Arc<ShutdownController>>,
    request: Request,
    next: Next,
) -> Response {
    if !shutdown.health_state().accepts_calls() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new("server is shutting down")),
        )
            .into_response();
    }

    let _guard = shutdown.in_flight_guard();
    next.run(request).await
}
