//! Metrics middleware for dispatched calls.
//!
//! Wraps each call in a `tracing` span and records a call counter and a
//! latency histogram through the `metrics` facade. Without an installed
//! recorder the `metrics` calls are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use cedar_core::ServiceContract;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::dispatcher::Call;
use crate::service::error::DispatchError;

pub const CALLS_TOTAL: &str = "cedar_rpc_calls_total";
pub const CALL_DURATION_SECONDS: &str = "cedar_rpc_call_duration_seconds";

/// Label used for any operation name the service does not declare.
pub const UNKNOWN_OPERATION: &str = "unknown";

/// Maps a requested operation name onto the declared one, if any.
pub type ResolveOperation = fn(&str) -> Option<&'static str>;

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments calls with timing and outcome.
///
/// The `operation` label only ever takes a declared name or
/// [`UNKNOWN_OPERATION`], so client input cannot mint new series.
#[derive(Debug, Clone, Copy)]
pub struct MetricsLayer {
    resolve: ResolveOperation,
}

impl MetricsLayer {
    #[must_use]
    pub fn new(resolve: ResolveOperation) -> Self {
        Self { resolve }
    }

    /// Labels calls by the operations `S` declares.
    #[must_use]
    pub fn for_contract<S: ServiceContract>() -> Self {
        Self::new(S::declares)
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            resolve: self.resolve,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
    resolve: ResolveOperation,
}

impl<S> Service<Call> for MetricsService<S>
where
    S: Service<Call, Response = Bytes, Error = DispatchError> + Send,
    S::Future: Send + 'static,
{
    type Response = Bytes;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Bytes, DispatchError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let service = call.ctx.service();
        let call_id = call.ctx.call_id();
        let operation = (self.resolve)(&call.operation).unwrap_or(UNKNOWN_OPERATION);

        let span = info_span!(
            "rpc_call",
            service = service,
            operation = operation,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.kind(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);

                match &result {
                    Err(e) if e.is_server_error() => {
                        tracing::warn!(error = %e, outcome, duration_ms, "rpc call failed");
                    }
                    _ => tracing::info!(outcome, duration_ms, "rpc call complete"),
                }

                metrics::counter!(
                    CALLS_TOTAL,
                    "service" => service,
                    "operation" => operation,
                    "outcome" => outcome
                )
                .increment(1);
                metrics::histogram!(
                    CALL_DURATION_SECONDS,
                    "service" => service,
                    "operation" => operation
                )
                .record(elapsed.as_secs_f64());

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use cedar_core::contracts::echo::Echo;
    use cedar_core::contracts::todos::{GetTodo, Todos};
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use super::*;
    use crate::service::context::CallContext;
    use crate::service::error::HandlerError;
    use crate::service::RpcService;

    /// Immediately-completing service that echoes the payload or fails.
    struct ImmediateService {
        fail: bool,
    }

    impl Service<Call> for ImmediateService {
        type Response = Bytes;
        type Error = DispatchError;
        type Future = Pin<Box<dyn Future<Output = Result<Bytes, DispatchError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, call: Call) -> Self::Future {
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(DispatchError::Handler(HandlerError::new("nope")))
                } else {
                    Ok(call.payload)
                }
            })
        }
    }

    /// A registered metric: name plus sorted `(label, value)` pairs.
    type Registration = (String, Vec<(String, String)>);

    /// Remembers every counter and histogram key it is asked for.
    #[derive(Default)]
    struct KeyRecorder {
        counters: Mutex<Vec<Registration>>,
        histograms: Mutex<Vec<Registration>>,
    }

    fn registration(key: &Key) -> Registration {
        let mut labels: Vec<_> = key
            .labels()
            .map(|l| (l.key().to_string(), l.value().to_string()))
            .collect();
        labels.sort();
        (key.name().to_string(), labels)
    }

    fn labels(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    impl Recorder for KeyRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.counters.lock().push(registration(key));
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.histograms.lock().push(registration(key));
            Histogram::noop()
        }
    }

    /// Drives `fut` to completion with `recorder` installed on this thread.
    fn recorded<T>(recorder: &KeyRecorder, fut: impl Future<Output = T>) -> T {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        metrics::with_local_recorder(recorder, || rt.block_on(fut))
    }

    fn make_call() -> Call {
        Call::new(CallContext::local("Echo"), "echo", r#"{"message":"hi"}"#)
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer::for_contract::<Echo>().layer(ImmediateService { fail: false });
        let resp = svc.oneshot(make_call()).await.unwrap();
        assert_eq!(&resp[..], br#"{"message":"hi"}"#);
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_errors() {
        let svc = MetricsLayer::for_contract::<Echo>().layer(ImmediateService { fail: true });
        let err = svc.oneshot(make_call()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler(e) if e.message() == "nope"));
    }

    #[test]
    fn successful_call_is_counted_and_timed() {
        let recorder = KeyRecorder::default();
        let svc = MetricsLayer::for_contract::<Echo>().layer(ImmediateService { fail: false });
        recorded(&recorder, svc.oneshot(make_call())).unwrap();

        assert_eq!(
            *recorder.counters.lock(),
            vec![(
                CALLS_TOTAL.to_string(),
                labels(&[("operation", "echo"), ("outcome", "ok"), ("service", "Echo")]),
            )]
        );
        assert_eq!(
            *recorder.histograms.lock(),
            vec![(
                CALL_DURATION_SECONDS.to_string(),
                labels(&[("operation", "echo"), ("service", "Echo")]),
            )]
        );
    }

    #[test]
    fn failed_call_is_counted_with_its_error_kind() {
        let recorder = KeyRecorder::default();
        let svc = MetricsLayer::for_contract::<Echo>().layer(ImmediateService { fail: true });
        let _ = recorded(&recorder, svc.oneshot(make_call()));

        assert_eq!(
            *recorder.counters.lock(),
            vec![(
                CALLS_TOTAL.to_string(),
                labels(&[
                    ("operation", "echo"),
                    ("outcome", "handler_error"),
                    ("service", "Echo"),
                ]),
            )]
        );
    }

    #[test]
    fn undeclared_names_share_one_label() {
        let recorder = KeyRecorder::default();
        let svc = RpcService::<Todos>::new();
        svc.handle::<GetTodo>(|_ctx, _req| Err(HandlerError::new("todo not found")));

        recorded(&recorder, async {
            for i in 0..200 {
                let err = svc
                    .dispatch(svc.local_context(), &format!("junk{i}"), "{}")
                    .await
                    .unwrap_err();
                assert!(matches!(err, DispatchError::UnknownOperation { .. }));
            }
            let _ = svc
                .dispatch(svc.local_context(), "getTodo", r#"{"id":1}"#)
                .await;
        });

        let operations: BTreeSet<String> = recorder
            .counters
            .lock()
            .iter()
            .chain(recorder.histograms.lock().iter())
            .flat_map(|(_, labels)| labels.iter())
            .filter(|(k, _)| k == "operation")
            .map(|(_, v)| v.clone())
            .collect();
        assert_eq!(
            operations,
            BTreeSet::from(["getTodo".to_string(), UNKNOWN_OPERATION.to_string()])
        );
    }
}
