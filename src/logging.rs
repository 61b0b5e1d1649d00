use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing::{Span, debug, debug_span, field, warn};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// The name of the service as it should appear in OpenTelemetry collectors
const SERVICE_NAME: &str = "tasks-api";

/// OpenTelemetry providers which export data to a collector in the background.
/// Call [OtelExporters::shutdown] before exiting so buffered spans and metrics are flushed.
pub struct OtelExporters {
    trace_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
}

impl OtelExporters {
    /// Flushes and stops both exporters
    pub fn shutdown(self) {
        if let Err(err) = self.trace_provider.shutdown() {
            warn!("Span exporter did not shut down cleanly: {err}");
        }
        if let Err(err) = self.meter_provider.shutdown() {
            warn!("Metric exporter did not shut down cleanly: {err}");
        }
    }
}

/// Attaches a tracing middleware layer to the given router. Every request gets a "request" span
/// which continues any W3C trace context sent by the caller.
pub fn attach_tracing_http<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let req_span = debug_span!(
                        "request",
                        method = &request.method().as_str(),
                        path = request.uri().path(),
                        response_status = field::Empty,
                        latency_ms = field::Empty,
                    );

                    req_span.set_parent(global::get_text_map_propagator(|propagator| {
                        propagator.extract(&HeaderExtractor(request.headers()))
                    }));

                    req_span
                })
                .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
                    span.record("response_status", field::display(response.status()));
                    span.record("latency_ms", latency.as_millis() as u64);
                    debug!("request processing complete");
                }),
        ),
    )
}

/// Instantiates OpenTelemetry exporters which run in the background and send tracing/metrics
/// data to an opentelemetry-compatible gRPC endpoint (typically http://localhost:4317 with a standard
/// sidecar setup)
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .context("building the span exporter")?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .context("building the metric exporter")?;

    let metrics_reader = PeriodicReader::builder(meter_export, runtime::Tokio).build();

    let trace_provider = TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(metrics_reader)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();

    Ok(OtelExporters {
        trace_provider,
        meter_provider,
    })
}

/// Constructs a filter from LOG_LEVEL style directives, such as "info" or
/// "tasks_api=debug,sqlx=warn". Anything the directives don't cover logs at "info".
pub fn init_env_filter(directives: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(directives)
}

/// Sets up the global logging and tracing sinks. All logs and metrics at the "debug" level and above
/// will automatically be sent to OpenTelemetry sinks if [otel_exporters] is provided. [env_filter] is
/// applied specifically to the JSON logger printing to stdout.
pub fn setup_logging_and_tracing(
    env_filter: EnvFilter,
    otel_exporters: Option<&OtelExporters>,
) -> Result<(), anyhow::Error> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    if let Some(exporters) = otel_exporters {
        let stdout_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_filter(env_filter);
        registry()
            .with(LevelFilter::DEBUG)
            .with(OpenTelemetryLayer::new(
                exporters.trace_provider.tracer(SERVICE_NAME),
            ))
            .with(MetricsLayer::new(exporters.meter_provider.clone()))
            .with(stdout_layer)
            .try_init()
            .context("installing the global tracing subscriber")?;
    } else {
        let stdout_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_filter(env_filter);
        registry()
            .with(LevelFilter::DEBUG)
            .with(stdout_layer)
            .try_init()
            .context("installing the global tracing subscriber")?;
    }

    Ok(())
}
