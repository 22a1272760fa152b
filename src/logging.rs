use crate::app_env;
use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{Resource, runtime};
use tracing::level_filters::LevelFilter;
use tracing::{Subscriber, warn};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// The name of the application as it should appear in OpenTelemetry collectors
const SERVICE_NAME: &str = "todo-board";

/// Struct containing OpenTelemetry primitives which export data to a tracing server
pub struct OtelExporters {
    pub tracer_provider: TracerProvider,
    pub meter: SdkMeterProvider,
}

impl OtelExporters {
    /// Flushes anything still buffered in the exporters. Should be called right before the process exits.
    pub fn shutdown(self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            warn!("failed to flush span exporter: {err}");
        }
        if let Err(err) = self.meter.shutdown() {
            warn!("failed to flush metrics exporter: {err}");
        }
    }
}

/// Instantiates OpenTelemetry exporters which run in the background and send tracing/metrics
/// data to an opentelemetry-compatible gRPC endpoint (typically http://localhost:4317 with a
/// locally running collector)
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .context("building span exporter")?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .context("building meter exporter")?;

    let metrics_reader = PeriodicReader::builder(meter_export, runtime::Tokio).build();

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(metrics_reader)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();

    Ok(OtelExporters {
        tracer_provider,
        meter: meter_provider,
    })
}

/// Constructs a filter which uses [app_env::LOG_LEVEL] to configure per-module logging. Filters
/// to [default_level] when the variable is unset. The shell owns the terminal, so the default
/// is quieter than a server would use.
pub fn init_env_filter(default_level: LevelFilter) -> Result<EnvFilter, anyhow::Error> {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env()
        .context("building the logging filter failed")
}

/// Sets up the global logging and tracing sinks. Spans and metrics at the "debug" level and above
/// are sent to OpenTelemetry sinks if [otel_exporters] is provided. [env_filter] is applied
/// specifically to the JSON logger, which prints to stderr so log lines never interleave with
/// shell output on stdout.
pub fn setup_logging_and_tracing(env_filter: EnvFilter, otel_exporters: Option<&OtelExporters>) {
    global::set_text_map_propagator(TraceContextPropagator::new());
    if let Some(exporters) = otel_exporters {
        global::set_tracer_provider(exporters.tracer_provider.clone());
    }

    log_subscriber(env_filter, otel_exporters).init();
}

/// The OpenTelemetry layers are capped at "debug". Nothing caps the JSON logger but [env_filter],
/// so `-vvv` really does print trace events.
fn log_subscriber(
    env_filter: EnvFilter,
    otel_exporters: Option<&OtelExporters>,
) -> Box<dyn Subscriber + Send + Sync> {
    if let Some(exporters) = otel_exporters {
        let tracer = exporters.tracer_provider.tracer(SERVICE_NAME);

        Box::new(
            registry()
                .with(OpenTelemetryLayer::new(tracer).with_filter(LevelFilter::DEBUG))
                .with(MetricsLayer::new(exporters.meter.clone()).with_filter(LevelFilter::DEBUG))
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_filter(env_filter),
                ),
        )
    } else {
        Box::new(
            registry().with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter),
            ),
        )
    }
}
