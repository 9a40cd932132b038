//! Tracing subscriber setup: fmt layer, env filter, optional OTLP export.

use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime::Tokio, trace::TracerProvider, Resource};
use std::{env::var, time::Duration};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr through the fmt layer. When
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over OTLP
/// gRPC so request traces land in the collector alongside the db.query spans.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a global subscriber is
/// already installed.
pub fn init(verbosity: Option<tracing::Level>) -> Result<()> {
    let default_level = verbosity.unwrap_or(tracing::Level::ERROR);

    // RUST_LOG overrides the verbosity flag when present.
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    if var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_timeout(Duration::from_secs(3))
            .build()?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, Tokio)
            .with_resource(Resource::new(vec![
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]))
            .build();

        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
        global::set_tracer_provider(provider);

        tracing::subscriber::set_global_default(registry.with(OpenTelemetryLayer::new(tracer)))?;
    } else {
        tracing::subscriber::set_global_default(registry)?;
    }

    Ok(())
}
