//! Telemetry for Cortex
//!
//! Console logging through `tracing-subscriber`, optional OTLP export of
//! traces and metrics, and the LLM trace sink used after each completion.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod cost;
mod error;
mod metadata;
pub mod metrics;
pub mod sink;

use cortex_config::telemetry::exporters::{ExportProtocol, ExporterConfig};
use cortex_config::{LogFormat, TelemetryConfig};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub use error::TelemetryError;
pub use metrics::GatewayMetrics;
pub use sink::{GatewayEvent, LangfuseSink, LlmTrace, NoopSink, TelemetrySink, TokenCounts, build_sink};

/// Guard that flushes and shuts down exporters on drop
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Force flush all pending metrics immediately
    pub fn force_flush(&self) -> anyhow::Result<()> {
        if let Some(ref provider) = self.meter_provider {
            provider
                .force_flush()
                .map_err(|e| anyhow::anyhow!("failed to flush metrics: {e}"))?;
        }
        Ok(())
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.meter_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown meter provider: {e}");
        }
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
///
/// The returned guard must be held for the lifetime of the process.
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = config.map_or(LogFormat::Text, |c| c.log_format);

    let mut guard = TelemetryGuard {
        meter_provider: None,
        tracer_provider: None,
    };

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(log_format)];

    if let Some(telemetry) = config
        && let Some(exporter) = &telemetry.exporter
    {
        let resource = metadata::build_resource(telemetry);

        let meter_provider = init_metrics(exporter, resource.clone())?;
        global::set_meter_provider(meter_provider.clone());
        guard.meter_provider = Some(meter_provider);

        let tracer_provider = init_tracer(exporter, telemetry.sampling_rate, resource)?;
        let tracer = tracer_provider.tracer("cortex");
        global::set_tracer_provider(tracer_provider.clone());
        guard.tracer_provider = Some(tracer_provider);

        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
    }

    tracing_subscriber::registry().with(layers).with(filter).init();

    Ok(guard)
}

fn fmt_layer(format: LogFormat) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
    }
}

fn init_metrics(config: &ExporterConfig, resource: opentelemetry_sdk::Resource) -> anyhow::Result<SdkMeterProvider> {
    use opentelemetry_otlp::MetricExporter;
    use opentelemetry_sdk::metrics::PeriodicReader;

    let exporter = match config.protocol {
        ExportProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC metrics exporter: {e}"))?,
        ExportProtocol::HttpProto => MetricExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.as_str())
            .with_headers(config.headers.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP metrics exporter: {e}"))?,
    };

    let reader = PeriodicReader::builder(exporter)
        .with_interval(config.export_interval)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn init_tracer(
    config: &ExporterConfig,
    sampling_rate: f64,
    resource: opentelemetry_sdk::Resource,
) -> anyhow::Result<SdkTracerProvider> {
    use opentelemetry_otlp::SpanExporter;
    use opentelemetry_sdk::trace::Sampler;

    let exporter = match config.protocol {
        ExportProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC span exporter: {e}"))?,
        ExportProtocol::HttpProto => SpanExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.as_str())
            .with_headers(config.headers.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP span exporter: {e}"))?,
    };

    let sampler = if sampling_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sampling_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sampling_rate)
    };

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(sampler)))
        .with_batch_exporter(exporter)
        .build())
}
