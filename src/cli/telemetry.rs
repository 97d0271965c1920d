use anyhow::{Result, bail};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::SdkTracerProvider,
};
use std::{env::var, time::Duration};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const OTLP_PROTOCOL_ENV: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
const INSTANCE_ID_ENV: &str = "OTEL_SERVICE_INSTANCE_ID";

struct Exporter {
    provider: SdkTracerProvider,
    endpoint: String,
}

static EXPORTER: OnceCell<Exporter> = OnceCell::new();

/// Span export target, read from the standard `OTEL_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    instance_id: String,
}

impl OtlpSettings {
    fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// `Ok(None)` when no endpoint is configured, i.e. export is off.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(endpoint) = lookup(OTLP_ENDPOINT_ENV).filter(|ep| !ep.trim().is_empty()) else {
            return Ok(None);
        };

        if let Some(protocol) = lookup(OTLP_PROTOCOL_ENV)
            && protocol.trim() != "grpc"
        {
            bail!("{OTLP_PROTOCOL_ENV}={protocol} is not supported, passgate exports over grpc");
        }

        Ok(Some(Self {
            endpoint: plaintext_endpoint(&endpoint)?,
            instance_id: lookup(INSTANCE_ID_ENV).unwrap_or_else(|| Ulid::new().to_string()),
        }))
    }
}

/// The gRPC exporter is built without TLS, so only `http://` collectors are
/// reachable. A bare `host:port` is taken as plaintext.
fn plaintext_endpoint(raw: &str) -> Result<String> {
    let endpoint = raw.trim().trim_end_matches('/');

    if endpoint.starts_with("http://") {
        Ok(endpoint.to_string())
    } else if endpoint.starts_with("https://") {
        bail!(
            "{OTLP_ENDPOINT_ENV}={endpoint} needs TLS; passgate exports plaintext gRPC, use an http:// collector"
        )
    } else if endpoint.contains("://") {
        bail!("{OTLP_ENDPOINT_ENV}={endpoint} has an unsupported scheme")
    } else {
        Ok(format!("http://{endpoint}"))
    }
}

fn resource(instance_id: String) -> Resource {
    Resource::builder_empty()
        .with_attributes(vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
            KeyValue::new("vcs.revision", crate::GIT_COMMIT_HASH),
        ])
        .build()
}

fn init_tracer_provider(settings: OtlpSettings) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.endpoint.clone())
        .with_compression(Compression::Gzip)
        .with_timeout(Duration::from_secs(3))
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource(settings.instance_id))
        .build();

    let _ = EXPORTER.set(Exporter {
        provider: provider.clone(),
        endpoint: settings.endpoint,
    });

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider)
}

/// Collector spans are sent to, once [`init`] enabled export.
#[must_use]
pub fn otlp_endpoint() -> Option<&'static str> {
    EXPORTER.get().map(|exporter| exporter.endpoint.as_str())
}

/// Install the global subscriber: pretty console output, plus OTLP span
/// export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// # Errors
///
/// Returns an error on invalid `OTEL_*` settings or if the subscriber cannot be installed
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    // RUST_LOG overrides the verbosity flag
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if let Some(settings) = OtlpSettings::from_env()? {
        let tracer = init_tracer_provider(settings)?.tracer(env!("CARGO_PKG_NAME"));
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(otel_layer)
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Flush pending spans (noop if export is off)
pub fn shutdown_tracer() {
    if let Some(exporter) = EXPORTER.get() {
        debug!("flushing spans to {}", exporter.endpoint);
        let _ = exporter.provider.shutdown();
    }
}
