//! Logging initialization
//!
//! Logs go to stderr by default and to a file in diagnostic mode, so stdout
//! stays reserved for answers.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Cli;

#[cfg(feature = "otel")]
use opentelemetry::global;
#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Service name reported to OpenTelemetry
#[cfg(feature = "otel")]
const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

// Kept for shutdown so pending spans get flushed
#[cfg(feature = "otel")]
static OTEL_PROVIDER: std::sync::OnceLock<SdkTracerProvider> = std::sync::OnceLock::new();

/// Flush and shut down the OpenTelemetry provider
#[cfg(feature = "otel")]
pub fn shutdown_otel() {
    if let Some(provider) = OTEL_PROVIDER.get() {
        tracing::debug!("Shutting down OpenTelemetry provider");
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to shutdown OpenTelemetry provider: {:?}", e);
        }
    }
}

/// Shutdown OpenTelemetry provider (no-op when feature is disabled)
#[cfg(not(feature = "otel"))]
pub fn shutdown_otel() {}

#[cfg(feature = "otel")]
fn init_otel(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    use opentelemetry_sdk::Resource;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(SERVICE_NAME)
                .build(),
        )
        .build();

    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

/// Build an EnvFilter based on CLI args and RUST_LOG environment variable
///
/// Priority: RUST_LOG environment variable > CLI arguments (-v, -vv, -q)
pub fn build_env_filter(cli: &Cli) -> tracing_subscriber::EnvFilter {
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        if !rust_log.is_empty() {
            return tracing_subscriber::EnvFilter::new(rust_log);
        }
    }

    tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into())
}

/// Install the subscriber with the given fmt writer
fn install<W>(cli: &Cli, writer: W) -> anyhow::Result<()>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = build_env_filter(cli);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    #[cfg(feature = "otel")]
    {
        if let Some(endpoint) = cli.otel_endpoint.as_deref().filter(|_| cli.is_otel_enabled()) {
            eprintln!("OpenTelemetry enabled: endpoint={endpoint}, service={SERVICE_NAME}");

            let provider = init_otel(endpoint)?;
            let tracer = provider.tracer(SERVICE_NAME);
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            drop(OTEL_PROVIDER.set(provider));

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(otel_layer)
                .try_init()?;
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    // Warns when an endpoint is given to a build without the otel feature
    #[cfg(not(feature = "otel"))]
    let _ = cli.is_otel_enabled();

    Ok(())
}

/// Initialize logging based on CLI arguments
pub fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    if !cli.is_diagnostic() {
        return install(cli, std::io::stderr);
    }

    let log_path = cli.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&log_path)?;

    eprintln!("Diagnostic mode: logging to {}", log_path.display());

    install(cli, std::sync::Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_filter_follows_cli_level() {
        if std::env::var("RUST_LOG").is_ok_and(|v| !v.is_empty()) {
            return;
        }
        let cli = Cli {
            verbose: 2,
            ..Default::default()
        };
        assert_eq!(build_env_filter(&cli).max_level_hint(), Some(LevelFilter::DEBUG));

        let quiet = Cli {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(build_env_filter(&quiet).max_level_hint(), Some(LevelFilter::ERROR));
    }
}
