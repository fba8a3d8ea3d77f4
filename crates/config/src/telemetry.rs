use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use opentelemetry::KeyValue;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{ExporterBuildError, LogExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{Resource, logs::SdkLoggerProvider};
use thiserror::Error;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// OTLP logs endpoint of Axiom.
const AXIOM_LOGS_API: &str = "https://api.axiom.co/v1/logs";

/// Export timeout of the Axiom log exporter.
const AXIOM_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Logging and metrics options
#[derive(Debug, Clone, Parser)]
pub struct TelemetryOpts {
    /// Use ANSI colors in stdout logs. Disable when logs are collected by a file or an
    /// aggregator.
    #[clap(long = "telemetry.use-ansi", env = "BSS_TELEMETRY_USE_ANSI", default_value_t = true)]
    pub use_ansi: bool,
    /// Axiom API token. Logs are also exported to Axiom when set together with the dataset.
    #[clap(long = "telemetry.axiom-token", env = "AXIOM_TOKEN", hide_env_values = true)]
    pub axiom_token: Option<String>,
    /// Axiom dataset receiving the exported logs
    #[clap(long = "telemetry.axiom-dataset", env = "AXIOM_DATASET")]
    pub axiom_dataset: Option<String>,
    /// Address of the Prometheus metrics listener
    #[clap(
        long = "metrics.host",
        env = "BSS_METRICS_HOST",
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    )]
    pub metrics_host: IpAddr,
    /// Port of the Prometheus metrics listener
    #[clap(long = "metrics.port", env = "BSS_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
    /// Disable the Prometheus metrics listener
    #[clap(long = "metrics.disable", env = "BSS_DISABLE_METRICS", default_value_t = false)]
    pub disable_metrics: bool,
}

/// Errors raised while installing the telemetry stack.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The Axiom log exporter could not be built.
    #[error("failed to build the Axiom log exporter: {0}")]
    LogExporter(#[from] ExporterBuildError),
    /// The Prometheus recorder could not be installed.
    #[error("failed to install the Prometheus recorder: {0}")]
    Metrics(#[from] BuildError),
}

/// Handle on the exported log pipeline, flushed on shutdown.
#[derive(Debug, Default)]
pub struct LogProvider(Option<SdkLoggerProvider>);

impl LogProvider {
    /// Returns true if logs are exported besides stdout.
    pub const fn is_exporting(&self) -> bool {
        self.0.is_some()
    }

    /// Flushes and shuts down the log exporter, if any.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.0 {
            // Flushing is best effort on the way out
            let _ = provider.shutdown();
        }
    }
}

impl TelemetryOpts {
    /// Installs the global log subscriber and, unless disabled, the Prometheus recorder.
    ///
    /// Stdout logs are filtered by `RUST_LOG` and default to `info`.
    pub fn setup(&self, instance_name: &str) -> Result<LogProvider, TelemetryError> {
        let provider = self.init_logging(instance_name)?;

        if let Some(address) = self.metrics_address() {
            PrometheusBuilder::new()
                .with_http_listener(address)
                .add_global_label("instance", instance_name)
                .install()?;
            info!(%address, "Metrics enabled");
        }

        Ok(provider)
    }

    /// The metrics listener address, or `None` if metrics are disabled.
    pub fn metrics_address(&self) -> Option<SocketAddr> {
        (!self.disable_metrics).then(|| SocketAddr::new(self.metrics_host, self.metrics_port))
    }

    fn init_logging(&self, instance_name: &str) -> Result<LogProvider, TelemetryError> {
        let filter =
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(self.use_ansi));

        let (Some(token), Some(dataset)) = (&self.axiom_token, &self.axiom_dataset) else {
            registry.init();
            return Ok(LogProvider::default());
        };

        let provider = axiom_log_provider(token, dataset, instance_name)?;
        registry.with(OpenTelemetryTracingBridge::new(&provider)).init();
        info!(dataset, "Axiom log export enabled");

        Ok(LogProvider(Some(provider)))
    }
}

fn axiom_log_provider(
    token: &str,
    dataset: &str,
    service_name: &str,
) -> Result<SdkLoggerProvider, ExporterBuildError> {
    let headers = HashMap::from([
        ("Authorization".to_owned(), format!("Bearer {token}")),
        ("X-Axiom-Dataset".to_owned(), dataset.to_owned()),
    ]);

    let exporter = LogExporter::builder()
        .with_http()
        .with_headers(headers)
        .with_endpoint(AXIOM_LOGS_API)
        .with_timeout(AXIOM_EXPORT_TIMEOUT)
        .build()?;

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", service_name.to_owned()))
        .build();

    Ok(SdkLoggerProvider::builder().with_batch_exporter(exporter).with_resource(resource).build())
}
