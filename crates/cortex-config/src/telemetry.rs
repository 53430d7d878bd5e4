pub mod exporters;

use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use self::exporters::ExporterConfig;

/// Telemetry configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name for telemetry metadata
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Console log line format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Additional resource attributes
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// OTLP exporter shared by traces and metrics
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    /// Trace sampling ratio (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// LLM trace sink
    #[serde(default)]
    pub langfuse: Option<LangfuseConfig>,
}

/// Console log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Langfuse ingestion credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LangfuseConfig {
    pub public_key: SecretString,
    pub secret_key: SecretString,
    #[serde(default = "default_langfuse_url")]
    pub base_url: Url,
}

fn default_service_name() -> String {
    "cortex".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_sampling_rate() -> f64 {
    1.0
}

/// Public Langfuse cloud, also used as the dashboard link in analytics responses
pub fn default_langfuse_url() -> Url {
    Url::parse("https://cloud.langfuse.com").expect("must be a valid URL")
}
