use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Where traces and metrics are shipped
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// Sent with every export, e.g. a collector API key
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// How often metrics are pushed
    #[serde(default = "default_export_interval", deserialize_with = "crate::duration::deserialize")]
    pub export_interval: Duration,
}

/// OTLP transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    HttpProto,
}

const fn default_export_interval() -> Duration {
    Duration::from_secs(30)
}
