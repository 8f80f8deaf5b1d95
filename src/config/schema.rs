//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Concurrent admission control settings, kept in raw form until
    /// the threshold resolver validates them.
    pub admission: AdmissionSettings,

    /// The guarded application requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Raw admission settings.
///
/// Numeric values are accepted either as TOML integers or as strings so
/// that the same parsing rules apply to file and environment sources.
/// A missing or zero `reject_threshold` disables admission control.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdmissionSettings {
    /// Total requests (running and waiting) accepted before rejecting.
    #[serde(deserialize_with = "string_or_number")]
    pub reject_threshold: Option<String>,

    /// Requests allowed to run before new arrivals wait for a slot.
    #[serde(deserialize_with = "string_or_number")]
    pub blocking_threshold: Option<String>,

    /// Container CPU limit in cores ("2") or millicores ("500m").
    #[serde(deserialize_with = "string_or_number")]
    pub container_cpu_limit: Option<String>,

    /// Regular expressions selecting the request paths under control.
    pub uri_patterns: Vec<String>,

    /// Upper bound on a blocking-tier wait in milliseconds (0 = unbounded).
    #[serde(deserialize_with = "string_or_number")]
    pub blocking_timeout_ms: Option<String>,
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000"). Unset means only the
    /// built-in status endpoints are served.
    pub address: Option<String>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time, including any admission wait) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    Ok(Some(match Raw::deserialize(deserializer)? {
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Text(s) => s,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: GateConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.admission.reject_threshold.is_none());
        assert!(config.admission.uri_patterns.is_empty());
        assert!(config.upstream.address.is_none());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn admission_numbers_accept_integers_and_strings() {
        let config: GateConfig = toml::from_str(
            r#"
            [admission]
            reject_threshold = 10
            blocking_threshold = "4"
            container_cpu_limit = "500m"
            uri_patterns = [".*/v1/heavy$"]
            "#,
        )
        .unwrap();

        assert_eq!(config.admission.reject_threshold.as_deref(), Some("10"));
        assert_eq!(config.admission.blocking_threshold.as_deref(), Some("4"));
        assert_eq!(config.admission.container_cpu_limit.as_deref(), Some("500m"));
        assert_eq!(config.admission.uri_patterns, vec![".*/v1/heavy$".to_string()]);
    }

    #[test]
    fn json_log_format_parses() {
        let config: GateConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
