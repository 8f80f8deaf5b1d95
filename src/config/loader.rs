//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment keys that override the file configuration.
pub mod env_keys {
    pub const REJECT_THRESHOLD: &str = "GATE_CONCURRENT_REJECT_THRESHOLD";
    pub const BLOCKING_THRESHOLD: &str = "GATE_CONCURRENT_BLOCKING_THRESHOLD";
    pub const URI_PATTERN_LIST: &str = "GATE_CONCURRENT_URI_PATTERN_LIST";
    pub const CONTAINER_CPU_LIMIT: &str = "GATE_CONTAINER_CPU_LIMIT";
    pub const BLOCKING_TIMEOUT_MS: &str = "GATE_BLOCKING_TIMEOUT_MS";
    pub const BIND_ADDRESS: &str = "GATE_BIND_ADDRESS";
    pub const UPSTREAM_ADDRESS: &str = "GATE_UPSTREAM_ADDRESS";
    pub const LOG_LEVEL: &str = "GATE_LOG_LEVEL";
}

/// Delimiter between patterns in `GATE_CONCURRENT_URI_PATTERN_LIST`.
///
/// A bare comma is legal inside a regular expression (`{1,3}`), so the
/// list uses a backslash-comma pair instead.
pub const PATTERN_LIST_DELIMITER: &str = "\\,";

/// Error type for configuration loading and resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid numeric value for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error(
        "admission.blocking_threshold ({blocking}) must be less than \
         admission.reject_threshold ({reject})"
    )]
    BlockingNotBelowReject { blocking: usize, reject: usize },

    #[error("invalid admission URI pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the effective configuration: optional file, then environment
/// overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<GateConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GateConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Blank values are ignored so an exported-but-empty variable does not
/// wipe a value from the file.
pub fn apply_env_overrides<F>(config: &mut GateConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(env_keys::REJECT_THRESHOLD) {
        config.admission.reject_threshold = Some(v);
    }
    if let Some(v) = get(env_keys::BLOCKING_THRESHOLD) {
        config.admission.blocking_threshold = Some(v);
    }
    if let Some(v) = get(env_keys::CONTAINER_CPU_LIMIT) {
        config.admission.container_cpu_limit = Some(v);
    }
    if let Some(v) = get(env_keys::BLOCKING_TIMEOUT_MS) {
        config.admission.blocking_timeout_ms = Some(v);
    }
    if let Some(v) = get(env_keys::URI_PATTERN_LIST) {
        config.admission.uri_patterns = split_pattern_list(&v);
    }
    if let Some(v) = get(env_keys::BIND_ADDRESS) {
        config.listener.bind_address = v;
    }
    if let Some(v) = get(env_keys::UPSTREAM_ADDRESS) {
        config.upstream.address = Some(v);
    }
    if let Some(v) = get(env_keys::LOG_LEVEL) {
        config.observability.log_level = v;
    }
}

/// Split a delimited pattern list. Entries are kept verbatim (including
/// empty ones) so the scope matcher can report them.
pub fn split_pattern_list(raw: &str) -> Vec<String> {
    raw.split(PATTERN_LIST_DELIMITER).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_admission_settings() {
        let mut config = GateConfig::default();
        config.admission.reject_threshold = Some("2".into());

        apply_env_overrides(
            &mut config,
            lookup(&[
                (env_keys::REJECT_THRESHOLD, "10"),
                (env_keys::BLOCKING_THRESHOLD, "4"),
                (env_keys::CONTAINER_CPU_LIMIT, "1500m"),
                (env_keys::URI_PATTERN_LIST, "/api/.*\\,.*/v1/heavy$"),
                (env_keys::UPSTREAM_ADDRESS, "127.0.0.1:3000"),
            ]),
        );

        assert_eq!(config.admission.reject_threshold.as_deref(), Some("10"));
        assert_eq!(config.admission.blocking_threshold.as_deref(), Some("4"));
        assert_eq!(config.admission.container_cpu_limit.as_deref(), Some("1500m"));
        assert_eq!(config.admission.uri_patterns, vec!["/api/.*", ".*/v1/heavy$"]);
        assert_eq!(config.upstream.address.as_deref(), Some("127.0.0.1:3000"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = GateConfig::default();
        config.admission.reject_threshold = Some("7".into());

        apply_env_overrides(&mut config, lookup(&[(env_keys::REJECT_THRESHOLD, "  ")]));

        assert_eq!(config.admission.reject_threshold.as_deref(), Some("7"));
    }

    #[test]
    fn pattern_list_keeps_plain_commas() {
        let patterns = split_pattern_list("/a{1,3}\\,/b");
        assert_eq!(patterns, vec!["/a{1,3}", "/b"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn file_values_are_loaded_and_validated() {
        let path = std::env::temp_dir().join(format!("gate-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[admission]\nreject_threshold = 12\nuri_patterns = [\"/api/.*\"]\n\n\
             [timeouts]\nrequest_secs = 0\n",
        )
        .unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));

        std::fs::write(
            &path,
            "[admission]\nreject_threshold = 12\nuri_patterns = [\"/api/.*\"]\n",
        )
        .unwrap();
        let config = load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.admission.uri_patterns, vec!["/api/.*"]);
        assert!(config.admission.reject_threshold.is_some());
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::ZeroRequestTimeout,
            ValidationError::ZeroConnectTimeout,
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: timeouts.request_secs must be greater than zero, \
             timeouts.connect_secs must be greater than zero"
        );
    }
}
