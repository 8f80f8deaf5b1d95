//! Threshold resolution.
//!
//! Turns the raw admission settings into validated limits:
//!
//! ```text
//! reject_threshold    (0 / absent → disabled, nothing else is read)
//! container_cpu_limit ("2", "1.5", "500m" → whole cores, min 1)
//! blocking_threshold  (must be < reject, then clamped to the CPU limit)
//! blocking_timeout_ms (0 / absent → unbounded wait)
//! ```

use std::time::Duration;

use crate::config::{AdmissionSettings, ConfigError};

const REJECT_KEY: &str = "admission.reject_threshold";
const BLOCKING_KEY: &str = "admission.blocking_threshold";
const CPU_LIMIT_KEY: &str = "admission.container_cpu_limit";
const TIMEOUT_KEY: &str = "admission.blocking_timeout_ms";

/// Validated admission limits. Immutable once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Thresholds {
    reject: usize,
    blocking: usize,
    cpu_core_limit: Option<usize>,
    blocking_timeout: Option<Duration>,
}

impl Thresholds {
    /// Limits for a gate that admits everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Resolve raw settings into limits.
    pub fn resolve(settings: &AdmissionSettings) -> Result<Self, ConfigError> {
        let reject = parse_count(REJECT_KEY, settings.reject_threshold.as_deref())?;
        tracing::info!(reject_threshold = reject, "Max concurrent requests");
        if reject == 0 {
            return Ok(Self::disabled());
        }

        let cpu_core_limit = parse_cpu_limit(settings.container_cpu_limit.as_deref())?;

        let mut blocking = parse_count(BLOCKING_KEY, settings.blocking_threshold.as_deref())?;
        if blocking >= reject {
            return Err(ConfigError::BlockingNotBelowReject { blocking, reject });
        }

        if let Some(cores) = cpu_core_limit {
            if cores < blocking {
                tracing::info!(
                    configured = blocking,
                    cpu_cores = cores,
                    "Concurrent blocking threshold limited by container CPU limit"
                );
                blocking = cores;
            }
        }

        let timeout_ms = parse_count(TIMEOUT_KEY, settings.blocking_timeout_ms.as_deref())?;
        let blocking_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms as u64));

        tracing::info!(
            blocking_threshold = blocking,
            blocking_timeout_ms = timeout_ms,
            "Max concurrent running before blocking"
        );

        Ok(Self {
            reject,
            blocking,
            cpu_core_limit,
            blocking_timeout,
        })
    }

    /// Whether admission control applies at all.
    pub fn is_enabled(&self) -> bool {
        self.reject > 0
    }

    /// Whether arrivals over the blocking threshold wait instead of running.
    pub fn blocking_enabled(&self) -> bool {
        self.blocking > 0 && self.blocking < self.reject
    }

    pub fn reject(&self) -> usize {
        self.reject
    }

    pub fn blocking(&self) -> usize {
        self.blocking
    }

    pub fn cpu_core_limit(&self) -> Option<usize> {
        self.cpu_core_limit
    }

    pub fn blocking_timeout(&self) -> Option<Duration> {
        self.blocking_timeout
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_count(key: &'static str, raw: Option<&str>) -> Result<usize, ConfigError> {
    match non_blank(raw) {
        None => Ok(0),
        Some(value) => value.parse::<usize>().map_err(|_| {
            tracing::error!(key, value, "Format error in admission setting");
            ConfigError::InvalidNumber {
                key,
                value: value.to_string(),
            }
        }),
    }
}

/// Parse a container CPU limit into whole cores.
///
/// Rounds half-up. A positive limit never resolves below one core; a limit
/// of zero leaves the blocking threshold unclamped.
fn parse_cpu_limit(raw: Option<&str>) -> Result<Option<usize>, ConfigError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    let invalid = || {
        tracing::error!(key = CPU_LIMIT_KEY, value, "Format error in admission setting");
        ConfigError::InvalidNumber {
            key: CPU_LIMIT_KEY,
            value: value.to_string(),
        }
    };

    let cores = match value.strip_suffix('m') {
        Some(millicores) => millicores.trim().parse::<f64>().map_err(|_| invalid())? / 1000.0,
        None => value.parse::<f64>().map_err(|_| invalid())?,
    };
    if !cores.is_finite() || cores < 0.0 {
        return Err(invalid());
    }
    if cores == 0.0 {
        tracing::warn!(value, "Container CPU limit of zero ignored");
        return Ok(None);
    }

    let cores = (cores.round() as usize).max(1);
    tracing::info!(value, cpu_cores = cores, "Container CPU limit");
    Ok(Some(cores))
}
