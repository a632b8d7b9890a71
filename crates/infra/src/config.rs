//! Configuration loading and representation.
//!
//! Values come from the process environment, after an optional `.env` file.
//! Unset variables take the component defaults; malformed ones are errors.

use std::time::Duration;

use anyhow::Context;
use thiserror::Error;

use custodia_audit::DEFAULT_AUDIT_TIMEOUT;
use custodia_security::{DetectionConfig, FailedLoginConfig, Severity};

pub const BOOTSTRAP_SECRET: &str = "CUSTODIA_BOOTSTRAP_SECRET";
pub const FAILED_LOGIN_THRESHOLD: &str = "CUSTODIA_FAILED_LOGIN_THRESHOLD";
pub const FAILED_LOGIN_WINDOW_SECS: &str = "CUSTODIA_FAILED_LOGIN_WINDOW_SECS";
pub const INCIDENT_CORRELATION_WINDOW_SECS: &str = "CUSTODIA_INCIDENT_CORRELATION_WINDOW_SECS";
pub const NOTIFICATION_THRESHOLD: &str = "CUSTODIA_NOTIFICATION_THRESHOLD";
pub const AUDIT_TIMEOUT_MS: &str = "CUSTODIA_AUDIT_TIMEOUT_MS";
pub const TRACKER_SWEEP_INTERVAL_SECS: &str = "CUSTODIA_TRACKER_SWEEP_INTERVAL_SECS";

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{var} is invalid: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(var: &'static str, reason: impl Into<String>) -> Self {
        Self {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CustodiaConfig {
    /// `None` disables bootstrap entirely.
    pub bootstrap_secret: Option<String>,
    pub failed_login: FailedLoginConfig,
    pub detection: DetectionConfig,
    pub audit_timeout: Duration,
    pub tracker_sweep_interval: Duration,
}

impl Default for CustodiaConfig {
    fn default() -> Self {
        Self {
            bootstrap_secret: None,
            failed_login: FailedLoginConfig::default(),
            detection: DetectionConfig::default(),
            audit_timeout: DEFAULT_AUDIT_TIMEOUT,
            tracker_sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl core::fmt::Debug for CustodiaConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CustodiaConfig")
            .field("bootstrap_secret", &self.bootstrap_secret.as_ref().map(|_| "<redacted>"))
            .field("failed_login", &self.failed_login)
            .field("detection", &self.detection)
            .field("audit_timeout", &self.audit_timeout)
            .field("tracker_sweep_interval", &self.tracker_sweep_interval)
            .finish()
    }
}

impl CustodiaConfig {
    /// Process-edge entry point.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// [`load`](Self::load) over an arbitrary variable source.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(lookup).context("failed to load custodia configuration")
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bootstrap_secret = get(BOOTSTRAP_SECRET);

        let threshold = match get(FAILED_LOGIN_THRESHOLD) {
            Some(raw) => parse_u64(FAILED_LOGIN_THRESHOLD, &raw).and_then(|n| {
                u32::try_from(n).map_err(|_| ConfigError::new(FAILED_LOGIN_THRESHOLD, "out of range"))
            })?,
            None => defaults.failed_login.threshold,
        };
        let window = match get(FAILED_LOGIN_WINDOW_SECS) {
            Some(raw) => chrono_secs(FAILED_LOGIN_WINDOW_SECS, &raw)?,
            None => defaults.failed_login.window,
        };
        let correlation_window = match get(INCIDENT_CORRELATION_WINDOW_SECS) {
            Some(raw) => chrono_secs(INCIDENT_CORRELATION_WINDOW_SECS, &raw)?,
            None => defaults.detection.correlation_window,
        };
        let notification_threshold = match get(NOTIFICATION_THRESHOLD) {
            Some(raw) => raw
                .parse::<Severity>()
                .map_err(|_| ConfigError::new(NOTIFICATION_THRESHOLD, "expected LOW, MEDIUM, HIGH or CRITICAL"))?,
            None => defaults.detection.notification_threshold,
        };
        let audit_timeout = match get(AUDIT_TIMEOUT_MS) {
            Some(raw) => Duration::from_millis(positive(AUDIT_TIMEOUT_MS, parse_u64(AUDIT_TIMEOUT_MS, &raw)?)?),
            None => defaults.audit_timeout,
        };
        let tracker_sweep_interval = match get(TRACKER_SWEEP_INTERVAL_SECS) {
            Some(raw) => Duration::from_secs(positive(
                TRACKER_SWEEP_INTERVAL_SECS,
                parse_u64(TRACKER_SWEEP_INTERVAL_SECS, &raw)?,
            )?),
            None => defaults.tracker_sweep_interval,
        };

        Ok(Self {
            bootstrap_secret,
            failed_login: FailedLoginConfig {
                threshold,
                window,
                ..defaults.failed_login
            },
            detection: DetectionConfig {
                correlation_window,
                notification_threshold,
            },
            audit_timeout,
            tracker_sweep_interval,
        })
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|e| ConfigError::new(var, format!("expected a non-negative integer ({e})")))
}

fn positive(var: &'static str, n: u64) -> Result<u64, ConfigError> {
    if n == 0 {
        return Err(ConfigError::new(var, "must be greater than zero"));
    }
    Ok(n)
}

fn chrono_secs(var: &'static str, raw: &str) -> Result<chrono::Duration, ConfigError> {
    let secs = positive(var, parse_u64(var, raw)?)?;
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::new(var, "out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn load_wraps_errors_with_context() {
        let err = CustodiaConfig::load_with(lookup(&[(AUDIT_TIMEOUT_MS, "soon")])).unwrap_err();
        assert_eq!(err.to_string(), "failed to load custodia configuration");
        let cause = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(cause.var, AUDIT_TIMEOUT_MS);

        let ok = CustodiaConfig::load_with(lookup(&[(FAILED_LOGIN_THRESHOLD, "7")])).unwrap();
        assert_eq!(ok.failed_login.threshold, 7);
    }

    #[test]
    fn unset_variables_use_component_defaults() {
        let config = CustodiaConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CustodiaConfig::default());
        assert_eq!(config.failed_login.threshold, 5);
        assert_eq!(config.detection.notification_threshold, Severity::Low);
        assert!(config.bootstrap_secret.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let config = CustodiaConfig::from_lookup(lookup(&[
            (BOOTSTRAP_SECRET, "s3cret-value"),
            (FAILED_LOGIN_THRESHOLD, "3"),
            (FAILED_LOGIN_WINDOW_SECS, "120"),
            (INCIDENT_CORRELATION_WINDOW_SECS, "600"),
            (NOTIFICATION_THRESHOLD, "medium"),
            (AUDIT_TIMEOUT_MS, "250"),
            (TRACKER_SWEEP_INTERVAL_SECS, "30"),
        ]))
        .unwrap();

        assert_eq!(config.bootstrap_secret.as_deref(), Some("s3cret-value"));
        assert_eq!(config.failed_login.threshold, 3);
        assert_eq!(config.failed_login.window, chrono::Duration::seconds(120));
        assert_eq!(config.detection.correlation_window, chrono::Duration::seconds(600));
        assert_eq!(config.detection.notification_threshold, Severity::Medium);
        assert_eq!(config.audit_timeout, Duration::from_millis(250));
        assert_eq!(config.tracker_sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = CustodiaConfig::from_lookup(lookup(&[(FAILED_LOGIN_THRESHOLD, "five")])).unwrap_err();
        assert_eq!(err.var, FAILED_LOGIN_THRESHOLD);

        let err = CustodiaConfig::from_lookup(lookup(&[(NOTIFICATION_THRESHOLD, "SEVERE")])).unwrap_err();
        assert_eq!(err.var, NOTIFICATION_THRESHOLD);

        let err = CustodiaConfig::from_lookup(lookup(&[(AUDIT_TIMEOUT_MS, "0")])).unwrap_err();
        assert_eq!(err.var, AUDIT_TIMEOUT_MS);
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let config = CustodiaConfig::from_lookup(lookup(&[(BOOTSTRAP_SECRET, "   ")])).unwrap();
        assert!(config.bootstrap_secret.is_none());
    }

    #[test]
    fn debug_redacts_the_secret() {
        let config = CustodiaConfig::from_lookup(lookup(&[(BOOTSTRAP_SECRET, "s3cret-value")])).unwrap();
        assert!(!format!("{config:?}").contains("s3cret-value"));
    }
}
