//! Engine configuration: confidence tiers, retry policy, monitor and
//! analyzer knobs.
//!
//! Defaults carry the tuned production constants; embedders can load an
//! override document from a JSON file. Validation rejects configurations
//! that would break the cascade invariants (e.g. inverted tier
//! thresholds).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file corrupted at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timestamp-fallback settings (the cascade's termination guarantee).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// When disabled the cascade returns `manual` at confidence 0 instead.
    pub enabled: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Cascade orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Tier 1 acceptance threshold; also the no-confirmation bar.
    pub high_confidence: f64,
    /// Tier 2 acceptance threshold.
    pub medium_confidence: f64,
    /// Tier 3 acceptance threshold and floor.
    pub low_confidence: f64,
    /// Extra attempts after a failed strategy invocation.
    pub max_retries: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
    /// Evaluate each strategy at most once across tiers.
    ///
    /// The default (false) re-invokes low-priority strategies in later
    /// tiers, matching the historical cascade; strict mode is the
    /// documented deviation for embedders that want one invocation per
    /// strategy.
    pub strict_mode: bool,
    pub timestamp_fallback: FallbackConfig,
    /// Bound on hierarchy parent walks.
    pub max_hierarchy_depth: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.7,
            medium_confidence: 0.5,
            low_confidence: 0.4,
            max_retries: 2,
            retry_backoff_ms: 100,
            strict_mode: false,
            timestamp_fallback: FallbackConfig::default(),
            max_hierarchy_depth: 32,
        }
    }
}

/// Performance monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Metrics ring buffer capacity.
    pub metrics_capacity: usize,
    /// Health check cadence while the background runner is active.
    pub health_interval_secs: u64,
    /// Alert: resolution confidence below this value.
    pub low_confidence_alert: f64,
    /// Alert: resolution slower than this budget.
    pub slow_resolution_ms: u64,
    /// Alert: fallback chain longer than this.
    pub max_fallback_chain: usize,
    /// Alert: network reliability below this during a failed resolution.
    pub unreliable_network: f64,
    /// Health score below this raises a system alert.
    pub health_alert_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_capacity: 1000,
            health_interval_secs: 30,
            low_confidence_alert: 0.3,
            slow_resolution_ms: 10_000,
            max_fallback_chain: 3,
            unreliable_network: 0.3,
            health_alert_threshold: 0.6,
        }
    }
}

/// Pattern analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Conflict history ring buffer capacity.
    pub history_capacity: usize,
    /// Supporting records older than this are pruned by the sweep.
    pub retention_days: i64,
    /// Unmatched conflicts needed before a pattern is synthesized.
    pub emergence_min_count: usize,
    /// Window for emergent-pattern counting.
    pub emergence_window_hours: i64,
    /// Insights older than this are dropped.
    pub insight_ttl_hours: i64,
    /// Predictions below this probability are not reported.
    pub min_prediction_probability: f64,
    /// Maintenance sweep cadence.
    pub maintenance_interval_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            retention_days: 30,
            emergence_min_count: 3,
            emergence_window_hours: 24,
            insight_ttl_hours: 24,
            min_prediction_probability: 0.3,
            maintenance_interval_secs: 3600,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

impl EngineConfig {
    /// Check cross-field invariants the cascade depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.cascade;
        for (name, v) in [
            ("high_confidence", c.high_confidence),
            ("medium_confidence", c.medium_confidence),
            ("low_confidence", c.low_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        if c.low_confidence > c.medium_confidence || c.medium_confidence > c.high_confidence {
            return Err(ConfigError::Invalid(
                "confidence tiers must satisfy low <= medium <= high".to_string(),
            ));
        }
        if c.max_hierarchy_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_hierarchy_depth must be at least 1".to_string(),
            ));
        }
        if self.monitor.metrics_capacity == 0 || self.analyzer.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacities must be non-zero".to_string(),
            ));
        }
        if self.analyzer.retention_days <= 0 {
            return Err(ConfigError::Invalid(
                "retention_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration document, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(self).expect("config serialization is infallible");
        std::fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_tuned_constants() {
        let c = EngineConfig::default();
        assert!((c.cascade.high_confidence - 0.7).abs() < f64::EPSILON);
        assert!((c.cascade.medium_confidence - 0.5).abs() < f64::EPSILON);
        assert!((c.cascade.low_confidence - 0.4).abs() < f64::EPSILON);
        assert_eq!(c.cascade.max_retries, 2);
        assert_eq!(c.cascade.retry_backoff_ms, 100);
        assert!(c.cascade.timestamp_fallback.enabled);
        assert_eq!(c.monitor.metrics_capacity, 1000);
        assert_eq!(c.monitor.health_interval_secs, 30);
        assert_eq!(c.analyzer.retention_days, 30);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn inverted_tiers_rejected() {
        let mut c = EngineConfig::default();
        c.cascade.medium_confidence = 0.9;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("low <= medium <= high"));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut c = EngineConfig::default();
        c.cascade.high_confidence = 1.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut c = EngineConfig::default();
        c.monitor.metrics_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EngineConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.monitor.metrics_capacity, 1000);
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.json");

        let mut config = EngineConfig::default();
        config.cascade.strict_mode = true;
        config.monitor.slow_resolution_ms = 5000;
        config.save(&path).unwrap();

        let back = EngineConfig::load(&path).unwrap();
        assert!(back.cascade.strict_mode);
        assert_eq!(back.monitor.slow_resolution_ms, 5000);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("engine.json"));
    }
}
