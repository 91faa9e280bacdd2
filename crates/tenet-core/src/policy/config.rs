//! Policy parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Compliance score below which an alert is raised.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.8;

/// Transparent-decision fraction required for the transparency check to pass.
pub const DEFAULT_TRANSPARENCY_RATE: f64 = 0.8;

/// Decision scores below this raise a `low_confidence_decision` violation.
pub const DEFAULT_LOW_CONFIDENCE: f64 = 0.6;

/// Auto-fix confidence an error must exceed before it is fixed unattended.
pub const DEFAULT_AUTO_FIX_CONFIDENCE: f64 = 0.8;

/// Resource usage percentage that switches allocation to conservative mode.
pub const DEFAULT_RESOURCE_USAGE_TRIGGER: f64 = 80.0;

/// Longest accepted audit look-back: one leap year.
pub const MAX_LOOKBACK_HOURS: i64 = 366 * 24;

/// Errors that can occur when loading a policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Policy validation failed: {0}")]
    ValidationError(String),
}

/// Weight each check contributes to the compliance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckWeights {
    pub communication: f64,
    pub transparency: f64,
    pub safety: f64,
}

impl Default for CheckWeights {
    fn default() -> Self {
        Self {
            communication: 0.3,
            transparency: 0.4,
            safety: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub alert_score: f64,
    pub transparency_rate: f64,
    pub low_confidence: f64,
    pub auto_fix_confidence: f64,
    pub resource_usage_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            alert_score: DEFAULT_ALERT_THRESHOLD,
            transparency_rate: DEFAULT_TRANSPARENCY_RATE,
            low_confidence: DEFAULT_LOW_CONFIDENCE,
            auto_fix_confidence: DEFAULT_AUTO_FIX_CONFIDENCE,
            resource_usage_percent: DEFAULT_RESOURCE_USAGE_TRIGGER,
        }
    }
}

/// Soft caps for each log; the oldest entries are evicted beyond these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Retention {
    pub decisions: usize,
    pub violations: usize,
    /// 30 days of hourly snapshots
    pub compliance: usize,
    pub alerts: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            decisions: 1000,
            violations: 1000,
            compliance: 720,
            alerts: 1000,
        }
    }
}

/// Sample sizes and look-back windows used by the audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Windows {
    pub lookback_hours: i64,
    pub transparency_sample: usize,
    pub safety_sample: usize,
    pub report_snapshots: usize,
    /// Occurrences within a report window that make a violation "recurring"
    pub recurring_violation: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            transparency_sample: 50,
            safety_sample: 100,
            report_snapshots: 24,
            recurring_violation: 3,
        }
    }
}

/// The full set of tunable numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Policy {
    pub weights: CheckWeights,
    pub thresholds: Thresholds,
    pub retention: Retention,
    pub windows: Windows,
}

impl Policy {
    /// Parse a policy from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_yaml::from_str(yaml)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parse a policy from JSON string.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parse a policy file, choosing the format by extension (YAML unless `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Validate the policy numbers.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let weights = &self.weights;
        for (name, weight) in [
            ("weights.communication", weights.communication),
            ("weights.transparency", weights.transparency),
            ("weights.safety", weights.safety),
        ] {
            check_unit_interval(name, weight)?;
        }

        let total = weights.communication + weights.transparency + weights.safety;
        if (total - 1.0).abs() > 1e-9 {
            return Err(PolicyError::ValidationError(format!(
                "check weights must sum to 1.0, got {}",
                total
            )));
        }

        let thresholds = &self.thresholds;
        check_unit_interval("thresholds.alert_score", thresholds.alert_score)?;
        check_unit_interval("thresholds.transparency_rate", thresholds.transparency_rate)?;
        check_unit_interval("thresholds.low_confidence", thresholds.low_confidence)?;
        check_unit_interval("thresholds.auto_fix_confidence", thresholds.auto_fix_confidence)?;

        if !(0.0..=100.0).contains(&thresholds.resource_usage_percent) {
            return Err(PolicyError::ValidationError(format!(
                "thresholds.resource_usage_percent must be within 0..=100, got {}",
                thresholds.resource_usage_percent
            )));
        }

        let retention = &self.retention;
        for (name, cap) in [
            ("retention.decisions", retention.decisions),
            ("retention.violations", retention.violations),
            ("retention.compliance", retention.compliance),
            ("retention.alerts", retention.alerts),
            ("windows.transparency_sample", self.windows.transparency_sample),
            ("windows.safety_sample", self.windows.safety_sample),
            ("windows.report_snapshots", self.windows.report_snapshots),
            ("windows.recurring_violation", self.windows.recurring_violation),
        ] {
            if cap == 0 {
                return Err(PolicyError::ValidationError(format!(
                    "{} must be positive",
                    name
                )));
            }
        }

        if !(1..=MAX_LOOKBACK_HOURS).contains(&self.windows.lookback_hours) {
            return Err(PolicyError::ValidationError(format!(
                "windows.lookback_hours must be within 1..={}, got {}",
                MAX_LOOKBACK_HOURS, self.windows.lookback_hours
            )));
        }

        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), PolicyError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PolicyError::ValidationError(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_preserves_constants() {
        let policy = Policy::default();
        assert_eq!(policy.weights, CheckWeights { communication: 0.3, transparency: 0.4, safety: 0.3 });
        assert_eq!(policy.thresholds.alert_score, 0.8);
        assert_eq!(policy.thresholds.resource_usage_percent, 80.0);
        assert_eq!(policy.retention.decisions, 1000);
        assert_eq!(policy.retention.compliance, 720);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy = Policy::from_yaml(
            r#"
thresholds:
  alert_score: 0.9
retention:
  decisions: 200
"#,
        )
        .unwrap();

        assert_eq!(policy.thresholds.alert_score, 0.9);
        assert_eq!(policy.thresholds.low_confidence, 0.6);
        assert_eq!(policy.retention.decisions, 200);
        assert_eq!(policy.retention.alerts, 1000);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let result = Policy::from_json(r#"{"weights": {"communication": 0.5}}"#);
        assert!(matches!(result, Err(PolicyError::ValidationError(_))));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let result = Policy::from_yaml("retention:\n  violations: 0\n");
        assert!(matches!(result, Err(PolicyError::ValidationError(msg)) if msg.contains("violations")));
    }

    #[test]
    fn test_lookback_hours_bounded() {
        let result = Policy::from_yaml("windows:\n  lookback_hours: 10000000000\n");
        assert!(matches!(result, Err(PolicyError::ValidationError(msg)) if msg.contains("lookback_hours")));

        assert!(Policy::from_yaml("windows:\n  lookback_hours: 0\n").is_err());
        assert!(Policy::from_yaml("windows:\n  lookback_hours: 8784\n").is_ok());
        assert!(Policy::from_yaml("windows:\n  lookback_hours: 8785\n").is_err());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(matches!(
            Policy::from_yaml("weights: [1, 2"),
            Err(PolicyError::YamlError(_))
        ));
    }
}
