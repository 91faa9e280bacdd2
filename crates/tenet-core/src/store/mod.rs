//! Durable storage for decisions and audit records.
//!
//! One directory holds every log:
//!
//! | File | Contents | Writer |
//! |------|----------|--------|
//! | `decisions.json` | [`Decision`] | decision write path |
//! | `violations.json` | [`Violation`] | decision write path, compliance check |
//! | `compliance.json` | [`ComplianceSnapshot`] | compliance check |
//! | `alerts.json` | [`Alert`] | compliance check |
//! | `safety_actions.json` | [`SafetyAction`] | external collaborator (read-only here) |
//! | `daily_report_<YYYYMMDD>.json` | [`DailyReport`] | daily report |
//!
//! Mutation is crate-private: the [`ComplianceMonitor`](crate::ComplianceMonitor)
//! owns the store and is the only writer.

mod log;

pub use log::JsonLog;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::policy::Retention;
use crate::types::{Alert, ComplianceSnapshot, DailyReport, Decision, SafetyAction, Violation};

pub const DECISIONS_FILE: &str = "decisions.json";
pub const VIOLATIONS_FILE: &str = "violations.json";
pub const COMPLIANCE_FILE: &str = "compliance.json";
pub const ALERTS_FILE: &str = "alerts.json";
pub const SAFETY_ACTIONS_FILE: &str = "safety_actions.json";

/// Errors from the storage layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// The set of logs backing one agent's audit trail.
pub struct AuditStore {
    root: PathBuf,
    decisions: JsonLog<Decision>,
    violations: JsonLog<Violation>,
    compliance: JsonLog<ComplianceSnapshot>,
    alerts: JsonLog<Alert>,
    safety_actions: JsonLog<SafetyAction>,
}

impl AuditStore {
    /// Open (creating if needed) the log directory.
    ///
    /// Failing to create the directory is the one fatal storage error.
    pub fn open(root: impl Into<PathBuf>, retention: &Retention) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::CreateDir {
            path: root.clone(),
            source,
        })?;

        Ok(Self {
            decisions: JsonLog::new(root.join(DECISIONS_FILE), retention.decisions),
            violations: JsonLog::new(root.join(VIOLATIONS_FILE), retention.violations),
            compliance: JsonLog::new(root.join(COMPLIANCE_FILE), retention.compliance),
            alerts: JsonLog::new(root.join(ALERTS_FILE), retention.alerts),
            safety_actions: JsonLog::new(root.join(SAFETY_ACTIONS_FILE), usize::MAX),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read_decisions(&self) -> Vec<Decision> {
        self.decisions.read_all()
    }

    pub fn read_violations(&self) -> Vec<Violation> {
        self.violations.read_all()
    }

    pub fn read_snapshots(&self) -> Vec<ComplianceSnapshot> {
        self.compliance.read_all()
    }

    pub fn read_alerts(&self) -> Vec<Alert> {
        self.alerts.read_all()
    }

    pub fn read_safety_actions(&self) -> Vec<SafetyAction> {
        self.safety_actions.read_all()
    }

    pub(crate) fn decisions(&self) -> &JsonLog<Decision> {
        &self.decisions
    }

    pub(crate) fn violations(&self) -> &JsonLog<Violation> {
        &self.violations
    }

    pub(crate) fn compliance(&self) -> &JsonLog<ComplianceSnapshot> {
        &self.compliance
    }

    pub(crate) fn alerts(&self) -> &JsonLog<Alert> {
        &self.alerts
    }

    /// Path of the report file for `date`.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("daily_report_{}.json", date.format("%Y%m%d")))
    }

    /// Persist a daily report, replacing any earlier report for the same day.
    pub(crate) fn write_report(&self, report: &DailyReport) -> Result<PathBuf, StoreError> {
        let path = self.report_path(report.date);
        log::write_atomic(&path, report)?;
        Ok(path)
    }

    pub fn read_report(&self, date: NaiveDate) -> Option<DailyReport> {
        let path = self.report_path(date);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Daily report unreadable");
                None
            }
        }
    }
}
