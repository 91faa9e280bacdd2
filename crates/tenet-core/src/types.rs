//! Core records shared by the decision trees, the logs, and the monitor.
//!
//! Everything here is serialized into the JSON logs, so field names follow
//! the persisted layout rather than Rust conventions where the two differ.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::DecisionError;

/// The four categories of operational dilemma the engine can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    MaintenanceVsFeature,
    Communication,
    ErrorHandling,
    ResourceAllocation,
}

impl ScenarioType {
    pub const ALL: [ScenarioType; 4] = [
        ScenarioType::MaintenanceVsFeature,
        ScenarioType::Communication,
        ScenarioType::ErrorHandling,
        ScenarioType::ResourceAllocation,
    ];

    /// The key used in the decision log's `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioType::MaintenanceVsFeature => "maintenance_vs_feature",
            ScenarioType::Communication => "communication",
            ScenarioType::ErrorHandling => "error_handling",
            ScenarioType::ResourceAllocation => "resource_allocation",
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioType {
    type Err = DecisionError;

    /// Accepts snake_case, kebab-case, and camelCase spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "maintenancevsfeature" => Ok(ScenarioType::MaintenanceVsFeature),
            "communication" => Ok(ScenarioType::Communication),
            "errorhandling" => Ok(ScenarioType::ErrorHandling),
            "resourceallocation" => Ok(ScenarioType::ResourceAllocation),
            _ => Err(DecisionError::UnknownScenario(s.to_string())),
        }
    }
}

/// One evaluated choice, as persisted in `decisions.json`.
///
/// Records produced by the trees always satisfy `chosen ∈ options` and carry
/// non-empty reasoning. Records read back from disk may not; content fields
/// default on deserialization so the transparency check can report them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    /// Timestamp plus content hash, assigned at write time
    pub id: String,

    /// Scenario key (one of the tree names, or a caller-supplied type)
    #[serde(rename = "type")]
    pub scenario: String,

    /// Candidate choices considered, in order
    #[serde(default)]
    pub options: Vec<String>,

    /// The selected option
    #[serde(default)]
    pub chosen: String,

    /// Free-text justification
    #[serde(default)]
    pub reasoning: String,

    /// Confidence in `[0.0, 1.0]`
    #[serde(default)]
    pub score: Option<f64>,

    pub timestamp: DateTime<FixedOffset>,

    /// Tree-specific structured detail (costs, ROI, allocation plan)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, JsonValue>,
}

impl Decision {
    /// Names of the transparency fields this decision lacks.
    pub fn missing_transparency_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.reasoning.trim().is_empty() {
            missing.push("reasoning");
        }
        if self.score.is_none() {
            missing.push("score");
        }
        if self.options.is_empty() {
            missing.push("options");
        }
        missing
    }

    pub fn is_transparent(&self) -> bool {
        self.missing_transparency_fields().is_empty()
    }
}

/// The caller-supplied part of a decision, before the log assigns an id and
/// timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionDraft {
    pub scenario: String,
    pub options: Vec<String>,
    pub chosen: String,
    pub reasoning: String,
    pub score: Option<f64>,
    pub details: BTreeMap<String, JsonValue>,
}

impl DecisionDraft {
    pub fn new(
        scenario: impl Into<String>,
        options: Vec<String>,
        chosen: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            options,
            chosen: chosen.into(),
            reasoning: reasoning.into(),
            score: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_details(mut self, details: BTreeMap<String, JsonValue>) -> Self {
        self.details = details;
        self
    }
}

/// Category of a recorded breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    QuietHoursViolation,
    TransparencyViolation,
    LowConfidenceDecision,
    UnapprovedSafetyAction,
    /// Any category written by a newer or foreign writer
    #[serde(other)]
    Other,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::QuietHoursViolation => "quiet_hours_violation",
            ViolationKind::TransparencyViolation => "transparency_violation",
            ViolationKind::LowConfidenceDecision => "low_confidence_decision",
            ViolationKind::UnapprovedSafetyAction => "unapproved_safety_action",
            ViolationKind::Other => "other",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A breach of a decision-quality or protocol rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,

    /// The offending decision or check detail
    pub payload: JsonValue,

    pub timestamp: DateTime<FixedOffset>,
}

impl Violation {
    pub fn new(kind: ViolationKind, payload: JsonValue, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            kind,
            payload,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Raised when a compliance snapshot scores below the alert threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<FixedOffset>,
}

/// Outcome of one compliance check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckResult {
    pub passed: bool,

    #[serde(default)]
    pub violations: Vec<Violation>,

    #[serde(default)]
    pub metrics: BTreeMap<String, JsonValue>,
}

impl CheckResult {
    pub fn metric_f64(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(JsonValue::as_f64)
    }
}

/// The three checks of one audit, keyed by check name when serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComplianceChecks {
    #[serde(default)]
    pub communication: CheckResult,

    #[serde(default)]
    pub transparency: CheckResult,

    #[serde(default)]
    pub safety: CheckResult,
}

impl ComplianceChecks {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CheckResult)> {
        [
            ("communication", &self.communication),
            ("transparency", &self.transparency),
            ("safety", &self.safety),
        ]
        .into_iter()
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.iter().flat_map(|(_, check)| check.violations.iter())
    }
}

/// One periodic audit result, as persisted in `compliance.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSnapshot {
    pub timestamp: DateTime<FixedOffset>,
    pub compliance_score: f64,
    pub checks: ComplianceChecks,
    pub quiet_hours: bool,
}

/// Message urgency. Parsed case-insensitively; anything unrecognized is
/// `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    High,
    #[default]
    Normal,
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        let urgency = match value.as_str().map(str::to_ascii_lowercase).as_deref() {
            Some("high") => Urgency::High,
            Some("low") => Urgency::Low,
            _ => Urgency::Normal,
        };
        Ok(urgency)
    }
}

/// A recent outbound message, supplied by the messaging collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MessageSample {
    #[serde(default)]
    pub urgency: Urgency,

    #[serde(default)]
    pub critical: bool,

    #[serde(default)]
    pub content: String,
}

/// An entry of the externally fed safety-action log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAction {
    pub timestamp: DateTime<FixedOffset>,

    #[serde(default, alias = "requires_approval")]
    pub requires_approval: bool,

    #[serde(default)]
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl SafetyAction {
    pub fn is_unapproved(&self) -> bool {
        self.requires_approval && !self.approved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,

    /// The recurring violation category this addresses, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<String>,
}

/// Aggregate over the most recent compliance snapshots of one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub generated_at: DateTime<FixedOffset>,
    pub snapshot_count: usize,
    pub average_score: f64,
    pub total_violations: usize,
    pub quiet_hours_checks: usize,
    pub violation_counts: BTreeMap<String, usize>,
    pub recommendations: Vec<Recommendation>,
}

/// Whether the decision write path managed to persist a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogStatus {
    Recorded,
    Failed { reason: String },
}

impl LogStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, LogStatus::Recorded)
    }
}

/// A decision handed back to the caller, with the fate of its log write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub log_status: LogStatus,

    /// The low-confidence violation raised alongside, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<Violation>,
}
