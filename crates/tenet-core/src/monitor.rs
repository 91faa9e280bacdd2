//! Compliance monitor: the audit trail's single writer.
//!
//! The monitor records decisions as they are made and, on an external
//! cadence, audits recent behavior with three independent checks:
//!
//! | Check | Passes when | Weight |
//! |-------|-------------|--------|
//! | communication | no high-urgency, non-critical message during quiet hours | 0.3 |
//! | transparency | ≥ 80% of recent decisions carry reasoning, score, and options | 0.4 × rate |
//! | safety | no recent safety action needed approval without getting it | 0.3 |
//!
//! Storage failures never propagate: the monitor audits the agent and must
//! not take it down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::clock::{is_quiet_hour, Clock};
use crate::policy::{CheckWeights, Policy};
use crate::report::{build_daily_report, round4};
use crate::store::AuditStore;
use crate::types::{
    Alert, CheckResult, ComplianceChecks, ComplianceSnapshot, DailyReport, Decision,
    DecisionDraft, DecisionOutcome, LogStatus, MessageSample, Severity, Urgency, Violation,
    ViolationKind,
};

/// Weighted compliance score.
///
/// Communication and safety contribute their weight only when passed;
/// transparency always contributes `weight × rate`.
pub fn compliance_score(
    weights: &CheckWeights,
    communication_passed: bool,
    transparency_rate: f64,
    safety_passed: bool,
) -> f64 {
    let mut score = weights.transparency * transparency_rate.clamp(0.0, 1.0);
    if communication_passed {
        score += weights.communication;
    }
    if safety_passed {
        score += weights.safety;
    }
    round4(score)
}

pub struct ComplianceMonitor {
    store: AuditStore,
    policy: Policy,
    clock: Arc<dyn Clock>,
    sequence: AtomicU64,
}

impl ComplianceMonitor {
    pub fn new(store: AuditStore, policy: Policy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    /// True between 22:00 and 08:00 local time.
    pub fn is_quiet_hours(&self) -> bool {
        is_quiet_hour(self.clock.hour())
    }

    /// Record a decision, plus a `low_confidence_decision` violation when
    /// its score is under the low-confidence threshold.
    ///
    /// The decision is always returned; write failures show up in
    /// [`DecisionOutcome::log_status`].
    pub fn log_decision(&self, draft: DecisionDraft) -> DecisionOutcome {
        let now = self.clock.now();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        if !draft.options.contains(&draft.chosen) {
            tracing::warn!(
                scenario = %draft.scenario,
                chosen = %draft.chosen,
                "Chosen option is not among the options considered"
            );
        }

        let score = draft.score.and_then(|score| normalize_score(&draft.scenario, score));

        let decision = Decision {
            id: decision_id(&draft, now, sequence),
            scenario: draft.scenario,
            options: draft.options,
            chosen: draft.chosen,
            reasoning: draft.reasoning,
            score,
            timestamp: now,
            details: draft.details,
        };

        let mut failures = Vec::new();
        if let Err(e) = self.store.decisions().append(decision.clone()) {
            tracing::warn!(decision_id = %decision.id, error = %e, "Decision not recorded");
            failures.push(format!("decision not recorded: {}", e));
        }

        let violation = match decision.score {
            Some(score) if score < self.policy.thresholds.low_confidence => {
                let violation = Violation::new(
                    ViolationKind::LowConfidenceDecision,
                    serde_json::to_value(&decision).unwrap_or(JsonValue::Null),
                    now,
                );
                if let Err(e) = self.store.violations().append(violation.clone()) {
                    tracing::warn!(decision_id = %decision.id, error = %e, "Violation not recorded");
                    failures.push(format!("violation not recorded: {}", e));
                }
                Some(violation)
            }
            _ => None,
        };

        tracing::debug!(
            decision_id = %decision.id,
            scenario = %decision.scenario,
            chosen = %decision.chosen,
            score = ?decision.score,
            "Decision logged"
        );

        let log_status = if failures.is_empty() {
            LogStatus::Recorded
        } else {
            LogStatus::Failed {
                reason: failures.join("; "),
            }
        };

        DecisionOutcome {
            decision,
            log_status,
            violation,
        }
    }

    /// Run all three checks, persist the snapshot, and alert on a low score.
    ///
    /// `messages` is the recent outbound-message sample from the messaging
    /// collaborator; the safety feed is read from the store.
    pub fn run_compliance_check(&self, messages: &[MessageSample]) -> ComplianceSnapshot {
        let now = self.clock.now();
        let quiet_hours = self.is_quiet_hours();

        let communication = self.check_communication(messages, quiet_hours, now);
        let (transparency, transparency_rate) = self.check_transparency(now);
        let safety = self.check_safety(now);

        let score = compliance_score(
            &self.policy.weights,
            communication.passed,
            transparency_rate,
            safety.passed,
        );

        let snapshot = ComplianceSnapshot {
            timestamp: now,
            compliance_score: score,
            checks: ComplianceChecks {
                communication,
                transparency,
                safety,
            },
            quiet_hours,
        };

        let failed_violations: Vec<Violation> = snapshot
            .checks
            .iter()
            .filter(|(_, check)| !check.passed)
            .flat_map(|(_, check)| check.violations.iter().cloned())
            .collect();
        if let Err(e) = self.store.violations().append_all(failed_violations) {
            tracing::warn!(error = %e, "Check violations not recorded");
        }

        if let Err(e) = self.store.compliance().append(snapshot.clone()) {
            tracing::warn!(error = %e, "Compliance snapshot not recorded");
        }

        if score < self.policy.thresholds.alert_score {
            let alert = Alert {
                message: format!("Low compliance score: {:.2}", score),
                severity: Severity::Medium,
                timestamp: now,
            };
            tracing::warn!(score, "Compliance below alert threshold");
            if let Err(e) = self.store.alerts().append(alert) {
                tracing::warn!(error = %e, "Alert not recorded");
            }
        }

        tracing::info!(
            score,
            communication = snapshot.checks.communication.passed,
            transparency = snapshot.checks.transparency.passed,
            safety = snapshot.checks.safety.passed,
            quiet_hours,
            "Compliance check complete"
        );

        snapshot
    }

    fn check_communication(
        &self,
        messages: &[MessageSample],
        quiet_hours: bool,
        now: DateTime<FixedOffset>,
    ) -> CheckResult {
        let violations: Vec<Violation> = if quiet_hours {
            messages
                .iter()
                .filter(|m| m.urgency == Urgency::High && !m.critical)
                .map(|m| {
                    Violation::new(
                        ViolationKind::QuietHoursViolation,
                        json!({ "urgency": m.urgency, "critical": m.critical, "content": m.content }),
                        now,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        CheckResult {
            passed: violations.is_empty(),
            metrics: [
                ("messages_checked".to_string(), json!(messages.len())),
                ("quiet_hours".to_string(), json!(quiet_hours)),
            ]
            .into_iter()
            .collect(),
            violations,
        }
    }

    /// Returns the check and the transparent fraction (1.0 with no decisions).
    fn check_transparency(&self, now: DateTime<FixedOffset>) -> (CheckResult, f64) {
        let recent = latest_within(
            self.store.read_decisions(),
            |d| d.timestamp,
            self.window_start(now),
            self.policy.windows.transparency_sample,
        );

        let mut violations = Vec::new();
        for decision in &recent {
            let missing = decision.missing_transparency_fields();
            if !missing.is_empty() {
                violations.push(Violation::new(
                    ViolationKind::TransparencyViolation,
                    json!({
                        "decision_id": decision.id,
                        "type": decision.scenario,
                        "missing": missing,
                    }),
                    now,
                ));
            }
        }

        let checked = recent.len();
        let transparent = checked - violations.len();
        let rate = if checked == 0 {
            1.0
        } else {
            transparent as f64 / checked as f64
        };

        let check = CheckResult {
            passed: rate >= self.policy.thresholds.transparency_rate,
            metrics: [
                ("decisions_checked".to_string(), json!(checked)),
                ("transparent".to_string(), json!(transparent)),
                ("transparency_rate".to_string(), json!(rate)),
            ]
            .into_iter()
            .collect(),
            violations,
        };
        (check, rate)
    }

    fn check_safety(&self, now: DateTime<FixedOffset>) -> CheckResult {
        let recent = latest_within(
            self.store.read_safety_actions(),
            |a| a.timestamp,
            self.window_start(now),
            self.policy.windows.safety_sample,
        );

        let violations: Vec<Violation> = recent
            .iter()
            .filter(|a| a.is_unapproved())
            .map(|a| {
                Violation::new(
                    ViolationKind::UnapprovedSafetyAction,
                    serde_json::to_value(a).unwrap_or(JsonValue::Null),
                    now,
                )
            })
            .collect();

        CheckResult {
            passed: violations.is_empty(),
            metrics: [
                ("actions_checked".to_string(), json!(recent.len())),
                ("unapproved".to_string(), json!(violations.len())),
            ]
            .into_iter()
            .collect(),
            violations,
        }
    }

    /// Summarize the most recent snapshots of the last look-back window and
    /// persist the report under today's date.
    ///
    /// Returns `None` when the window holds no snapshots.
    pub fn generate_daily_report(&self) -> Option<DailyReport> {
        let now = self.clock.now();
        let snapshots = latest_within(
            self.store.read_snapshots(),
            |s| s.timestamp,
            self.window_start(now),
            self.policy.windows.report_snapshots,
        );

        let Some(report) = build_daily_report(&snapshots, &self.policy, now) else {
            tracing::info!("No compliance snapshots in window, skipping daily report");
            return None;
        };

        match self.store.write_report(&report) {
            Ok(path) => tracing::info!(path = %path.display(), "Daily report written"),
            Err(e) => tracing::warn!(error = %e, "Daily report not recorded"),
        }

        Some(report)
    }

    pub fn latest_snapshot(&self) -> Option<ComplianceSnapshot> {
        self.store.compliance().tail(1).pop()
    }

    pub fn recent_alerts(&self, n: usize) -> Vec<Alert> {
        self.store.alerts().tail(n)
    }

    pub fn recent_violations(&self, n: usize) -> Vec<Violation> {
        self.store.violations().tail(n)
    }

    pub fn load_report(&self, date: NaiveDate) -> Option<DailyReport> {
        self.store.read_report(date)
    }

    /// Start of the look-back window; saturates at the earliest representable
    /// time rather than overflowing.
    fn window_start(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        Duration::try_hours(self.policy.windows.lookback_hours)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.fixed_offset())
    }
}

/// Scores live in `[0, 1]`. A non-finite score cannot be stored and is
/// dropped; out-of-range scores are clamped.
fn normalize_score(scenario: &str, score: f64) -> Option<f64> {
    if !score.is_finite() {
        tracing::warn!(scenario, score, "Dropping non-finite decision score");
        return None;
    }
    if !(0.0..=1.0).contains(&score) {
        tracing::warn!(scenario, score, "Decision score outside [0, 1], clamping");
    }
    Some(score.clamp(0.0, 1.0))
}

/// The last `limit` records stamped at or after `since`, oldest first.
fn latest_within<T>(
    records: Vec<T>,
    timestamp: impl Fn(&T) -> DateTime<FixedOffset>,
    since: DateTime<FixedOffset>,
    limit: usize,
) -> Vec<T> {
    let mut recent: Vec<T> = records
        .into_iter()
        .filter(|r| timestamp(r) >= since)
        .collect();
    let skip = recent.len().saturating_sub(limit);
    recent.drain(..skip);
    recent
}

/// `<timestamp>-<content hash>`; the sequence number and process id keep ids
/// unique when identical drafts land in the same instant.
fn decision_id(draft: &DecisionDraft, now: DateTime<FixedOffset>, sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(draft.scenario.as_bytes());
    hasher.update(draft.chosen.as_bytes());
    hasher.update(draft.reasoning.as_bytes());
    for option in &draft.options {
        hasher.update(option.as_bytes());
    }
    hasher.update(now.to_rfc3339().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}", now.format("%Y%m%dT%H%M%S%.3f"), &digest[..12])
}
