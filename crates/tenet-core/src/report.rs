//! Daily compliance report.
//!
//! Aggregates a window of compliance snapshots into averages, violation
//! counts, and recommendations:
//! 1. Any snapshot below the alert threshold → high-priority review of protocol adherence
//! 2. Any violation type recurring at least `windows.recurring_violation` times → medium-priority note naming it

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::policy::Policy;
use crate::types::{ComplianceSnapshot, DailyReport, Priority, Recommendation};

/// Build a report from `snapshots`. Returns `None` when there are none.
pub fn build_daily_report(
    snapshots: &[ComplianceSnapshot],
    policy: &Policy,
    now: DateTime<FixedOffset>,
) -> Option<DailyReport> {
    if snapshots.is_empty() {
        return None;
    }

    let count = snapshots.len();
    let average = snapshots.iter().map(|s| s.compliance_score).sum::<f64>() / count as f64;

    let mut violation_counts: BTreeMap<String, usize> = BTreeMap::new();
    for violation in snapshots.iter().flat_map(|s| s.checks.violations()) {
        *violation_counts
            .entry(violation.kind.as_str().to_string())
            .or_default() += 1;
    }
    let total_violations = violation_counts.values().sum();

    let quiet_hours_checks = snapshots.iter().filter(|s| s.quiet_hours).count();

    Some(DailyReport {
        date: now.date_naive(),
        generated_at: now,
        snapshot_count: count,
        average_score: round4(average),
        total_violations,
        quiet_hours_checks,
        recommendations: recommendations(snapshots, &violation_counts, policy),
        violation_counts,
    })
}

fn recommendations(
    snapshots: &[ComplianceSnapshot],
    violation_counts: &BTreeMap<String, usize>,
    policy: &Policy,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let threshold = policy.thresholds.alert_score;

    let low: Vec<f64> = snapshots
        .iter()
        .map(|s| s.compliance_score)
        .filter(|score| *score < threshold)
        .collect();
    if !low.is_empty() {
        let lowest = low.iter().cloned().fold(f64::INFINITY, f64::min);
        recommendations.push(Recommendation {
            priority: Priority::High,
            message: format!(
                "Review protocol adherence: {} of {} checks scored below {:.2} (lowest {:.2}).",
                low.len(),
                snapshots.len(),
                threshold,
                lowest
            ),
            violation_type: None,
        });
    }

    for (kind, count) in violation_counts {
        if *count >= policy.windows.recurring_violation {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                message: format!(
                    "Recurring {} ({} occurrences); address the underlying cause.",
                    kind, count
                ),
                violation_type: Some(kind.clone()),
            });
        }
    }

    recommendations
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckResult, ComplianceChecks, Violation, ViolationKind};
    use chrono::Duration;
    use serde_json::json;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-03-02T23:00:00+00:00").unwrap()
    }

    fn snapshot(score: f64, quiet: bool, transparency_violations: usize) -> ComplianceSnapshot {
        let violations = (0..transparency_violations)
            .map(|_| Violation::new(ViolationKind::TransparencyViolation, json!({}), now()))
            .collect();
        ComplianceSnapshot {
            timestamp: now() - Duration::hours(1),
            compliance_score: score,
            checks: ComplianceChecks {
                transparency: CheckResult {
                    passed: transparency_violations == 0,
                    violations,
                    metrics: BTreeMap::new(),
                },
                ..Default::default()
            },
            quiet_hours: quiet,
        }
    }

    #[test]
    fn test_empty_window_yields_none() {
        assert!(build_daily_report(&[], &Policy::default(), now()).is_none());
    }

    #[test]
    fn test_healthy_day_has_no_recommendations() {
        let snapshots = vec![snapshot(1.0, false, 0), snapshot(0.9, true, 0)];
        let report = build_daily_report(&snapshots, &Policy::default(), now()).unwrap();

        assert_eq!(report.snapshot_count, 2);
        assert_eq!(report.average_score, 0.95);
        assert_eq!(report.quiet_hours_checks, 1);
        assert_eq!(report.total_violations, 0);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.date.to_string(), "2026-03-02");
    }

    #[test]
    fn test_low_scores_and_recurring_violations_recommend() {
        let snapshots = vec![
            snapshot(0.7, false, 2),
            snapshot(0.95, false, 1),
            snapshot(1.0, false, 0),
        ];
        let report = build_daily_report(&snapshots, &Policy::default(), now()).unwrap();

        assert_eq!(report.total_violations, 3);
        assert_eq!(report.violation_counts["transparency_violation"], 3);
        assert_eq!(report.recommendations.len(), 2);
        assert_eq!(report.recommendations[0].priority, Priority::High);
        assert_eq!(report.recommendations[1].priority, Priority::Medium);
        assert_eq!(
            report.recommendations[1].violation_type.as_deref(),
            Some("transparency_violation")
        );
    }

    #[test]
    fn test_two_occurrences_are_not_recurring() {
        let snapshots = vec![snapshot(0.9, false, 2)];
        let report = build_daily_report(&snapshots, &Policy::default(), now()).unwrap();
        assert!(report.recommendations.is_empty());
    }
}
