//! Error Handling tree
//!
//! **Question**: How loudly should this error be surfaced?
//!
//! Branches run from most to least severe; an error matching nothing is
//! logged for review.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::confidence::error_confidence;
use crate::types::ScenarioType;

use super::{EvalContext, Verdict};

pub const ALERT_AND_STOP: &str = "Immediate alert + stop";
pub const AUTO_FIX_AND_DOCUMENT: &str = "Auto-fix + document";
pub const NOTIFY_WITH_ALTERNATIVES: &str = "Notify + offer alternatives";
pub const LOG_FOR_REVIEW: &str = "Log for review";

const OPTIONS: [&str; 4] = [
    ALERT_AND_STOP,
    AUTO_FIX_AND_DOCUMENT,
    NOTIFY_WITH_ALTERNATIVES,
    LOG_FOR_REVIEW,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub safety_critical: bool,
    pub can_auto_fix: bool,
    pub auto_fix_confidence: f64,
    pub affects_outputs: bool,
    pub is_known_issue: bool,
    pub has_known_solution: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorContext {
    pub similar_errors_handled: u32,
    pub system_unstable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorHandlingInputs {
    pub error: ErrorDescriptor,
    pub context: ErrorContext,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandlingTree;

impl ErrorHandlingTree {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, inputs: &ErrorHandlingInputs, ctx: &EvalContext<'_>) -> Verdict {
        let error = &inputs.error;
        let threshold = ctx.policy.thresholds.auto_fix_confidence;

        let (chosen, branch, reasoning) = if error.safety_critical {
            (
                ALERT_AND_STOP,
                "safety_critical",
                "Error is safety-critical; halting and alerting a human.".to_string(),
            )
        } else if error.can_auto_fix && error.auto_fix_confidence > threshold {
            (
                AUTO_FIX_AND_DOCUMENT,
                "auto_fix",
                format!(
                    "Auto-fix available with confidence {:.2} above {:.2}.",
                    error.auto_fix_confidence, threshold
                ),
            )
        } else if error.affects_outputs {
            (
                NOTIFY_WITH_ALTERNATIVES,
                "affects_outputs",
                "Error affects outputs the human relies on; notifying with alternatives."
                    .to_string(),
            )
        } else if error.is_known_issue {
            (
                LOG_FOR_REVIEW,
                "known_issue",
                "Known issue without output impact; logging for review.".to_string(),
            )
        } else {
            (
                LOG_FOR_REVIEW,
                "default",
                "No escalation criteria met; logging for review.".to_string(),
            )
        };

        let confidence = error_confidence(
            error.has_known_solution,
            inputs.context.similar_errors_handled,
            inputs.context.system_unstable,
        );

        Verdict::new(ScenarioType::ErrorHandling, &OPTIONS, chosen, reasoning, confidence)
            .with_detail("branch", json!(branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use chrono::DateTime;

    fn evaluate(error: ErrorDescriptor, context: ErrorContext) -> Verdict {
        let policy = Policy::default();
        let now = DateTime::parse_from_rfc3339("2026-03-02T10:00:00+00:00").unwrap();
        ErrorHandlingTree::new().evaluate(
            &ErrorHandlingInputs { error, context },
            &EvalContext::new(now, &policy),
        )
    }

    #[test]
    fn test_safety_critical_stops() {
        let verdict = evaluate(
            ErrorDescriptor {
                safety_critical: true,
                can_auto_fix: true,
                auto_fix_confidence: 0.99,
                ..Default::default()
            },
            ErrorContext::default(),
        );
        assert_eq!(verdict.chosen, ALERT_AND_STOP);
    }

    #[test]
    fn test_auto_fix_requires_confidence_above_threshold() {
        let confident = ErrorDescriptor {
            can_auto_fix: true,
            auto_fix_confidence: 0.85,
            ..Default::default()
        };
        assert_eq!(evaluate(confident, ErrorContext::default()).chosen, AUTO_FIX_AND_DOCUMENT);

        let borderline = ErrorDescriptor {
            can_auto_fix: true,
            auto_fix_confidence: 0.8,
            affects_outputs: true,
            ..Default::default()
        };
        assert_eq!(
            evaluate(borderline, ErrorContext::default()).chosen,
            NOTIFY_WITH_ALTERNATIVES
        );
    }

    #[test]
    fn test_known_issue_and_default_both_log() {
        let known = evaluate(
            ErrorDescriptor {
                is_known_issue: true,
                ..Default::default()
            },
            ErrorContext::default(),
        );
        assert_eq!(known.chosen, LOG_FOR_REVIEW);
        assert_eq!(known.details["branch"], json!("known_issue"));

        let unknown = evaluate(ErrorDescriptor::default(), ErrorContext::default());
        assert_eq!(unknown.chosen, LOG_FOR_REVIEW);
        assert_eq!(unknown.details["branch"], json!("default"));
    }

    #[test]
    fn test_confidence_adjustments() {
        let verdict = evaluate(
            ErrorDescriptor {
                has_known_solution: true,
                ..Default::default()
            },
            ErrorContext {
                similar_errors_handled: 2,
                system_unstable: true,
            },
        );
        assert_eq!(verdict.score, 0.8);
    }
}
