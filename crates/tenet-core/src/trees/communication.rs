//! Communication tree
//!
//! **Question**: Is this worth interrupting the human for, and if so, now?
//!
//! ## Branches (first match wins)
//!
//! | # | Condition | Choice |
//! |---|-----------|--------|
//! | 1 | time-sensitive with a horizon under 24h | Notify immediately |
//! | 2 | human is in focus time | Wait for next heartbeat |
//! | 3 | value score exceeds communication cost | Notify immediately |
//! | 4 | otherwise | Batch with next update |
//!
//! A quiet-hours override then downgrades a non-critical "Notify
//! immediately" to "Wait for next heartbeat" between 22:00 and 08:00.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::is_quiet_hour;
use crate::confidence::communication_confidence;
use crate::types::ScenarioType;

use super::{EvalContext, Verdict};

pub const NOTIFY_IMMEDIATELY: &str = "Notify immediately";
pub const WAIT_FOR_HEARTBEAT: &str = "Wait for next heartbeat";
pub const BATCH_WITH_UPDATE: &str = "Batch with next update";

const OPTIONS: [&str; 3] = [NOTIFY_IMMEDIATELY, WAIT_FOR_HEARTBEAT, BATCH_WITH_UPDATE];

const BASE_COST: f64 = 5.0;
const URGENT_HORIZON_HOURS: f64 = 24.0;

/// The information the agent is considering passing on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Information {
    /// `None` when the collaborator did not state urgency at all
    pub time_sensitive: Option<bool>,
    pub time_horizon_hours: f64,
    pub value_score: f64,
    pub critical: bool,
}

impl Default for Information {
    fn default() -> Self {
        Self {
            time_sensitive: None,
            time_horizon_hours: URGENT_HORIZON_HOURS,
            value_score: 5.0,
            critical: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CommunicationContext {
    pub in_focus_time: bool,
    pub recent_messages_count: u32,
    pub human_busy: bool,
    pub has_recent_interaction: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CommunicationInputs {
    pub information: Information,
    pub context: CommunicationContext,
}

/// Cost of interrupting the human right now, on a 1-10 scale.
pub fn communication_cost(hour: u32, recent_messages_count: u32, human_busy: bool) -> f64 {
    let mut cost = BASE_COST;

    if is_quiet_hour(hour) {
        cost += 3.0;
    } else if (9..=17).contains(&hour) {
        cost -= 1.0;
    }

    if recent_messages_count > 10 {
        cost += (f64::from(recent_messages_count) / 10.0).min(3.0);
    }

    if human_busy {
        cost += 2.0;
    }

    cost.clamp(1.0, 10.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommunicationTree;

impl CommunicationTree {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, inputs: &CommunicationInputs, ctx: &EvalContext<'_>) -> Verdict {
        let info = &inputs.information;
        let context = &inputs.context;
        let hour = ctx.hour();
        let mut cost = None;

        let (mut chosen, mut reasoning) = if info.time_sensitive == Some(true)
            && info.time_horizon_hours < URGENT_HORIZON_HOURS
        {
            (
                NOTIFY_IMMEDIATELY,
                format!(
                    "Time-sensitive information with a {}h horizon.",
                    info.time_horizon_hours
                ),
            )
        } else if context.in_focus_time {
            (
                WAIT_FOR_HEARTBEAT,
                "Human is in focus time; holding until the next heartbeat.".to_string(),
            )
        } else {
            let computed = communication_cost(hour, context.recent_messages_count, context.human_busy);
            cost = Some(computed);
            if info.value_score > computed {
                (
                    NOTIFY_IMMEDIATELY,
                    format!(
                        "Value {:.1} outweighs communication cost {:.1}.",
                        info.value_score, computed
                    ),
                )
            } else {
                (
                    BATCH_WITH_UPDATE,
                    format!(
                        "Value {:.1} does not outweigh communication cost {:.1}; batching.",
                        info.value_score, computed
                    ),
                )
            }
        };

        let quiet_override = is_quiet_hour(hour) && chosen == NOTIFY_IMMEDIATELY && !info.critical;
        if quiet_override {
            chosen = WAIT_FOR_HEARTBEAT;
            reasoning.push_str(" Quiet hours in effect and the information is not critical; deferred to the next heartbeat.");
        }

        let confidence = communication_confidence(
            context.has_recent_interaction,
            info.time_sensitive.is_some(),
            hour,
        );

        let mut verdict = Verdict::new(ScenarioType::Communication, &OPTIONS, chosen, reasoning, confidence)
            .with_detail("quiet_hours_override", json!(quiet_override));
        if let Some(cost) = cost {
            verdict = verdict.with_detail("communication_cost", json!(cost));
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::policy::Policy;

    fn evaluate_at(hour: u32, inputs: &CommunicationInputs) -> Verdict {
        let policy = Policy::default();
        let clock = FixedClock::at_hour(hour).unwrap();
        CommunicationTree::new().evaluate(inputs, &EvalContext::new(clock.now(), &policy))
    }

    fn urgent(critical: bool) -> CommunicationInputs {
        CommunicationInputs {
            information: Information {
                time_sensitive: Some(true),
                time_horizon_hours: 12.0,
                critical,
                ..Information::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_time_sensitive_notifies_during_day() {
        let verdict = evaluate_at(14, &urgent(false));
        assert_eq!(verdict.chosen, NOTIFY_IMMEDIATELY);
        assert_eq!(verdict.details["quiet_hours_override"], json!(false));
    }

    #[test]
    fn test_quiet_hours_override_defers_non_critical() {
        let verdict = evaluate_at(23, &urgent(false));
        assert_eq!(verdict.chosen, WAIT_FOR_HEARTBEAT);
        assert_eq!(verdict.details["quiet_hours_override"], json!(true));
    }

    #[test]
    fn test_quiet_hours_do_not_defer_critical() {
        assert_eq!(evaluate_at(3, &urgent(true)).chosen, NOTIFY_IMMEDIATELY);
    }

    #[test]
    fn test_focus_time_waits() {
        let inputs = CommunicationInputs {
            information: Information {
                value_score: 10.0,
                ..Information::default()
            },
            context: CommunicationContext {
                in_focus_time: true,
                ..Default::default()
            },
        };
        assert_eq!(evaluate_at(11, &inputs).chosen, WAIT_FOR_HEARTBEAT);
    }

    #[test]
    fn test_value_against_cost() {
        let mut inputs = CommunicationInputs::default();
        inputs.information.value_score = 4.5;
        // Working hours: cost 4.0
        assert_eq!(evaluate_at(10, &inputs).chosen, NOTIFY_IMMEDIATELY);

        inputs.context.human_busy = true;
        // Busy: cost 6.0
        let verdict = evaluate_at(10, &inputs);
        assert_eq!(verdict.chosen, BATCH_WITH_UPDATE);
        assert_eq!(verdict.details["communication_cost"], json!(6.0));
    }

    #[test]
    fn test_communication_cost_components() {
        assert_eq!(communication_cost(12, 0, false), 4.0);
        assert_eq!(communication_cost(18, 0, false), 5.0);
        assert_eq!(communication_cost(23, 0, false), 8.0);
        assert_eq!(communication_cost(12, 15, false), 5.5);
        assert_eq!(communication_cost(12, 10, false), 4.0);
        assert_eq!(communication_cost(23, 90, true), 10.0);
    }

    #[test]
    fn test_explicit_urgency_raises_confidence() {
        let mut inputs = CommunicationInputs::default();
        assert_eq!(evaluate_at(12, &inputs).score, 0.7);

        inputs.information.time_sensitive = Some(false);
        inputs.context.has_recent_interaction = true;
        assert_eq!(evaluate_at(12, &inputs).score, 0.9);
        assert_eq!(evaluate_at(8, &inputs).score, 0.8);
    }
}
