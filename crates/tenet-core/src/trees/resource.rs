//! Resource Allocation tree
//!
//! **Question**: How should scarce capacity be split across pending tasks?
//!
//! ## Strategies (first match wins)
//!
//! | # | Condition | Strategy |
//! |---|-----------|----------|
//! | 1 | any resource above the usage trigger (80%) | conservative: remaining capacity split equally over essential tasks |
//! | 2 | more than one task | scored: shares proportional to `priorityScore` |
//! | 3 | otherwise | direct: the single task gets everything |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::confidence::allocation_confidence;
use crate::types::ScenarioType;

use super::{EvalContext, Verdict};

const CONSERVATIVE_OPTION: &str = "Conservative allocation (essential tasks only)";
const SCORED_OPTION: &str = "Scored allocation (proportional to priority)";
const DIRECT_OPTION: &str = "Direct allocation (single task)";

const OPTIONS: [&str; 3] = [CONSERVATIVE_OPTION, SCORED_OPTION, DIRECT_OPTION];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskRequest {
    pub id: String,
    pub essential: bool,
    pub priority_score: Option<f64>,
}

/// Current resource usage.
///
/// Any key holding an object with a numeric `usagePercent` counts as a
/// resource, e.g. `{"cpu": {"usagePercent": 85}, "remainingPercent": 40}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    #[serde(default = "full_capacity")]
    pub remaining_percent: f64,

    #[serde(flatten)]
    pub resources: BTreeMap<String, JsonValue>,
}

fn full_capacity() -> f64 {
    100.0
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        Self {
            remaining_percent: full_capacity(),
            resources: BTreeMap::new(),
        }
    }
}

impl ResourceSnapshot {
    /// `(resource, usagePercent)` for every well-formed resource entry.
    pub fn usage(&self) -> impl Iterator<Item = (&str, f64)> {
        self.resources.iter().filter_map(|(name, value)| {
            value
                .get("usagePercent")
                .and_then(JsonValue::as_f64)
                .map(|usage| (name.as_str(), usage))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceAllocationInputs {
    pub tasks: Vec<TaskRequest>,
    pub resources: ResourceSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStrategy {
    Conservative,
    Scored,
    Direct,
}

impl AllocationStrategy {
    fn option(&self) -> &'static str {
        match self {
            AllocationStrategy::Conservative => CONSERVATIVE_OPTION,
            AllocationStrategy::Scored => SCORED_OPTION,
            AllocationStrategy::Direct => DIRECT_OPTION,
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllocationStrategy::Conservative => "conservative",
            AllocationStrategy::Scored => "scored",
            AllocationStrategy::Direct => "direct",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAllocation {
    pub task_id: String,
    pub share_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationPlan {
    pub strategy: AllocationStrategy,
    pub allocations: Vec<TaskAllocation>,
}

impl AllocationPlan {
    pub fn share_of(&self, task_id: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.task_id == task_id)
            .map(|a| a.share_percent)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceAllocationTree;

impl ResourceAllocationTree {
    pub fn new() -> Self {
        Self
    }

    /// Work out the allocation without recording anything.
    pub fn plan(&self, inputs: &ResourceAllocationInputs, ctx: &EvalContext<'_>) -> AllocationPlan {
        let trigger = ctx.policy.thresholds.resource_usage_percent;
        let tasks = &inputs.tasks;

        if inputs.resources.usage().any(|(_, usage)| usage > trigger) {
            let essential: Vec<&TaskRequest> = tasks.iter().filter(|t| t.essential).collect();
            let share = if essential.is_empty() {
                0.0
            } else {
                inputs.resources.remaining_percent / essential.len() as f64
            };
            return AllocationPlan {
                strategy: AllocationStrategy::Conservative,
                allocations: essential
                    .into_iter()
                    .map(|t| allocation(t, share))
                    .collect(),
            };
        }

        if tasks.len() > 1 {
            let total: f64 = tasks.iter().map(priority).sum();
            let allocations = tasks
                .iter()
                .map(|t| {
                    let share = if total > 0.0 {
                        priority(t) / total * 100.0
                    } else {
                        100.0 / tasks.len() as f64
                    };
                    allocation(t, share)
                })
                .collect();
            return AllocationPlan {
                strategy: AllocationStrategy::Scored,
                allocations,
            };
        }

        AllocationPlan {
            strategy: AllocationStrategy::Direct,
            allocations: tasks.iter().map(|t| allocation(t, 100.0)).collect(),
        }
    }

    pub fn evaluate(&self, inputs: &ResourceAllocationInputs, ctx: &EvalContext<'_>) -> Verdict {
        let plan = self.plan(inputs, ctx);
        let trigger = ctx.policy.thresholds.resource_usage_percent;

        let reasoning = match plan.strategy {
            AllocationStrategy::Conservative => {
                let hot: Vec<String> = inputs
                    .resources
                    .usage()
                    .filter(|(_, usage)| *usage > trigger)
                    .map(|(name, usage)| format!("{} at {}%", name, usage))
                    .collect();
                if plan.allocations.is_empty() {
                    format!(
                        "Resource pressure ({}); no essential tasks, so nothing is allocated.",
                        hot.join(", ")
                    )
                } else {
                    format!(
                        "Resource pressure ({}); splitting the remaining {}% across {} essential task(s).",
                        hot.join(", "),
                        inputs.resources.remaining_percent,
                        plan.allocations.len()
                    )
                }
            }
            AllocationStrategy::Scored => format!(
                "{} tasks competing; shares proportional to priority score.",
                inputs.tasks.len()
            ),
            AllocationStrategy::Direct => match inputs.tasks.first() {
                Some(task) => format!("Single task '{}' receives full allocation.", task.id),
                None => "No tasks pending; nothing to allocate.".to_string(),
            },
        };

        let every_task_scored = inputs.tasks.iter().all(|t| t.priority_score.is_some());
        let confidence = allocation_confidence(inputs.tasks.len(), every_task_scored);

        Verdict::new(
            ScenarioType::ResourceAllocation,
            &OPTIONS,
            plan.strategy.option(),
            reasoning,
            confidence,
        )
        .with_detail("strategy", json!(plan.strategy))
        .with_detail("allocations", json!(plan.allocations))
    }
}

fn priority(task: &TaskRequest) -> f64 {
    task.priority_score.unwrap_or(0.0).max(0.0)
}

fn allocation(task: &TaskRequest, share_percent: f64) -> TaskAllocation {
    TaskAllocation {
        task_id: task.id.clone(),
        share_percent,
    }
}
