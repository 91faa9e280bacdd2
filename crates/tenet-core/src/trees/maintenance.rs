//! Maintenance vs. Feature tree
//!
//! **Question**: Should the next block of work fix an existing issue or ship
//! something new?
//!
//! ## Branches (first match wins)
//!
//! | # | Condition | Choice |
//! |---|-----------|--------|
//! | 1 | maintenance issue threatens stability | Fix maintenance issue |
//! | 2 | only the feature has a deadline | Build new feature |
//! | 3 | otherwise, higher `impact * urgency / effort` | whichever wins (ties to maintenance) |

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::confidence::maintenance_confidence;
use crate::types::ScenarioType;

use super::{EvalContext, Verdict};

pub const FIX_MAINTENANCE: &str = "Fix maintenance issue";
pub const BUILD_NEW_FEATURE: &str = "Build new feature";

const OPTIONS: [&str; 2] = [FIX_MAINTENANCE, BUILD_NEW_FEATURE];

/// One side of the trade-off. Scores are on a 1-10 scale, defaulting to 5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkItem {
    pub stability_risk: bool,
    pub has_deadline: bool,
    pub impact: f64,
    pub effort: f64,
    pub urgency: f64,
    pub has_data: bool,
}

impl Default for WorkItem {
    fn default() -> Self {
        Self {
            stability_risk: false,
            has_deadline: false,
            impact: 5.0,
            effort: 5.0,
            urgency: 5.0,
            has_data: false,
        }
    }
}

impl WorkItem {
    /// Return on investment: `impact * urgency / max(effort, 1)`.
    pub fn roi(&self) -> f64 {
        (self.impact * self.urgency) / self.effort.max(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MaintenanceContext {
    pub has_precedent: bool,
    pub known_preference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MaintenanceVsFeatureInputs {
    pub maintenance_issue: WorkItem,
    pub new_feature: WorkItem,
    pub context: MaintenanceContext,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceVsFeatureTree;

impl MaintenanceVsFeatureTree {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, inputs: &MaintenanceVsFeatureInputs, _ctx: &EvalContext<'_>) -> Verdict {
        let maintenance = &inputs.maintenance_issue;
        let feature = &inputs.new_feature;
        let confidence = maintenance_confidence(maintenance.has_data, feature.has_data);

        let (chosen, branch, mut reasoning) = if maintenance.stability_risk {
            (
                FIX_MAINTENANCE,
                "stability_risk",
                "Maintenance issue poses a stability risk; stability comes before new work."
                    .to_string(),
            )
        } else if feature.has_deadline && !maintenance.has_deadline {
            (
                BUILD_NEW_FEATURE,
                "feature_deadline",
                "New feature has a deadline and the maintenance issue does not.".to_string(),
            )
        } else {
            let maintenance_roi = maintenance.roi();
            let feature_roi = feature.roi();
            if maintenance_roi >= feature_roi {
                (
                    FIX_MAINTENANCE,
                    "roi",
                    format!(
                        "Maintenance ROI {:.2} is at least feature ROI {:.2}.",
                        maintenance_roi, feature_roi
                    ),
                )
            } else {
                (
                    BUILD_NEW_FEATURE,
                    "roi",
                    format!(
                        "Feature ROI {:.2} exceeds maintenance ROI {:.2}.",
                        feature_roi, maintenance_roi
                    ),
                )
            }
        };

        if inputs.context.has_precedent {
            reasoning.push_str(" A precedent exists for this trade-off.");
        }
        if let Some(preference) = &inputs.context.known_preference {
            reasoning.push_str(&format!(" Known preference: {}.", preference));
        }

        Verdict::new(
            ScenarioType::MaintenanceVsFeature,
            &OPTIONS,
            chosen,
            reasoning,
            confidence,
        )
        .with_detail("branch", json!(branch))
        .with_detail("maintenance_roi", json!(maintenance.roi()))
        .with_detail("feature_roi", json!(feature.roi()))
    }
}
