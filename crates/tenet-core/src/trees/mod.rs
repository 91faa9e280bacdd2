//! Decision trees.
//!
//! Each tree is a fixed, first-match-wins branch list for one category of
//! dilemma. Trees are total: every input, including a missing or malformed
//! one, ends in a concrete choice.
//!
//! | Tree | Options |
//! |------|---------|
//! | [`MaintenanceVsFeatureTree`] | Fix maintenance issue / Build new feature |
//! | [`CommunicationTree`] | Notify immediately / Wait for next heartbeat / Batch with next update |
//! | [`ErrorHandlingTree`] | Immediate alert + stop / Auto-fix + document / Notify + offer alternatives / Log for review |
//! | [`ResourceAllocationTree`] | conservative / scored / direct strategies |

mod communication;
mod error_handling;
mod maintenance;
mod resource;

pub use communication::{
    communication_cost, CommunicationContext, CommunicationInputs, CommunicationTree,
    Information, BATCH_WITH_UPDATE, NOTIFY_IMMEDIATELY, WAIT_FOR_HEARTBEAT,
};
pub use error_handling::{
    ErrorContext, ErrorDescriptor, ErrorHandlingInputs, ErrorHandlingTree, ALERT_AND_STOP,
    AUTO_FIX_AND_DOCUMENT, LOG_FOR_REVIEW, NOTIFY_WITH_ALTERNATIVES,
};
pub use maintenance::{
    MaintenanceContext, MaintenanceVsFeatureInputs, MaintenanceVsFeatureTree, WorkItem,
    BUILD_NEW_FEATURE, FIX_MAINTENANCE,
};
pub use resource::{
    AllocationPlan, AllocationStrategy, ResourceAllocationInputs, ResourceAllocationTree,
    ResourceSnapshot, TaskAllocation, TaskRequest,
};

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Timelike};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::policy::Policy;
use crate::types::{DecisionDraft, ScenarioType};

/// What a tree sees besides its own inputs.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub now: DateTime<FixedOffset>,
    pub policy: &'a Policy,
}

impl<'a> EvalContext<'a> {
    pub fn new(now: DateTime<FixedOffset>, policy: &'a Policy) -> Self {
        Self { now, policy }
    }

    pub fn hour(&self) -> u32 {
        self.now.hour()
    }
}

/// A tree's choice, before it is written to the decision log.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub scenario: ScenarioType,
    pub options: Vec<String>,
    pub chosen: String,
    pub reasoning: String,
    pub score: f64,
    pub details: BTreeMap<String, JsonValue>,
}

impl Verdict {
    pub(crate) fn new(
        scenario: ScenarioType,
        options: &[&str],
        chosen: &str,
        reasoning: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            scenario,
            options: options.iter().map(|o| o.to_string()).collect(),
            chosen: chosen.to_string(),
            reasoning: reasoning.into(),
            score,
            details: BTreeMap::new(),
        }
    }

    pub(crate) fn with_detail(mut self, key: &str, value: JsonValue) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    pub fn into_draft(self) -> DecisionDraft {
        DecisionDraft::new(self.scenario.as_str(), self.options, self.chosen, self.reasoning)
            .with_score(self.score)
            .with_details(self.details)
    }
}

/// Typed inputs for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioInput {
    MaintenanceVsFeature(MaintenanceVsFeatureInputs),
    Communication(CommunicationInputs),
    ErrorHandling(ErrorHandlingInputs),
    ResourceAllocation(ResourceAllocationInputs),
}

impl ScenarioInput {
    pub fn scenario_type(&self) -> ScenarioType {
        match self {
            ScenarioInput::MaintenanceVsFeature(_) => ScenarioType::MaintenanceVsFeature,
            ScenarioInput::Communication(_) => ScenarioType::Communication,
            ScenarioInput::ErrorHandling(_) => ScenarioType::ErrorHandling,
            ScenarioInput::ResourceAllocation(_) => ScenarioType::ResourceAllocation,
        }
    }

    /// Parse collaborator JSON for `scenario`.
    ///
    /// Missing or malformed fields take their documented defaults; the
    /// well-formed rest of the document is kept. A document that is not a
    /// JSON object is replaced by the scenario's default inputs.
    pub fn parse(scenario: ScenarioType, inputs: &JsonValue) -> Self {
        match scenario {
            ScenarioType::MaintenanceVsFeature => {
                ScenarioInput::MaintenanceVsFeature(parse_or_default(scenario, inputs))
            }
            ScenarioType::Communication => {
                ScenarioInput::Communication(parse_or_default(scenario, inputs))
            }
            ScenarioType::ErrorHandling => {
                ScenarioInput::ErrorHandling(parse_or_default(scenario, inputs))
            }
            ScenarioType::ResourceAllocation => {
                ScenarioInput::ResourceAllocation(parse_or_default(scenario, inputs))
            }
        }
    }
}

/// Overlay `inputs` onto the scenario's default inputs one field at a time.
///
/// A field that would make the document unparseable is dropped and keeps its
/// default; every well-formed sibling survives. Array elements are kept or
/// dropped individually.
fn parse_or_default<T>(scenario: ScenarioType, inputs: &JsonValue) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    let fields = match inputs {
        JsonValue::Null => return T::default(),
        JsonValue::Object(fields) => fields,
        _ => {
            tracing::warn!(scenario = %scenario, "Decision inputs are not an object, using defaults");
            return T::default();
        }
    };

    let mut doc = match serde_json::to_value(T::default()) {
        Ok(doc) => doc,
        Err(_) => return T::default(),
    };
    let accepts = |doc: &JsonValue| T::deserialize(doc).is_ok();
    let mut rejected = Vec::new();
    overlay(&mut doc, "", fields, &accepts, &mut rejected);

    if !rejected.is_empty() {
        tracing::warn!(
            scenario = %scenario,
            fields = ?rejected,
            "Malformed decision input fields, using their defaults"
        );
    }

    T::deserialize(&doc).unwrap_or_default()
}

fn overlay(
    doc: &mut JsonValue,
    parent: &str,
    fields: &Map<String, JsonValue>,
    accepts: &dyn Fn(&JsonValue) -> bool,
    rejected: &mut Vec<String>,
) {
    for (key, value) in fields {
        let pointer = format!("{}/{}", parent, key.replace('~', "~0").replace('/', "~1"));
        match value {
            JsonValue::Object(nested) if doc.pointer(&pointer).is_some_and(JsonValue::is_object) => {
                overlay(doc, &pointer, nested, accepts, rejected);
            }
            JsonValue::Array(items) => {
                if try_insert(doc, parent, key, value.clone(), accepts) {
                    continue;
                }
                if !try_insert(doc, parent, key, JsonValue::Array(Vec::new()), accepts) {
                    rejected.push(pointer);
                    continue;
                }
                for (index, item) in items.iter().enumerate() {
                    if !try_push(doc, &pointer, item.clone(), accepts) {
                        rejected.push(format!("{}/{}", pointer, index));
                    }
                }
            }
            _ => {
                if !try_insert(doc, parent, key, value.clone(), accepts) {
                    rejected.push(pointer);
                }
            }
        }
    }
}

/// Set `parent[key] = value`, reverting if the document no longer parses.
fn try_insert(
    doc: &mut JsonValue,
    parent: &str,
    key: &str,
    value: JsonValue,
    accepts: &dyn Fn(&JsonValue) -> bool,
) -> bool {
    let Some(slot) = doc.pointer_mut(parent).and_then(JsonValue::as_object_mut) else {
        return false;
    };
    let previous = slot.insert(key.to_string(), value);
    if accepts(doc) {
        return true;
    }

    if let Some(slot) = doc.pointer_mut(parent).and_then(JsonValue::as_object_mut) {
        match previous {
            Some(previous) => slot.insert(key.to_string(), previous),
            None => slot.remove(key),
        };
    }
    false
}

/// Append to the array at `pointer`, reverting if the document no longer parses.
fn try_push(
    doc: &mut JsonValue,
    pointer: &str,
    item: JsonValue,
    accepts: &dyn Fn(&JsonValue) -> bool,
) -> bool {
    let Some(items) = doc.pointer_mut(pointer).and_then(JsonValue::as_array_mut) else {
        return false;
    };
    items.push(item);
    if accepts(doc) {
        return true;
    }

    if let Some(items) = doc.pointer_mut(pointer).and_then(JsonValue::as_array_mut) {
        items.pop();
    }
    false
}
