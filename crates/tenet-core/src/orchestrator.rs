//! Decision orchestrator.
//!
//! The single entry point for callers: routes a scenario key to its tree,
//! evaluates, and records the result through the compliance monitor. The
//! routing table is an exhaustive `match` over [`ScenarioType`], so adding a
//! scenario without a tree fails to compile.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::monitor::ComplianceMonitor;
use crate::trees::{
    CommunicationTree, ErrorHandlingTree, EvalContext, MaintenanceVsFeatureTree,
    ResourceAllocationTree, ScenarioInput, Verdict,
};
use crate::types::{DecisionOutcome, ScenarioType};
use crate::DecisionError;

pub struct Orchestrator {
    monitor: Arc<ComplianceMonitor>,
    maintenance_vs_feature: MaintenanceVsFeatureTree,
    communication: CommunicationTree,
    error_handling: ErrorHandlingTree,
    resource_allocation: ResourceAllocationTree,
}

impl Orchestrator {
    /// Build every tree once; all of them record through `monitor`.
    pub fn new(monitor: Arc<ComplianceMonitor>) -> Self {
        Self {
            monitor,
            maintenance_vs_feature: MaintenanceVsFeatureTree::new(),
            communication: CommunicationTree::new(),
            error_handling: ErrorHandlingTree::new(),
            resource_allocation: ResourceAllocationTree::new(),
        }
    }

    pub fn monitor(&self) -> &ComplianceMonitor {
        &self.monitor
    }

    /// Scenario keys this orchestrator can route.
    pub fn scenarios(&self) -> &'static [ScenarioType] {
        &ScenarioType::ALL
    }

    /// Route `scenario` with raw collaborator JSON.
    ///
    /// An unknown scenario is the only error; malformed inputs fall back to
    /// the tree's defaults.
    pub fn make_decision(
        &self,
        scenario: &str,
        inputs: &JsonValue,
    ) -> Result<DecisionOutcome, DecisionError> {
        let scenario_type: ScenarioType = scenario.parse().inspect_err(|_| {
            tracing::warn!(scenario, "Rejected unknown scenario type");
        })?;
        Ok(self.decide(ScenarioInput::parse(scenario_type, inputs)))
    }

    /// Evaluate typed inputs and record the decision.
    pub fn decide(&self, input: ScenarioInput) -> DecisionOutcome {
        let verdict = self.evaluate(&input);
        tracing::debug!(
            scenario = %verdict.scenario,
            chosen = %verdict.chosen,
            score = verdict.score,
            "Tree evaluated"
        );
        self.monitor.log_decision(verdict.into_draft())
    }

    /// Evaluate without recording.
    pub fn evaluate(&self, input: &ScenarioInput) -> Verdict {
        let ctx = EvalContext::new(self.monitor.now(), self.monitor.policy());
        match input {
            ScenarioInput::MaintenanceVsFeature(inputs) => {
                self.maintenance_vs_feature.evaluate(inputs, &ctx)
            }
            ScenarioInput::Communication(inputs) => self.communication.evaluate(inputs, &ctx),
            ScenarioInput::ErrorHandling(inputs) => self.error_handling.evaluate(inputs, &ctx),
            ScenarioInput::ResourceAllocation(inputs) => {
                self.resource_allocation.evaluate(inputs, &ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::policy::Policy;
    use crate::store::AuditStore;
    use crate::trees::{NOTIFY_IMMEDIATELY, WAIT_FOR_HEARTBEAT};
    use crate::types::ViolationKind;
    use serde_json::json;

    fn orchestrator_at(hour: u32) -> (tempfile::TempDir, Orchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let policy = Policy::default();
        let store = AuditStore::open(dir.path(), &policy.retention).unwrap();
        let clock = Arc::new(FixedClock::at_hour(hour).unwrap());
        let monitor = Arc::new(ComplianceMonitor::new(store, policy, clock));
        (dir, Orchestrator::new(monitor))
    }

    #[test]
    fn test_every_scenario_routes_and_records() {
        let (_dir, orchestrator) = orchestrator_at(12);
        for scenario in orchestrator.scenarios() {
            let outcome = orchestrator.make_decision(scenario.as_str(), &json!({})).unwrap();
            assert_eq!(outcome.decision.scenario, scenario.as_str());
            assert!(outcome.decision.options.contains(&outcome.decision.chosen));
        }
        assert_eq!(orchestrator.monitor().store().read_decisions().len(), 4);
    }

    #[test]
    fn test_quiet_hours_override_through_orchestrator() {
        let inputs = json!({
            "information": { "timeSensitive": true, "timeHorizonHours": 12, "critical": false }
        });

        let (_night_dir, night) = orchestrator_at(23);
        let outcome = night.make_decision("communication", &inputs).unwrap();
        assert_eq!(outcome.decision.chosen, WAIT_FOR_HEARTBEAT);

        let (_day_dir, day) = orchestrator_at(11);
        let outcome = day.make_decision("communication", &inputs).unwrap();
        assert_eq!(outcome.decision.chosen, NOTIFY_IMMEDIATELY);
    }

    #[test]
    fn test_low_confidence_tree_decision_is_flagged() {
        let (_dir, orchestrator) = orchestrator_at(12);
        // Neither side has data: confidence 0.5
        let outcome = orchestrator
            .make_decision("maintenanceVsFeature", &json!({}))
            .unwrap();

        assert_eq!(outcome.decision.score, Some(0.5));
        let violation = outcome.violation.unwrap();
        assert_eq!(violation.kind, ViolationKind::LowConfidenceDecision);
    }

    #[test]
    fn test_malformed_context_still_stops_on_safety_critical() {
        let (_dir, orchestrator) = orchestrator_at(12);
        let outcome = orchestrator
            .make_decision(
                "error_handling",
                &json!({
                    "error": { "safetyCritical": true },
                    "context": { "similarErrorsHandled": 2.5 }
                }),
            )
            .unwrap();
        assert_eq!(outcome.decision.chosen, crate::trees::ALERT_AND_STOP);
    }

    #[test]
    fn test_evaluate_does_not_record() {
        let (_dir, orchestrator) = orchestrator_at(12);
        let input = ScenarioInput::parse(ScenarioType::ErrorHandling, &json!({}));
        orchestrator.evaluate(&input);
        assert!(orchestrator.monitor().store().read_decisions().is_empty());
    }
}
