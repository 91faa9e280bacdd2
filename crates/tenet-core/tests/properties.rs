//! Property tests over every decision tree: whatever the inputs, a tree picks
//! one of its own options, explains itself, and stays inside its confidence
//! band.

use chrono::{DateTime, FixedOffset, TimeZone};
use proptest::prelude::*;
use serde_json::json;

use tenet_core::trees::{
    CommunicationContext, CommunicationInputs, CommunicationTree, ErrorContext, ErrorDescriptor,
    ErrorHandlingInputs, ErrorHandlingTree, Information, MaintenanceContext,
    MaintenanceVsFeatureInputs, MaintenanceVsFeatureTree, ResourceAllocationInputs,
    ResourceAllocationTree, ResourceSnapshot, TaskRequest, WorkItem,
};
use tenet_core::{is_quiet_hour, EvalContext, Policy, ScenarioInput, ScenarioType, Verdict};

fn at_hour(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 3, 2, hour, 30, 0)
        .unwrap()
}

fn assert_well_formed(verdict: &Verdict, min: f64, max: f64) -> Result<(), TestCaseError> {
    prop_assert!(
        verdict.options.contains(&verdict.chosen),
        "chosen {:?} not in {:?}",
        verdict.chosen,
        verdict.options
    );
    prop_assert!(!verdict.reasoning.trim().is_empty());
    prop_assert!(
        verdict.score >= min && verdict.score <= max,
        "score {} outside [{}, {}]",
        verdict.score,
        min,
        max
    );
    Ok(())
}

fn arb_work_item() -> impl Strategy<Value = WorkItem> {
    (
        any::<bool>(),
        any::<bool>(),
        0.0f64..10.0,
        0.0f64..10.0,
        0.0f64..10.0,
        any::<bool>(),
    )
        .prop_map(
            |(stability_risk, has_deadline, impact, effort, urgency, has_data)| WorkItem {
                stability_risk,
                has_deadline,
                impact,
                effort,
                urgency,
                has_data,
            },
        )
}

fn arb_maintenance() -> impl Strategy<Value = MaintenanceVsFeatureInputs> {
    (
        arb_work_item(),
        arb_work_item(),
        any::<bool>(),
        prop::option::of("[a-z ]{0,12}"),
    )
        .prop_map(
            |(maintenance_issue, new_feature, has_precedent, known_preference)| {
                MaintenanceVsFeatureInputs {
                    maintenance_issue,
                    new_feature,
                    context: MaintenanceContext {
                        has_precedent,
                        known_preference,
                    },
                }
            },
        )
}

fn arb_communication() -> impl Strategy<Value = CommunicationInputs> {
    (
        prop::option::of(any::<bool>()),
        0.0f64..72.0,
        0.0f64..10.0,
        any::<bool>(),
        any::<(bool, bool, bool)>(),
        0u32..40,
    )
        .prop_map(
            |(time_sensitive, time_horizon_hours, value_score, critical, flags, recent)| {
                CommunicationInputs {
                    information: Information {
                        time_sensitive,
                        time_horizon_hours,
                        value_score,
                        critical,
                    },
                    context: CommunicationContext {
                        in_focus_time: flags.0,
                        recent_messages_count: recent,
                        human_busy: flags.1,
                        has_recent_interaction: flags.2,
                    },
                }
            },
        )
}

fn arb_error_handling() -> impl Strategy<Value = ErrorHandlingInputs> {
    (
        any::<(bool, bool, bool, bool, bool)>(),
        0.0f64..1.0,
        0u32..10,
        any::<bool>(),
    )
        .prop_map(|(flags, auto_fix_confidence, similar, unstable)| ErrorHandlingInputs {
            error: ErrorDescriptor {
                safety_critical: flags.0,
                can_auto_fix: flags.1,
                auto_fix_confidence,
                affects_outputs: flags.2,
                is_known_issue: flags.3,
                has_known_solution: flags.4,
            },
            context: ErrorContext {
                similar_errors_handled: similar,
                system_unstable: unstable,
            },
        })
}

fn arb_resource() -> impl Strategy<Value = ResourceAllocationInputs> {
    (
        prop::collection::vec(
            (any::<bool>(), prop::option::of(0.0f64..10.0)),
            0..6,
        ),
        0.0f64..100.0,
        0.0f64..100.0,
    )
        .prop_map(|(tasks, cpu, remaining)| {
            let tasks = tasks
                .into_iter()
                .enumerate()
                .map(|(i, (essential, priority_score))| TaskRequest {
                    id: format!("task-{}", i),
                    essential,
                    priority_score,
                })
                .collect();
            let resources: ResourceSnapshot = serde_json::from_value(json!({
                "cpu": { "usagePercent": cpu },
                "remainingPercent": remaining,
            }))
            .unwrap();
            ResourceAllocationInputs { tasks, resources }
        })
}

proptest! {
    #[test]
    fn maintenance_tree_is_well_formed(inputs in arb_maintenance(), hour in 0u32..24) {
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(hour), &policy);
        let verdict = MaintenanceVsFeatureTree::new().evaluate(&inputs, &ctx);
        assert_well_formed(&verdict, 0.3, 1.0)?;
    }

    #[test]
    fn communication_tree_is_well_formed(inputs in arb_communication(), hour in 0u32..24) {
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(hour), &policy);
        let verdict = CommunicationTree::new().evaluate(&inputs, &ctx);
        assert_well_formed(&verdict, 0.3, 1.0)?;
    }

    #[test]
    fn quiet_hours_never_notify_non_critical(inputs in arb_communication(), hour in 0u32..24) {
        prop_assume!(is_quiet_hour(hour) && !inputs.information.critical);
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(hour), &policy);
        let verdict = CommunicationTree::new().evaluate(&inputs, &ctx);
        prop_assert_ne!(verdict.chosen.as_str(), tenet_core::trees::NOTIFY_IMMEDIATELY);
    }

    #[test]
    fn error_tree_is_well_formed(inputs in arb_error_handling(), hour in 0u32..24) {
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(hour), &policy);
        let verdict = ErrorHandlingTree::new().evaluate(&inputs, &ctx);
        assert_well_formed(&verdict, 0.4, 1.0)?;
    }

    #[test]
    fn safety_critical_errors_always_stop(inputs in arb_error_handling()) {
        prop_assume!(inputs.error.safety_critical);
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(12), &policy);
        let verdict = ErrorHandlingTree::new().evaluate(&inputs, &ctx);
        prop_assert_eq!(verdict.chosen.as_str(), tenet_core::trees::ALERT_AND_STOP);
    }

    #[test]
    fn resource_tree_is_well_formed(inputs in arb_resource()) {
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(12), &policy);
        let tree = ResourceAllocationTree::new();
        let verdict = tree.evaluate(&inputs, &ctx);
        assert_well_formed(&verdict, 0.5, 1.0)?;

        let plan = tree.plan(&inputs, &ctx);
        for allocation in &plan.allocations {
            prop_assert!(allocation.share_percent >= 0.0);
            prop_assert!(allocation.share_percent <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn malformed_inputs_still_decide(raw in prop::collection::vec(any::<u8>(), 0..32), hour in 0u32..24) {
        let policy = Policy::default();
        let ctx = EvalContext::new(at_hour(hour), &policy);
        let junk = json!({ "information": raw, "error": "nope", "tasks": 7 });
        for scenario in ScenarioType::ALL {
            let verdict = match ScenarioInput::parse(scenario, &junk) {
                ScenarioInput::MaintenanceVsFeature(i) => MaintenanceVsFeatureTree::new().evaluate(&i, &ctx),
                ScenarioInput::Communication(i) => CommunicationTree::new().evaluate(&i, &ctx),
                ScenarioInput::ErrorHandling(i) => ErrorHandlingTree::new().evaluate(&i, &ctx),
                ScenarioInput::ResourceAllocation(i) => ResourceAllocationTree::new().evaluate(&i, &ctx),
            };
            prop_assert!(verdict.options.contains(&verdict.chosen));
            prop_assert!(!verdict.reasoning.trim().is_empty());
        }
    }
}
