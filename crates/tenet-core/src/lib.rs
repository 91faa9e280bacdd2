//! # tenet-core
//!
//! Decision-policy and compliance-audit engine for autonomous agents.
//!
//! This crate answers two questions for an agent:
//! - Given a recurring dilemma, which option should I take and why?
//! - Is my recent behavior still inside the operating protocol?
//!
//! ## Key Guarantees
//!
//! 1. **Total**: every decision tree produces a chosen option for any input
//! 2. **Recorded**: every orchestrated decision is appended to the decision log
//! 3. **Non-blocking audit**: persistence failures are logged, never raised to the agent
//! 4. **Deterministic under test**: all time-dependent rules read an injected [`Clock`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenet_core::{AuditStore, ComplianceMonitor, Orchestrator, Policy, SystemClock};
//!
//! let policy = Policy::default();
//! let store = AuditStore::open("compliance", &policy.retention)?;
//! let monitor = Arc::new(ComplianceMonitor::new(store, policy, Arc::new(SystemClock)));
//! let orchestrator = Orchestrator::new(monitor.clone());
//!
//! let outcome = orchestrator.make_decision("error_handling", &serde_json::json!({
//!     "error": { "safetyCritical": true }
//! }))?;
//! println!("{}: {}", outcome.decision.chosen, outcome.decision.reasoning);
//!
//! let snapshot = monitor.run_compliance_check(&[]);
//! println!("compliance score {:.2}", snapshot.compliance_score);
//! ```

pub mod clock;
pub mod confidence;
pub mod monitor;
pub mod orchestrator;
pub mod policy;
pub mod report;
pub mod store;
pub mod trees;
pub mod types;

// Re-export main types at crate root
pub use clock::{is_quiet_hour, Clock, FixedClock, SystemClock};
pub use monitor::ComplianceMonitor;
pub use orchestrator::Orchestrator;
pub use policy::{Policy, PolicyError};
pub use store::{AuditStore, JsonLog, StoreError};
pub use trees::{EvalContext, ScenarioInput, Verdict};
pub use types::{
    Alert, CheckResult, ComplianceChecks, ComplianceSnapshot, DailyReport, Decision,
    DecisionDraft, DecisionOutcome, LogStatus, MessageSample, Priority, Recommendation,
    SafetyAction, ScenarioType, Severity, Urgency, Violation, ViolationKind,
};

use thiserror::Error;

/// Errors visible to callers of the orchestrator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("Unknown scenario type: {0}")]
    UnknownScenario(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_basic_decision_flow() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Policy::default();
        let store = AuditStore::open(dir.path(), &policy.retention).unwrap();
        let clock = Arc::new(FixedClock::at_hour(14).unwrap());
        let monitor = Arc::new(ComplianceMonitor::new(store, policy, clock));
        let orchestrator = Orchestrator::new(monitor.clone());

        let outcome = orchestrator
            .make_decision(
                "error_handling",
                &serde_json::json!({ "error": { "safetyCritical": true } }),
            )
            .unwrap();

        assert_eq!(outcome.decision.chosen, "Immediate alert + stop");
        assert!(outcome.log_status.is_recorded());
        assert_eq!(monitor.store().read_decisions().len(), 1);
    }

    #[test]
    fn test_unknown_scenario_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Policy::default();
        let store = AuditStore::open(dir.path(), &policy.retention).unwrap();
        let monitor = Arc::new(ComplianceMonitor::new(store, policy, Arc::new(SystemClock)));
        let orchestrator = Orchestrator::new(monitor.clone());

        let result = orchestrator.make_decision("deploy_to_prod", &serde_json::json!({}));

        assert_eq!(
            result,
            Err(DecisionError::UnknownScenario("deploy_to_prod".to_string()))
        );
        assert!(monitor.store().read_decisions().is_empty());
    }
}
