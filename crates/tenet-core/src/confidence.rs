//! Confidence scoring for decision trees.
//!
//! Pure functions: each turns a tree's evidentiary inputs into a value in
//! `[0.0, 1.0]`, clamped to the range documented for that tree.

use crate::clock::is_transition_hour;

/// Clamp and round to two decimals so additive adjustments stay exact.
pub fn clamp_confidence(value: f64, min: f64, max: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.clamp(min, max)
}

/// Average of the per-side "has supporting data" indicators.
pub fn maintenance_confidence(maintenance_has_data: bool, feature_has_data: bool) -> f64 {
    let indicator = |has_data: bool| if has_data { 0.7 } else { 0.5 };
    let average = (indicator(maintenance_has_data) + indicator(feature_has_data)) / 2.0;
    clamp_confidence(average, 0.3, 1.0)
}

pub fn communication_confidence(
    has_recent_interaction: bool,
    urgency_explicit: bool,
    hour: u32,
) -> f64 {
    let mut confidence = 0.7;
    if has_recent_interaction {
        confidence += 0.1;
    }
    if urgency_explicit {
        confidence += 0.1;
    }
    if is_transition_hour(hour) {
        confidence -= 0.1;
    }
    clamp_confidence(confidence, 0.3, 1.0)
}

pub fn error_confidence(
    has_known_solution: bool,
    similar_errors_handled: u32,
    system_unstable: bool,
) -> f64 {
    let mut confidence = 0.8;
    if has_known_solution {
        confidence += 0.1;
    }
    if similar_errors_handled > 0 {
        confidence += 0.1;
    }
    if system_unstable {
        confidence -= 0.2;
    }
    clamp_confidence(confidence, 0.4, 1.0)
}

pub fn allocation_confidence(task_count: usize, every_task_scored: bool) -> f64 {
    let mut confidence = 0.7;
    if task_count <= 3 {
        confidence += 0.1;
    }
    if every_task_scored {
        confidence += 0.1;
    }
    clamp_confidence(confidence, 0.5, 1.0)
}
