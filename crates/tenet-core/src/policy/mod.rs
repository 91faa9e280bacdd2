//! Policy thresholds and weights.
//!
//! Rule logic is fixed per decision type; only the numbers in a [`Policy`]
//! are configurable. Policies load from YAML or JSON and are validated on
//! load, the same way for either format.

mod config;

pub use config::{
    CheckWeights, Policy, PolicyError, Retention, Thresholds, Windows, DEFAULT_ALERT_THRESHOLD,
    DEFAULT_AUTO_FIX_CONFIDENCE, DEFAULT_LOW_CONFIDENCE, DEFAULT_RESOURCE_USAGE_TRIGGER,
    DEFAULT_TRANSPARENCY_RATE, MAX_LOOKBACK_HOURS,
};
