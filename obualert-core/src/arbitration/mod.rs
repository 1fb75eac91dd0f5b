//! Arbitration Engine
//!
//! Decides, for every incoming notification, whether the single active alert
//! is replaced, merely refreshed, or left alone, and keeps its expiry timer.
//!
//! - [`rules`]: the data-described rule table
//! - [`expiry`]: the single-slot, generation-token expiry scheduler
//! - [`engine`]: [`AlertEngine`], the owner of all alert state
//!
//! The engine is synchronous and time is passed in, so the caller decides
//! which context it runs on and which clock it uses.

pub mod engine;
pub mod expiry;
pub mod rules;

pub use engine::{Action, AlertEngine, Decision, Outcome};
pub use expiry::{ExpiryPolicy, ExpiryScheduler, ExpiryToken, MAX_EXPIRY};
pub use rules::{Effect, Filter, Flow, Plan, Rule, RuleContext, RuleSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// When may a notification for another object take over the active alert?
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PreemptionPolicy {
    /// Any other object, or a tier change of the same object, replaces the alert
    #[default]
    Tier,
    /// Another object only replaces the alert when it is more urgent right now
    Urgency,
}

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArbitrationConfig {
    pub preemption: PreemptionPolicy,
    pub expiry: ExpiryPolicy,
}
