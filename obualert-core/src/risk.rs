//! Risk Evaluator
//!
//! Time-to-collision from the kinematic state carried by a [`Notification`],
//! the discrete [`RiskTier`] derived from it, and the cross-notification
//! urgency comparison used by the optional urgency preemption policy.
//!
//! # Example
//!
//! ```
//! use obualert_core::model::RiskTier;
//! use obualert_core::risk::classify;
//!
//! assert_eq!(classify(Some(3.9)), RiskTier::High);
//! assert_eq!(classify(Some(8.0)), RiskTier::Medium);
//! assert_eq!(classify(None), RiskTier::Low);
//! ```

use crate::geo::distance_meters;
use crate::model::{Direction, Notification, RiskTier};

/// TTC strictly below this is `High`
pub const HIGH_RISK_TTC_SECS: f64 = 4.0;
/// TTC at or below this (and not `High`) is `Medium`
pub const MEDIUM_RISK_TTC_SECS: f64 = 8.0;

/// Speed at which the object and the driver approach each other, in m/s
///
/// Objects in front or to the side are assumed to be heading towards us, so
/// the speeds add up. An object behind only closes in when it is faster.
/// Returns `None` when the object is not approaching.
pub fn closing_speed(direction: Direction, self_speed: f64, object_speed: f64) -> Option<f64> {
    let v = match direction {
        Direction::Front | Direction::Left | Direction::Right => self_speed + object_speed,
        Direction::Rear if object_speed > self_speed => object_speed - self_speed,
        Direction::Rear | Direction::Unknown => return None,
    };
    if v > 0.0 {
        Some(v)
    } else {
        None
    }
}

/// Seconds until the object reaches the driver, or `None` when unknown
///
/// Requires the driver's location plus the object's position and speed.
pub fn time_to_collision(notification: &Notification) -> Option<f64> {
    let own = notification.self_location?;
    let object = notification.object_coordinates?;
    let object_speed = object.speed?;

    let v = closing_speed(notification.direction, notification.self_speed, object_speed)?;
    Some(distance_meters(own, object.position) / v)
}

/// Tier for a TTC value; unknown TTC is the lowest priority
pub fn classify(ttc: Option<f64>) -> RiskTier {
    match ttc {
        Some(t) if t < HIGH_RISK_TTC_SECS => RiskTier::High,
        Some(t) if t <= MEDIUM_RISK_TTC_SECS => RiskTier::Medium,
        _ => RiskTier::Low,
    }
}

impl RiskTier {
    /// Tier for a TTC value, see [`classify`]
    pub fn from_ttc(ttc: Option<f64>) -> Self {
        classify(ttc)
    }
}

/// Tier derived from the notification's own kinematics
pub fn evaluate(notification: &Notification) -> RiskTier {
    classify(time_to_collision(notification))
}

/// Is `new` more urgent right now than `old`?
///
/// The old notification's TTC is aged by the time elapsed between the two
/// timestamps. A lapsed old risk always loses; a known TTC beats an unknown
/// one; two known values compare the new TTC with the old remaining time.
pub fn is_more_important(old: Option<&Notification>, new: &Notification) -> bool {
    let Some(old) = old else {
        return true;
    };

    let ttc_new = time_to_collision(new);
    let elapsed_ms = (new.timestamp - old.timestamp).num_milliseconds().max(0);
    let elapsed = elapsed_ms as f64 / 1000.0;
    let remaining_old = time_to_collision(old).map(|t| t - elapsed);

    match (remaining_old, ttc_new) {
        (Some(rem), _) if rem <= 0.0 => true,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(rem), Some(t)) => t < rem,
        (None, None) => false,
    }
}
