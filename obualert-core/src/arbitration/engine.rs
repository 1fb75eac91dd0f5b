//! Alert engine
//!
//! [`AlertEngine`] owns the active alert, the per-object memory and the
//! expiry scheduler. It is the only writer of that state. Every entry point
//! returns the [`Action`]s collaborators must carry out, in order.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use chrono::Utc;
//! use obualert_core::arbitration::{Action, AlertEngine, Outcome};
//! use obualert_core::model::{Direction, Notification, ObjectType, RiskTier};
//!
//! let mut engine = AlertEngine::default();
//! let notification = Notification {
//!     object_id: "p1".into(),
//!     object_type: ObjectType::Human,
//!     direction: Direction::Front,
//!     risk_tier: RiskTier::High,
//!     self_location: None,
//!     self_speed: 0.0,
//!     object_coordinates: None,
//!     timestamp: Utc::now(),
//! };
//!
//! let t0 = Instant::now();
//! let decision = engine.process(notification, t0);
//! assert_eq!(decision.outcome, Outcome::Replaced);
//! assert!(matches!(decision.actions[0], Action::DisplayAlert(_)));
//!
//! let actions = engine.poll_expiry(t0 + Duration::from_secs(5));
//! assert!(matches!(actions[..], [Action::StopAlert(_)]));
//! assert!(engine.active().is_none());
//! ```

use std::time::Instant;

use crate::cue::AlertCue;
use crate::model::Notification;
use crate::preferences::{AlertPreferences, Preferences};
use crate::state::{ActiveAlert, ActiveAlertSnapshot, ObjectMemory};

use super::expiry::{ExpiryScheduler, ExpiryToken};
use super::rules::{Effect, RuleContext, RuleSet};
use super::ArbitrationConfig;

/// Instruction for the renderer and audio collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    DisplayAlert(AlertCue),
    PlaySound(AlertCue),
    /// Stop visuals and audio of a previously displayed alert
    StopAlert(AlertCue),
}

/// What arbitration did with a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replaced,
    Refreshed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    pub actions: Vec<Action>,
    /// Names of the rules that matched
    pub matched: Vec<&'static str>,
}

pub struct AlertEngine {
    config: ArbitrationConfig,
    rules: RuleSet,
    preferences: Box<dyn Preferences>,
    active: Option<ActiveAlert>,
    objects: ObjectMemory,
    expiry: ExpiryScheduler,
}

impl Default for AlertEngine {
    fn default() -> Self {
        AlertEngine::new(ArbitrationConfig::default(), Box::new(AlertPreferences::default()))
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("objects", &self.objects.len())
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl AlertEngine {
    pub fn new(config: ArbitrationConfig, preferences: Box<dyn Preferences>) -> Self {
        AlertEngine {
            rules: RuleSet::standard(config.preemption),
            config,
            preferences,
            active: None,
            objects: ObjectMemory::new(),
            expiry: ExpiryScheduler::new(),
        }
    }

    /// Replace the rule table
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &ArbitrationConfig {
        &self.config
    }

    pub fn set_preferences(&mut self, preferences: Box<dyn Preferences>) {
        self.preferences = preferences;
    }

    pub fn active(&self) -> Option<ActiveAlertSnapshot> {
        self.active.as_ref().map(ActiveAlert::snapshot)
    }

    /// When the pending expiry is due, if one is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.deadline()
    }

    pub fn tracked_objects(&self) -> usize {
        self.objects.len()
    }

    /// Arbitrate one notification received at `now`
    ///
    /// An alert whose deadline has already passed at `now` expires first, so
    /// a queued notification never refreshes an overdue alert.
    pub fn process(&mut self, notification: Notification, now: Instant) -> Decision {
        let mut actions = self.poll_expiry(now);

        let plan = {
            let ctx = RuleContext {
                notification: &notification,
                active: self.active.as_ref(),
                previous: self.objects.get(&notification.object_id),
                preferences: self.preferences.as_ref(),
            };
            self.rules.plan(&ctx)
        };

        if plan.contains(Effect::Ignore) {
            return Decision {
                outcome: Outcome::Ignored,
                actions,
                matched: plan.matched,
            };
        }

        self.objects.observe(&notification);

        for effect in &plan.effects {
            match effect {
                Effect::Ignore => {}
                Effect::RefreshExpiry => {
                    let delay = self.config.expiry.delay_for(&notification);
                    if let Some(active) = self.active.as_mut() {
                        active.token = Some(self.expiry.arm(now, delay));
                        active.notification = notification.clone();
                        active.refresh_count += 1;
                    }
                }
                Effect::StopActive => {
                    if let Some(old) = self.active.take() {
                        self.expiry.cancel();
                        if old.had_effect() {
                            actions.push(Action::StopAlert(old.cue));
                        }
                    }
                }
                Effect::InstallActive => {
                    self.active = Some(ActiveAlert::new(notification.clone()));
                }
                Effect::ScheduleExpiry => {
                    let delay = self.config.expiry.delay_for(&notification);
                    if let Some(active) = self.active.as_mut() {
                        active.token = Some(self.expiry.arm(now, delay));
                    }
                }
                Effect::ShowVisual => {
                    if let Some(active) = self.active.as_mut() {
                        active.visual = true;
                        actions.push(Action::DisplayAlert(active.cue));
                    }
                }
                Effect::PlayAudio => {
                    if let Some(active) = self.active.as_mut() {
                        active.audible = true;
                        actions.push(Action::PlaySound(active.cue));
                    }
                }
            }
        }

        let outcome = if plan.contains(Effect::InstallActive) {
            Outcome::Replaced
        } else if plan.contains(Effect::RefreshExpiry) {
            Outcome::Refreshed
        } else {
            Outcome::Ignored
        };

        Decision {
            outcome,
            actions,
            matched: plan.matched,
        }
    }

    /// Expire the active alert if its timer is due at `now`
    pub fn poll_expiry(&mut self, now: Instant) -> Vec<Action> {
        match self.expiry.poll(now) {
            Some(token) => self.expire(token),
            None => Vec::new(),
        }
    }

    /// Timer `token` fired; clears the alert only if it is the one that armed it
    pub fn expire(&mut self, token: ExpiryToken) -> Vec<Action> {
        let current = self
            .active
            .as_ref()
            .map_or(false, |a| a.token == Some(token));
        if !current {
            return Vec::new();
        }

        self.expiry.disarm(token);
        match self.active.take() {
            Some(old) if old.had_effect() => vec![Action::StopAlert(old.cue)],
            _ => Vec::new(),
        }
    }

    /// Cancel the pending expiry and clear all alert state
    ///
    /// Safe to call any number of times.
    pub fn reset(&mut self) -> Vec<Action> {
        self.expiry.cancel();
        self.objects.clear();
        match self.active.take() {
            Some(old) if old.had_effect() => vec![Action::StopAlert(old.cue)],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::{ExpiryPolicy, PreemptionPolicy, MAX_EXPIRY};
    use crate::model::{Direction, GeoPoint, ObjectCoordinates, ObjectType, RiskTier};
    use crate::preferences::EffectKind;
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn notification(object_id: &str, tier: RiskTier, secs: i64) -> Notification {
        Notification {
            object_id: object_id.to_string(),
            object_type: ObjectType::Human,
            direction: Direction::Front,
            risk_tier: tier,
            self_location: None,
            self_speed: 0.0,
            object_coordinates: None,
            timestamp: base_time() + chrono::Duration::seconds(secs),
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_same_tier_only_reschedules() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();

        let first = engine.process(notification("p1", RiskTier::Medium, 0), t0);
        assert_eq!(first.outcome, Outcome::Replaced);
        assert_eq!(first.actions.len(), 2);
        assert_eq!(engine.next_deadline(), Some(t0 + secs(5)));

        let second = engine.process(notification("p1", RiskTier::Medium, 3), t0 + secs(3));
        assert_eq!(second.outcome, Outcome::Refreshed);
        assert!(second.actions.is_empty());
        assert_eq!(engine.next_deadline(), Some(t0 + secs(8)));

        // the original deadline passes without clearing the alert
        assert!(engine.poll_expiry(t0 + secs(5)).is_empty());
        let active = engine.active().unwrap();
        assert_eq!(active.refresh_count, 1);
        assert_eq!(active.updated_at, base_time() + chrono::Duration::seconds(3));
    }

    #[test]
    fn test_tier_change_replaces() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::Medium, 0), t0);

        let decision = engine.process(notification("p1", RiskTier::High, 1), t0 + secs(1));
        assert_eq!(decision.outcome, Outcome::Replaced);

        let medium = AlertCue {
            direction: Direction::Front,
            tier: RiskTier::Medium,
            object_type: ObjectType::Human,
        };
        let high = AlertCue {
            tier: RiskTier::High,
            ..medium
        };
        assert_eq!(
            decision.actions,
            vec![
                Action::StopAlert(medium),
                Action::DisplayAlert(high),
                Action::PlaySound(high)
            ]
        );
        assert_eq!(engine.active().unwrap().cue.tier, RiskTier::High);
    }

    #[test]
    fn test_stale_timer_does_not_clear_replacement() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::Low, 0), t0);
        let first_token = engine.active.as_ref().and_then(|a| a.token).unwrap();

        engine.process(notification("p1", RiskTier::High, 2), t0 + secs(2));

        // the first alert's timer fires late
        assert!(engine.expire(first_token).is_empty());
        assert_eq!(engine.active().unwrap().cue.tier, RiskTier::High);
        assert!(engine.poll_expiry(t0 + secs(5)).is_empty());

        let actions = engine.poll_expiry(t0 + secs(7));
        assert_eq!(actions.len(), 1);
        assert!(engine.active().is_none());
    }

    #[test]
    fn test_other_object_replaces_under_tier_policy() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::High, 0), t0);
        let decision = engine.process(notification("p2", RiskTier::Low, 1), t0);
        assert_eq!(decision.outcome, Outcome::Replaced);
        assert_eq!(engine.active().unwrap().object_id, "p2");
        assert_eq!(engine.tracked_objects(), 2);
    }

    #[test]
    fn test_disabled_tier_tracks_state_silently() {
        let prefs = |tier: RiskTier, _: EffectKind| tier == RiskTier::High;
        let mut engine = AlertEngine::new(ArbitrationConfig::default(), Box::new(prefs));
        let t0 = Instant::now();

        let decision = engine.process(notification("p1", RiskTier::Low, 0), t0);
        assert_eq!(decision.outcome, Outcome::Replaced);
        assert!(decision.actions.is_empty());
        assert!(engine.active().is_some());

        // state is kept, so the same tier refreshes
        let decision = engine.process(notification("p1", RiskTier::Low, 1), t0);
        assert_eq!(decision.outcome, Outcome::Refreshed);

        // replacing a silent alert emits no stop
        let decision = engine.process(notification("p1", RiskTier::High, 2), t0);
        assert!(matches!(decision.actions[..], [Action::DisplayAlert(_), Action::PlaySound(_)]));

        // a silent alert expires silently
        let mut engine = AlertEngine::new(ArbitrationConfig::default(), Box::new(prefs));
        engine.process(notification("p1", RiskTier::Medium, 0), t0);
        assert!(engine.poll_expiry(t0 + secs(5)).is_empty());
        assert!(engine.active().is_none());
    }

    #[test]
    fn test_visual_only_preferences() {
        let prefs = |_: RiskTier, kind: EffectKind| kind == EffectKind::Visual;
        let mut engine = AlertEngine::new(ArbitrationConfig::default(), Box::new(prefs));
        let decision = engine.process(notification("p1", RiskTier::Medium, 0), Instant::now());
        assert!(matches!(decision.actions[..], [Action::DisplayAlert(_)]));
        let snapshot = engine.active().unwrap();
        assert!(snapshot.visual);
        assert!(!snapshot.audible);
    }

    #[test]
    fn test_stale_event_ignored() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::Low, 10), t0);
        let decision = engine.process(notification("p1", RiskTier::High, 5), t0);
        assert_eq!(decision.outcome, Outcome::Ignored);
        assert!(decision.actions.is_empty());
        assert_eq!(engine.active().unwrap().cue.tier, RiskTier::Low);
    }

    #[test]
    fn test_urgency_policy() {
        let config = ArbitrationConfig {
            preemption: PreemptionPolicy::Urgency,
            ..Default::default()
        };
        let mut engine = AlertEngine::new(config, Box::new(AlertPreferences::default()));
        let t0 = Instant::now();

        // p1: ~100 m ahead closing at 10 m/s, ttc ~10 s
        let mut p1 = notification("p1", RiskTier::Low, 0);
        p1.self_location = Some(GeoPoint::new(0.0, 0.0));
        p1.self_speed = 5.0;
        p1.object_coordinates = Some(ObjectCoordinates {
            position: GeoPoint::new(0.000_899_322, 0.0),
            speed: Some(5.0),
        });
        engine.process(p1.clone(), t0);

        // p2 with unknown ttc does not take over
        let decision = engine.process(notification("p2", RiskTier::High, 1), t0);
        assert_eq!(decision.outcome, Outcome::Ignored);
        assert_eq!(engine.active().unwrap().object_id, "p1");

        // p2 closing faster does
        let mut p2 = p1.clone();
        p2.object_id = "p2".to_string();
        p2.self_speed = 20.0;
        p2.timestamp = p1.timestamp + chrono::Duration::seconds(1);
        let decision = engine.process(p2, t0);
        assert_eq!(decision.outcome, Outcome::Replaced);
        assert_eq!(engine.active().unwrap().object_id, "p2");
    }

    #[test]
    fn test_ttc_expiry_policy() {
        let config = ArbitrationConfig {
            expiry: ExpiryPolicy::time_to_collision(),
            ..Default::default()
        };
        let mut engine = AlertEngine::new(config, Box::new(AlertPreferences::default()));
        let t0 = Instant::now();

        let mut n = notification("p1", RiskTier::Low, 0);
        n.self_location = Some(GeoPoint::new(0.0, 0.0));
        n.object_coordinates = Some(ObjectCoordinates {
            position: GeoPoint::new(0.000_899_322, 0.0),
            speed: Some(10.0),
        });
        engine.process(n, t0);

        // ttc ~10 s, expiry ~12 s
        assert!(engine.poll_expiry(t0 + secs(11)).is_empty());
        assert_eq!(engine.poll_expiry(t0 + secs(13)).len(), 1);
    }

    #[test]
    fn test_overdue_alert_expires_before_processing() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::Medium, 0), t0);

        // nobody polled at the 5 s deadline; the next event arrives at 6 s
        let decision = engine.process(notification("p1", RiskTier::Medium, 6), t0 + secs(6));
        assert_eq!(decision.outcome, Outcome::Replaced);
        let cue = AlertCue {
            direction: Direction::Front,
            tier: RiskTier::Medium,
            object_type: ObjectType::Human,
        };
        assert_eq!(
            decision.actions,
            vec![
                Action::StopAlert(cue),
                Action::DisplayAlert(cue),
                Action::PlaySound(cue)
            ]
        );
        assert_eq!(engine.next_deadline(), Some(t0 + secs(11)));
        assert_eq!(engine.active().unwrap().refresh_count, 0);

        // an ignored event still reports the expiry it triggered
        engine.process(notification("p1", RiskTier::Medium, 20), t0 + secs(7));
        let decision = engine.process(notification("p1", RiskTier::Medium, 10), t0 + secs(12));
        assert_eq!(decision.outcome, Outcome::Ignored);
        assert_eq!(decision.actions, vec![Action::StopAlert(cue)]);
        assert!(engine.active().is_none());
    }

    #[test]
    fn test_huge_ttc_does_not_overflow_expiry() {
        let config = ArbitrationConfig {
            expiry: ExpiryPolicy::time_to_collision(),
            ..Default::default()
        };
        let mut engine = AlertEngine::new(config, Box::new(AlertPreferences::default()));
        let t0 = Instant::now();

        let mut n = notification("p1", RiskTier::Low, 0);
        n.self_location = Some(GeoPoint::new(0.0, 0.0));
        n.object_coordinates = Some(ObjectCoordinates {
            position: GeoPoint::new(1.0, 0.0),
            speed: Some(1e-16),
        });
        let decision = engine.process(n, t0);
        assert_eq!(decision.outcome, Outcome::Replaced);
        assert_eq!(engine.next_deadline(), Some(t0 + MAX_EXPIRY));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut engine = AlertEngine::default();
        let t0 = Instant::now();
        engine.process(notification("p1", RiskTier::High, 0), t0);

        assert_eq!(engine.reset().len(), 1);
        assert!(engine.reset().is_empty());
        assert!(engine.active().is_none());
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.tracked_objects(), 0);
    }
}
