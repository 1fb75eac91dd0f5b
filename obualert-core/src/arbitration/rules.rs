//! Arbitration rules
//!
//! Arbitration is described as data: a [`RuleSet`] is an ordered table of
//! [`Rule`]s, each a predicate ([`Filter`]) plus the [`Effect`]s to apply when
//! it matches. Rules are evaluated top to bottom; a matching rule with
//! [`Flow::Stop`] ends evaluation, one with [`Flow::Continue`] lets later
//! rules add their effects too.
//!
//! Evaluation is pure. [`RuleSet::plan`] reads the state as it was when the
//! notification arrived and returns the effects in order; the engine applies
//! them afterwards.

use crate::model::{Notification, RiskTier};
use crate::preferences::{EffectKind, Preferences};
use crate::risk::is_more_important;
use crate::state::{ActiveAlert, ObjectRecord};

use super::PreemptionPolicy;

/// Everything a filter may look at
pub struct RuleContext<'a> {
    pub notification: &'a Notification,
    pub active: Option<&'a ActiveAlert>,
    /// Last record for the notification's object, before this notification
    pub previous: Option<&'a ObjectRecord>,
    pub preferences: &'a dyn Preferences,
}

/// Predicate over a [`RuleContext`]
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Always,
    /// Older than the last notification seen for the same object
    Stale,
    /// The active alert belongs to the notification's object
    ActiveForObject,
    /// The active alert belongs to the notification's object and has the same tier
    TierUnchanged,
    /// The notification is more urgent than the active alert (always true without one)
    MoreUrgent,
    TierIs(RiskTier),
    Enabled(RiskTier, EffectKind),
    Not(Box<Filter>),
    All(Vec<Filter>),
    Any(Vec<Filter>),
}

impl Filter {
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        let n = ctx.notification;
        match self {
            Filter::Always => true,
            Filter::Stale => ctx
                .previous
                .map_or(false, |p| n.timestamp < p.last_seen),
            Filter::ActiveForObject => ctx
                .active
                .map_or(false, |a| a.object_id() == n.object_id),
            Filter::TierUnchanged => ctx
                .active
                .map_or(false, |a| a.object_id() == n.object_id && a.tier() == n.risk_tier),
            Filter::MoreUrgent => is_more_important(ctx.active.map(|a| &a.notification), n),
            Filter::TierIs(tier) => n.risk_tier == *tier,
            Filter::Enabled(tier, kind) => ctx.preferences.get_preference(*tier, *kind),
            Filter::Not(inner) => !inner.matches(ctx),
            Filter::All(filters) => filters.iter().all(|f| f.matches(ctx)),
            Filter::Any(filters) => filters.iter().any(|f| f.matches(ctx)),
        }
    }
}

/// Side effect applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Drop the notification
    Ignore,
    /// Re-arm the active alert's expiry and keep its cue
    RefreshExpiry,
    /// Stop the visuals and audio of the current alert and forget it
    StopActive,
    /// Make the notification the active alert
    InstallActive,
    /// Arm a new expiry for the active alert
    ScheduleExpiry,
    ShowVisual,
    PlayAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Stop,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: &'static str,
    pub filter: Filter,
    pub effects: Vec<Effect>,
    pub flow: Flow,
}

impl Rule {
    pub fn new(name: &'static str, filter: Filter, effects: Vec<Effect>, flow: Flow) -> Self {
        Rule {
            name,
            filter,
            effects,
            flow,
        }
    }
}

/// Effects selected for one notification, in application order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub effects: Vec<Effect>,
    /// Names of the rules that matched
    pub matched: Vec<&'static str>,
}

impl Plan {
    pub fn contains(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::standard(PreemptionPolicy::default())
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// The stock table
    ///
    /// 1. stale events are ignored
    /// 2. same object, same tier: refresh the expiry only
    /// 3. (urgency policy) another object that is not more urgent is ignored
    /// 4. anything else replaces the active alert
    /// 5. per tier, visual and audio effects gated by the preferences
    pub fn standard(policy: PreemptionPolicy) -> Self {
        let mut rules = vec![
            Rule::new("stale", Filter::Stale, vec![Effect::Ignore], Flow::Stop),
            Rule::new(
                "refresh-only",
                Filter::TierUnchanged,
                vec![Effect::RefreshExpiry],
                Flow::Stop,
            ),
        ];

        if policy == PreemptionPolicy::Urgency {
            rules.push(Rule::new(
                "less-urgent",
                Filter::All(vec![
                    Filter::not(Filter::ActiveForObject),
                    Filter::not(Filter::MoreUrgent),
                ]),
                vec![Effect::Ignore],
                Flow::Stop,
            ));
        }

        rules.push(Rule::new(
            "replace",
            Filter::Always,
            vec![Effect::StopActive, Effect::InstallActive, Effect::ScheduleExpiry],
            Flow::Continue,
        ));

        for (kind, effect, names) in [
            (
                EffectKind::Visual,
                Effect::ShowVisual,
                ["visual-low", "visual-medium", "visual-high"],
            ),
            (
                EffectKind::Audio,
                Effect::PlayAudio,
                ["audio-low", "audio-medium", "audio-high"],
            ),
        ] {
            for (tier, name) in [RiskTier::Low, RiskTier::Medium, RiskTier::High]
                .into_iter()
                .zip(names)
            {
                rules.push(Rule::new(
                    name,
                    Filter::All(vec![Filter::TierIs(tier), Filter::Enabled(tier, kind)]),
                    vec![effect],
                    Flow::Continue,
                ));
            }
        }

        RuleSet { rules }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the table in order and collect the effects to apply
    pub fn plan(&self, ctx: &RuleContext<'_>) -> Plan {
        let mut plan = Plan::default();
        for rule in &self.rules {
            if !rule.filter.matches(ctx) {
                continue;
            }
            plan.matched.push(rule.name);
            plan.effects.extend_from_slice(&rule.effects);
            if rule.flow == Flow::Stop {
                break;
            }
        }
        plan
    }
}
