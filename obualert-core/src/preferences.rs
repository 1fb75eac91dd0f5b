//! Alert Preferences
//!
//! The settings collaborator decides, per risk tier, whether visual and audio
//! effects fire. The arbitration engine only sees the [`Preferences`] trait;
//! [`AlertPreferences`] is the stock serialisable implementation.
//!
//! # Example
//!
//! ```
//! use obualert_core::model::RiskTier;
//! use obualert_core::preferences::{AlertPreferences, EffectKind, Preferences};
//!
//! let prefs = AlertPreferences::from_json(r#"{"audio": {"low": false}}"#).unwrap();
//! assert!(prefs.get_preference(RiskTier::Low, EffectKind::Visual));
//! assert!(!prefs.get_preference(RiskTier::Low, EffectKind::Audio));
//! ```

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::RiskTier;

/// Kind of observable effect an alert can produce
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EffectKind {
    Visual,
    Audio,
}

/// Source of per-tier effect switches
pub trait Preferences: Send + Sync {
    fn get_preference(&self, tier: RiskTier, kind: EffectKind) -> bool;
}

impl<F> Preferences for F
where
    F: Fn(RiskTier, EffectKind) -> bool + Send + Sync,
{
    fn get_preference(&self, tier: RiskTier, kind: EffectKind) -> bool {
        self(tier, kind)
    }
}

/// One switch per risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSwitches {
    pub low: bool,
    pub medium: bool,
    pub high: bool,
}

impl Default for TierSwitches {
    fn default() -> Self {
        TierSwitches {
            low: true,
            medium: true,
            high: true,
        }
    }
}

impl TierSwitches {
    pub fn get(&self, tier: RiskTier) -> bool {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    pub fn set(&mut self, tier: RiskTier, enabled: bool) {
        match tier {
            RiskTier::Low => self.low = enabled,
            RiskTier::Medium => self.medium = enabled,
            RiskTier::High => self.high = enabled,
        }
    }
}

/// User preferences: master switches ANDed with per-tier switches
///
/// Missing keys default to enabled, so an empty JSON object is a valid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertPreferences {
    pub visual_enabled: bool,
    pub audio_enabled: bool,
    pub visual: TierSwitches,
    pub audio: TierSwitches,
}

impl Default for AlertPreferences {
    fn default() -> Self {
        AlertPreferences {
            visual_enabled: true,
            audio_enabled: true,
            visual: TierSwitches::default(),
            audio: TierSwitches::default(),
        }
    }
}

impl AlertPreferences {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Turn a single tier/kind switch on or off
    pub fn set(&mut self, tier: RiskTier, kind: EffectKind, enabled: bool) {
        match kind {
            EffectKind::Visual => self.visual.set(tier, enabled),
            EffectKind::Audio => self.audio.set(tier, enabled),
        }
    }

    /// Everything off
    pub fn silent() -> Self {
        let off = TierSwitches {
            low: false,
            medium: false,
            high: false,
        };
        AlertPreferences {
            visual_enabled: false,
            audio_enabled: false,
            visual: off,
            audio: off,
        }
    }
}

impl Preferences for AlertPreferences {
    fn get_preference(&self, tier: RiskTier, kind: EffectKind) -> bool {
        match kind {
            EffectKind::Visual => self.visual_enabled && self.visual.get(tier),
            EffectKind::Audio => self.audio_enabled && self.audio.get(tier),
        }
    }
}
