//! Presentation cue
//!
//! The (direction, tier, object type) triple assigned to the active alert and
//! the presentation parameters renderer and audio collaborators derive from it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::model::{Direction, Notification, ObjectType, RiskTier};

/// Screen edge that lights up for a direction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScreenEdge {
    Top,
    Bottom,
    Left,
    Right,
}

impl From<Direction> for ScreenEdge {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Front | Direction::Unknown => ScreenEdge::Top,
            Direction::Rear => ScreenEdge::Bottom,
            Direction::Left => ScreenEdge::Left,
            Direction::Right => ScreenEdge::Right,
        }
    }
}

/// What the collaborators render and play for one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCue {
    pub direction: Direction,
    pub tier: RiskTier,
    pub object_type: ObjectType,
}

impl From<&Notification> for AlertCue {
    fn from(n: &Notification) -> Self {
        AlertCue {
            direction: n.direction,
            tier: n.risk_tier,
            object_type: n.object_type,
        }
    }
}

impl AlertCue {
    pub fn edge(&self) -> ScreenEdge {
        self.direction.into()
    }

    pub fn intensity(&self) -> u8 {
        self.tier.intensity()
    }

    /// Period of the edge glow pulse
    pub fn pulse_period_ms(&self) -> u32 {
        match self.tier {
            RiskTier::Low => 800,
            RiskTier::Medium => 500,
            RiskTier::High => 300,
        }
    }

    /// Period of the direction arrow blink
    pub fn blink_period_ms(&self) -> u32 {
        match self.tier {
            RiskTier::Low => 400,
            RiskTier::Medium => 300,
            RiskTier::High => 200,
        }
    }

    pub fn color(&self) -> &'static str {
        match self.tier {
            RiskTier::Low => "gray",
            RiskTier::Medium => "yellow",
            RiskTier::High => "red",
        }
    }

    /// Audio clip name, e.g. `top_human_high`
    pub fn sound_clip(&self) -> String {
        let object = match self.object_type {
            ObjectType::Unknown => "null",
            _ => self.object_type.as_ref(),
        };
        format!("{}_{}_{}", self.edge(), object, self.tier)
    }
}
