//! Domain Model
//!
//! A [`Notification`] is one risk event for one tracked object, produced by the
//! protocol decoder and consumed by the risk evaluator and the arbitration engine.
//! It is immutable once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Kind of road user reported by the on-board unit
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
pub enum ObjectType {
    Human,
    Bike,
    Vehicle,
    Motorcycle,
    Unknown,
}

impl ObjectType {
    /// Parse a wire string, mapping anything unrecognised to `Unknown`
    pub fn from_wire(s: &str) -> Self {
        s.trim().parse().unwrap_or(ObjectType::Unknown)
    }
}

/// Position of the object relative to the driver's heading
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
pub enum Direction {
    Left,
    Right,
    Front,
    Rear,
    Unknown,
}

impl Direction {
    /// Parse a wire string, mapping anything unrecognised to `Unknown`
    pub fn from_wire(s: &str) -> Self {
        s.trim().parse().unwrap_or(Direction::Unknown)
    }
}

/// Discrete risk classification, ordered `Low < Medium < High`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskTier {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Intensity level used by the renderer (0 = low, 2 = high)
    pub fn intensity(self) -> u8 {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
        }
    }
}

/// WGS-84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// Position and (optional) ground speed of the tracked object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectCoordinates {
    pub position: GeoPoint,
    /// Speed in m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// One collision-risk event for one tracked object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Identity of the tracked object
    pub object_id: String,
    pub object_type: ObjectType,
    pub direction: Direction,
    pub risk_tier: RiskTier,
    /// Driver's own position
    pub self_location: Option<GeoPoint>,
    /// Driver's own speed in m/s
    pub self_speed: f64,
    pub object_coordinates: Option<ObjectCoordinates>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Copy of this notification with a different risk tier
    pub fn with_tier(mut self, tier: RiskTier) -> Self {
        self.risk_tier = tier;
        self
    }
}
