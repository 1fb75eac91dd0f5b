//! Flat driver-alert record
//!
//! ```json
//! {
//!   "driver_data": {
//!     "object_id": "p1",
//!     "risk_level": "high",
//!     "object_direction": "left",
//!     "object_type": "human",
//!     "object_coordinates": {"latitude": -23.55, "longitude": -46.63, "speed": 1.4}
//!   },
//!   "location": {"latitude": -23.5501, "longitude": -46.6301},
//!   "driver_speed": 12.5,
//!   "timestamp": "2025-06-01T12:00:00Z"
//! }
//! ```
//!
//! String enums are matched case-insensitively. A risk level the client does
//! not recognise is re-derived from the kinematics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

use super::DecodeError;
use crate::model::{Direction, GeoPoint, Notification, ObjectCoordinates, ObjectType, RiskTier};
use crate::risk;

/// How far a record's timestamp may run ahead of the time it was received
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct DriverAlertRecord {
    #[serde(default)]
    pub driver_data: Option<DriverData>,
    #[serde(default)]
    pub location: Option<Location>,
    /// Own speed in m/s
    #[serde(default)]
    pub driver_speed: f64,
    /// RFC 3339 instant
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverData {
    #[serde(deserialize_with = "string_or_number")]
    pub object_id: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub object_direction: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub object_coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Some servers send numeric object ids
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

impl DriverAlertRecord {
    /// Build the domain notification; `received_at` stands in for a missing timestamp
    pub fn into_notification(self, received_at: DateTime<Utc>) -> Result<Notification, DecodeError> {
        let driver = self
            .driver_data
            .ok_or(DecodeError::MissingField("driver_data"))?;

        let timestamp = match self.timestamp {
            Some(ts) => DateTime::parse_from_rfc3339(ts.trim())
                .map_err(|_| DecodeError::Timestamp(ts.clone()))?
                .with_timezone(&Utc),
            None => received_at,
        };
        // A far-future stamp would make every later record for the object look stale
        let timestamp = if timestamp - received_at > Duration::seconds(MAX_FUTURE_SKEW_SECS) {
            received_at
        } else {
            timestamp
        };

        let server_tier: Option<RiskTier> = driver.risk_level.trim().parse().ok();

        let mut notification = Notification {
            object_id: driver.object_id,
            object_type: ObjectType::from_wire(&driver.object_type),
            direction: Direction::from_wire(&driver.object_direction),
            risk_tier: server_tier.unwrap_or_default(),
            self_location: self
                .location
                .map(|l| GeoPoint::new(l.latitude, l.longitude)),
            self_speed: self.driver_speed,
            object_coordinates: driver.object_coordinates.map(|c| ObjectCoordinates {
                position: GeoPoint::new(c.latitude, c.longitude),
                speed: c.speed,
            }),
            timestamp,
        };

        if server_tier.is_none() {
            notification.risk_tier = risk::evaluate(&notification);
        }
        Ok(notification)
    }
}
