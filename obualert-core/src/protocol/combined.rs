//! Combined PSM/BSM record
//!
//! A Personal Safety Message describing the tracked road user paired with the
//! Basic Safety Message of our own vehicle, both in J2735 scaled integer units.
//! Fields the client does not use (`msgCnt`, `secMark`, `accuracy`,
//! `pathHistory`, `partII`, ...) are accepted and ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::geo::relative_direction;
use crate::model::{GeoPoint, Notification, ObjectCoordinates, ObjectType, RiskTier};
use crate::risk;

/// Degrees per latitude/longitude unit
pub const POSITION_SCALE: f64 = 1e-7;
/// m/s per speed unit
pub const SPEED_SCALE: f64 = 0.02;
/// Degrees per heading unit
pub const HEADING_SCALE: f64 = 0.0125;

#[derive(Debug, Clone, Deserialize)]
pub struct CombinedRecord {
    pub psm: Psm,
    pub bsm: Bsm,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Psm {
    pub id: String,
    #[serde(default)]
    pub basic_type: String,
    pub position: PsmPosition,
    pub speed: i64,
    #[serde(default)]
    pub heading: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PsmPosition {
    pub lat: i64,
    pub long: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bsm {
    pub value: BsmValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BsmValue {
    pub core_data: CoreData,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoreData {
    pub lat: i64,
    pub long: i64,
    pub speed: i64,
    pub heading: i64,
}

fn scaled_position(lat: i64, long: i64) -> GeoPoint {
    GeoPoint::new(lat as f64 * POSITION_SCALE, long as f64 * POSITION_SCALE)
}

/// Classify a PSM basic type such as `aPEDESTRIAN` or `aPEDALCYCLIST`
pub fn object_type_from_basic_type(basic_type: &str, fallback: ObjectType) -> ObjectType {
    let upper = basic_type.to_ascii_uppercase();
    if upper.contains("PEDESTRIAN") {
        ObjectType::Human
    } else if upper.contains("CYCLIST") {
        ObjectType::Bike
    } else {
        fallback
    }
}

impl CombinedRecord {
    /// Convert to physical units, locate the object relative to our heading and classify
    pub fn into_notification(self, fallback: ObjectType, received_at: DateTime<Utc>) -> Notification {
        let core = self.bsm.value.core_data;
        let own = scaled_position(core.lat, core.long);
        let own_speed = core.speed as f64 * SPEED_SCALE;
        let own_heading = core.heading as f64 * HEADING_SCALE;

        let object = scaled_position(self.psm.position.lat, self.psm.position.long);
        let object_speed = self.psm.speed as f64 * SPEED_SCALE;

        let mut notification = Notification {
            object_type: object_type_from_basic_type(&self.psm.basic_type, fallback),
            object_id: self.psm.id,
            direction: relative_direction(own, own_heading, object),
            risk_tier: RiskTier::Low,
            self_location: Some(own),
            self_speed: own_speed,
            object_coordinates: Some(ObjectCoordinates {
                position: object,
                speed: Some(object_speed),
            }),
            timestamp: received_at,
        };
        notification.risk_tier = risk::evaluate(&notification);
        notification
    }
}
