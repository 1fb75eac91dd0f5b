//! Message Decoder
//!
//! Turns one complete wire JSON object into a domain [`Notification`].
//! Two deployment shapes exist:
//!
//! - [`driver_alert`]: a flat record already classified by the server
//! - [`combined`]: a J2735-style PSM (tracked object) and BSM (own vehicle)
//!   pair in scaled integer units, classified locally
//!
//! No I/O happens here; the caller supplies the bytes and the receive time.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use obualert_core::model::{Direction, RiskTier};
//! use obualert_core::protocol::Decoder;
//!
//! let frame = br#"{"driver_data":{"object_id":"p1","risk_level":"HIGH",
//!     "object_direction":"left","object_type":"bike",
//!     "object_coordinates":{"latitude":-23.5,"longitude":-46.6,"speed":3.0}},
//!     "location":{"latitude":-23.5001,"longitude":-46.6},"driver_speed":8.0,
//!     "timestamp":"2025-06-01T12:00:00Z"}"#;
//!
//! let n = Decoder::default().decode(frame, Utc::now()).unwrap();
//! assert_eq!(n.object_id, "p1");
//! assert_eq!(n.direction, Direction::Left);
//! assert_eq!(n.risk_tier, RiskTier::High);
//! ```

pub mod combined;
pub mod driver_alert;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::model::{Notification, ObjectType};

/// Errors produced while decoding a single frame
///
/// None of these are fatal to the stream: the frame is dropped and the
/// caller carries on with the next one.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
    #[error("unrecognised message shape")]
    UnknownShape,
}

/// Which record shape the deployment sends
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum WireFormat {
    /// Combined record when both `psm` and `bsm` are present, else driver-alert
    #[default]
    Auto,
    DriverAlert,
    Combined,
}

/// Decoder settings
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub format: WireFormat,
    /// Object type for a PSM whose basic type names neither a pedestrian nor a cyclist
    pub fallback_object_type: ObjectType,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            format: WireFormat::Auto,
            fallback_object_type: ObjectType::Human,
        }
    }
}

/// Stateless frame decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Decoder { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one frame received at `received_at`
    ///
    /// Combined records carry no usable wall-clock time and are stamped with
    /// `received_at`.
    pub fn decode(
        &self,
        frame: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<Notification, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(frame)?;
        let object = value.as_object().ok_or(DecodeError::UnknownShape)?;

        let format = match self.config.format {
            WireFormat::Auto => {
                if object.contains_key("psm") && object.contains_key("bsm") {
                    WireFormat::Combined
                } else if object.contains_key("driver_data") || object.contains_key("location") {
                    WireFormat::DriverAlert
                } else {
                    return Err(DecodeError::UnknownShape);
                }
            }
            explicit => explicit,
        };

        match format {
            WireFormat::Combined => {
                let record: combined::CombinedRecord = serde_json::from_value(value)?;
                Ok(record.into_notification(self.config.fallback_object_type, received_at))
            }
            _ => {
                let record: driver_alert::DriverAlertRecord = serde_json::from_value(value)?;
                record.into_notification(received_at)
            }
        }
    }
}
