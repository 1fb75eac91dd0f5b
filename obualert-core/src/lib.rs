//! obualert core library
//!
//! Platform-independent building blocks for an on-board-unit collision-risk
//! client: frame extraction from a raw stream, wire decoding, risk evaluation
//! and single-alert arbitration with expiry.
//!
//! Nothing in this crate performs I/O, spawns tasks or reads a clock. Callers
//! feed bytes and timestamps in and get notifications and actions out.
//!
//! # Modules
//!
//! - [`framing`]: brace-balanced JSON frame extraction
//! - [`protocol`]: driver-alert and combined PSM/BSM decoding
//! - [`model`]: the domain notification and its enums
//! - [`geo`]: distance, bearing and direction sectors
//! - [`risk`]: time-to-collision and risk tiers
//! - [`preferences`]: per-tier effect switches
//! - [`cue`]: presentation parameters for renderers
//! - [`state`]: active alert and per-object memory
//! - [`arbitration`]: rule table, expiry scheduler and the alert engine

pub mod arbitration;
pub mod cue;
pub mod framing;
pub mod geo;
pub mod model;
pub mod preferences;
pub mod protocol;
pub mod risk;
pub mod state;

pub use arbitration::{Action, AlertEngine, ArbitrationConfig, Decision, Outcome};
pub use cue::AlertCue;
pub use framing::StreamBuffer;
pub use model::{Direction, GeoPoint, Notification, ObjectCoordinates, ObjectType, RiskTier};
pub use preferences::{AlertPreferences, EffectKind, Preferences};
pub use protocol::{DecodeError, Decoder, DecoderConfig, WireFormat};
