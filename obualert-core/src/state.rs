//! Alert State
//!
//! [`ActiveAlert`] is the single alert currently eligible for display. It is
//! owned by the arbitration engine and only ever leaves it as an
//! [`ActiveAlertSnapshot`]. [`ObjectMemory`] remembers the last notification
//! time and tier per object id so tier transitions and out-of-order events can
//! be detected.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::arbitration::ExpiryToken;
use crate::cue::AlertCue;
use crate::model::{Notification, RiskTier};
use crate::risk::time_to_collision;

/// Objects not heard from for this long (relative to the newest event) are forgotten
pub const OBJECT_RETENTION_SECS: i64 = 60;

/// The currently displayed alert
#[derive(Debug, Clone)]
pub struct ActiveAlert {
    /// Latest notification for the active object
    pub notification: Notification,
    /// What was rendered when the alert was installed
    pub cue: AlertCue,
    /// Pending expiry, if one is armed
    pub token: Option<ExpiryToken>,
    /// A visual effect fired for this alert
    pub visual: bool,
    /// An audio effect fired for this alert
    pub audible: bool,
    pub refresh_count: u32,
    pub installed_at: DateTime<Utc>,
}

impl ActiveAlert {
    pub fn new(notification: Notification) -> Self {
        ActiveAlert {
            cue: AlertCue::from(&notification),
            installed_at: notification.timestamp,
            notification,
            token: None,
            visual: false,
            audible: false,
            refresh_count: 0,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.notification.object_id
    }

    pub fn tier(&self) -> RiskTier {
        self.notification.risk_tier
    }

    /// True when something observable was produced and must be stopped later
    pub fn had_effect(&self) -> bool {
        self.visual || self.audible
    }

    pub fn snapshot(&self) -> ActiveAlertSnapshot {
        ActiveAlertSnapshot {
            object_id: self.notification.object_id.clone(),
            cue: self.cue,
            ttc_secs: time_to_collision(&self.notification),
            visual: self.visual,
            audible: self.audible,
            refresh_count: self.refresh_count,
            installed_at: self.installed_at,
            updated_at: self.notification.timestamp,
        }
    }
}

/// Read-only view of the active alert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlertSnapshot {
    pub object_id: String,
    pub cue: AlertCue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttc_secs: Option<f64>,
    pub visual: bool,
    pub audible: bool,
    pub refresh_count: u32,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// When an object was last heard from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRecord {
    pub last_seen: DateTime<Utc>,
}

/// Per-object memory of the last notification
#[derive(Debug, Clone)]
pub struct ObjectMemory {
    entries: HashMap<String, ObjectRecord>,
    newest: Option<DateTime<Utc>>,
    retention: Duration,
}

impl Default for ObjectMemory {
    fn default() -> Self {
        ObjectMemory::with_retention(Duration::seconds(OBJECT_RETENTION_SECS))
    }
}

impl ObjectMemory {
    pub fn new() -> Self {
        ObjectMemory::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        ObjectMemory {
            entries: HashMap::new(),
            newest: None,
            retention,
        }
    }

    pub fn get(&self, object_id: &str) -> Option<&ObjectRecord> {
        self.entries.get(object_id)
    }

    /// Record a notification, returning the previous record for its object
    pub fn observe(&mut self, notification: &Notification) -> Option<ObjectRecord> {
        let record = ObjectRecord {
            last_seen: notification.timestamp,
        };
        let previous = self
            .entries
            .insert(notification.object_id.clone(), record);

        let newest = match self.newest {
            Some(n) if n >= notification.timestamp => n,
            _ => notification.timestamp,
        };
        self.newest = Some(newest);
        self.prune(newest);
        previous
    }

    fn prune(&mut self, newest: DateTime<Utc>) {
        let cutoff = newest - self.retention;
        self.entries.retain(|_, r| r.last_seen >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.newest = None;
    }
}
