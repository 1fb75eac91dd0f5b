//! Expiry Scheduler
//!
//! A single-slot timer. Arming always replaces whatever was pending, and every
//! arming hands out a fresh generation token. Whoever fires the timer later
//! presents the token; a token from an earlier arming is stale and must not
//! touch the alert that replaced it.
//!
//! The scheduler holds deadlines only. The async side sleeps until
//! [`ExpiryScheduler::deadline`] and then calls [`ExpiryScheduler::poll`].
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use obualert_core::arbitration::ExpiryScheduler;
//!
//! let mut scheduler = ExpiryScheduler::new();
//! let start = Instant::now();
//! let first = scheduler.arm(start, Duration::from_secs(5));
//! let second = scheduler.arm(start, Duration::from_secs(5));
//! assert!(!scheduler.is_current(first));
//! assert_eq!(scheduler.poll(start + Duration::from_secs(5)), Some(second));
//! assert_eq!(scheduler.poll(start + Duration::from_secs(10)), None);
//! ```

use std::time::{Duration, Instant};

use crate::model::Notification;
use crate::risk::time_to_collision;

/// Default lifetime of an alert that is not refreshed
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(5);
/// Added to the TTC by [`ExpiryPolicy::TimeToCollision`]
pub const DEFAULT_TTC_MARGIN: Duration = Duration::from_secs(2);
/// Upper bound on any expiry delay
pub const MAX_EXPIRY: Duration = Duration::from_secs(3600);

/// Generation token identifying one arming of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpiryToken(u64);

impl ExpiryToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    token: ExpiryToken,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    generation: u64,
    pending: Option<Pending>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        ExpiryScheduler::default()
    }

    /// Arm the timer to fire `delay` after `now`, cancelling any pending one
    ///
    /// Delays longer than [`MAX_EXPIRY`] are capped.
    pub fn arm(&mut self, now: Instant, delay: Duration) -> ExpiryToken {
        self.generation += 1;
        let token = ExpiryToken(self.generation);
        let deadline = now
            .checked_add(delay.min(MAX_EXPIRY))
            .unwrap_or(now);
        self.pending = Some(Pending { token, deadline });
        token
    }

    /// Cancel the pending timer, returning its token
    pub fn cancel(&mut self) -> Option<ExpiryToken> {
        self.pending.take().map(|p| p.token)
    }

    /// Cancel the pending timer only if it belongs to `token`
    pub fn disarm(&mut self, token: ExpiryToken) -> bool {
        if self.is_current(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_current(&self, token: ExpiryToken) -> bool {
        self.pending.map_or(false, |p| p.token == token)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Fire the timer if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<ExpiryToken> {
        match self.pending {
            Some(p) if p.deadline <= now => {
                self.pending = None;
                Some(p.token)
            }
            _ => None,
        }
    }
}

/// How long an alert stays up after it is shown or refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    Fixed(Duration),
    /// `max(min, ttc + margin)` when TTC is known, else `min`; never above [`MAX_EXPIRY`]
    TimeToCollision { min: Duration, margin: Duration },
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        ExpiryPolicy::Fixed(DEFAULT_EXPIRY)
    }
}

impl ExpiryPolicy {
    /// TTC-based policy with the usual 5 s floor and 2 s margin
    pub fn time_to_collision() -> Self {
        ExpiryPolicy::TimeToCollision {
            min: DEFAULT_EXPIRY,
            margin: DEFAULT_TTC_MARGIN,
        }
    }

    pub fn delay_for(&self, notification: &Notification) -> Duration {
        match *self {
            ExpiryPolicy::Fixed(delay) => delay,
            ExpiryPolicy::TimeToCollision { min, margin } => {
                match time_to_collision(notification) {
                    Some(ttc) if ttc >= 0.0 => {
                        let ttc = Duration::try_from_secs_f64(ttc).unwrap_or(MAX_EXPIRY);
                        min.max(ttc.saturating_add(margin)).min(MAX_EXPIRY)
                    }
                    _ => min,
                }
            }
        }
    }
}
