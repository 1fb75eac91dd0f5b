//! Collaborator surface
//!
//! Renderers, audio players and status displays implement [`AlertListener`].
//! All calls come from the dispatcher task, one at a time, in order; they
//! should return quickly.

use std::io::Write;
use std::sync::Mutex;

use obualert_core::cue::AlertCue;
use obualert_core::model::{Direction, ObjectType, RiskTier};
use serde::Serialize;

pub trait AlertListener: Send + Sync {
    fn on_connecting(&self, _attempt: u64) {}

    fn on_connected(&self);

    fn on_connection_error(&self, reason: &str);

    fn on_display_alert(&self, direction: Direction, tier: RiskTier, object_type: ObjectType);

    fn on_play_sound(&self, _cue: &AlertCue) {}

    fn on_stop_alert(&self, direction: Direction);
}

/// Writes every collaborator call to the log
#[derive(Debug, Default)]
pub struct LogSurface;

impl AlertListener for LogSurface {
    fn on_connecting(&self, attempt: u64) {
        log::debug!("surface: connecting (attempt {})", attempt);
    }

    fn on_connected(&self) {
        log::info!("surface: connected to OBU");
    }

    fn on_connection_error(&self, reason: &str) {
        log::warn!("surface: {}", reason);
    }

    fn on_display_alert(&self, direction: Direction, tier: RiskTier, object_type: ObjectType) {
        let cue = AlertCue {
            direction,
            tier,
            object_type,
        };
        log::info!(
            "surface: {} {} alert, {} edge, {} pulsing every {} ms",
            tier,
            object_type,
            cue.edge(),
            cue.color(),
            cue.pulse_period_ms()
        );
    }

    fn on_play_sound(&self, cue: &AlertCue) {
        log::info!("surface: play {}", cue.sound_clip());
    }

    fn on_stop_alert(&self, direction: Direction) {
        log::info!("surface: stop {} alert", direction);
    }
}

/// One line of JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Connecting {
        attempt: u64,
    },
    Connected,
    ConnectionError {
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    Display {
        direction: Direction,
        tier: RiskTier,
        object_type: ObjectType,
        edge: String,
        intensity: u8,
        color: &'static str,
        pulse_ms: u32,
        blink_ms: u32,
    },
    Sound {
        clip: String,
    },
    Stop {
        direction: Direction,
    },
}

/// Prints collaborator calls as JSON lines for an external renderer process
pub struct JsonLinesSurface<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        JsonLinesSurface::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSurface<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSurface {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: SurfaceEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                log::error!("surface: cannot serialise {:?}: {}", event, e);
                return;
            }
        };
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            log::warn!("surface: write failed: {}", e);
        }
    }
}

impl<W: Write + Send> AlertListener for JsonLinesSurface<W> {
    fn on_connecting(&self, attempt: u64) {
        self.emit(SurfaceEvent::Connecting { attempt });
    }

    fn on_connected(&self) {
        self.emit(SurfaceEvent::Connected);
    }

    fn on_connection_error(&self, reason: &str) {
        self.emit(SurfaceEvent::ConnectionError {
            reason: reason.to_string(),
        });
    }

    fn on_display_alert(&self, direction: Direction, tier: RiskTier, object_type: ObjectType) {
        let cue = AlertCue {
            direction,
            tier,
            object_type,
        };
        self.emit(SurfaceEvent::Display {
            direction,
            tier,
            object_type,
            edge: cue.edge().to_string(),
            intensity: cue.intensity(),
            color: cue.color(),
            pulse_ms: cue.pulse_period_ms(),
            blink_ms: cue.blink_period_ms(),
        });
    }

    fn on_play_sound(&self, cue: &AlertCue) {
        self.emit(SurfaceEvent::Sound {
            clip: cue.sound_clip(),
        });
    }

    fn on_stop_alert(&self, direction: Direction) {
        self.emit(SurfaceEvent::Stop { direction });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines() {
        let surface = JsonLinesSurface::new(Vec::new());
        surface.on_connected();
        surface.on_display_alert(Direction::Left, RiskTier::High, ObjectType::Bike);
        surface.on_play_sound(&AlertCue {
            direction: Direction::Front,
            tier: RiskTier::Medium,
            object_type: ObjectType::Human,
        });
        surface.on_stop_alert(Direction::Left);
        surface.on_connection_error("Connection closed by peer, reconnecting in 15s");

        let out = String::from_utf8(surface.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0]["event"], "connected");
        assert_eq!(lines[1]["event"], "display");
        assert_eq!(lines[1]["direction"], "left");
        assert_eq!(lines[1]["tier"], "high");
        assert_eq!(lines[1]["objectType"], "bike");
        assert_eq!(lines[1]["color"], "red");
        assert_eq!(lines[1]["pulseMs"], 300);
        assert_eq!(lines[2]["clip"], "top_human_medium");
        assert_eq!(lines[3]["event"], "stop");
        assert_eq!(lines[4]["event"], "connection_error");
    }
}
