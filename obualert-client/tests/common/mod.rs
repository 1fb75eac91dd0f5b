#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use obualert_client::error::ClientError;
use obualert_client::surface::AlertListener;
use obualert_client::transport::{Connector, MessageStream};
use obualert_core::cue::AlertCue;
use obualert_core::model::{Direction, ObjectType, RiskTier};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Connecting(u64),
    Connected,
    Error(String),
    Display(Direction, RiskTier, ObjectType),
    Sound(String),
    Stop(Direction),
}

impl Recorded {
    pub fn is_effect(&self) -> bool {
        matches!(
            self,
            Recorded::Display(..) | Recorded::Sound(_) | Recorded::Stop(_)
        )
    }
}

#[derive(Debug, Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<Recorded>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingListener::default())
    }

    fn push(&self, call: Recorded) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn effects(&self) -> Vec<Recorded> {
        self.calls().into_iter().filter(Recorded::is_effect).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Recorded::Error(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// Poll until `pred` holds, giving up after `timeout`
    pub async fn wait_for(&self, timeout: Duration, pred: impl Fn(&[Recorded]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.calls()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl AlertListener for RecordingListener {
    fn on_connecting(&self, attempt: u64) {
        self.push(Recorded::Connecting(attempt));
    }

    fn on_connected(&self) {
        self.push(Recorded::Connected);
    }

    fn on_connection_error(&self, reason: &str) {
        self.push(Recorded::Error(reason.to_string()));
    }

    fn on_display_alert(&self, direction: Direction, tier: RiskTier, object_type: ObjectType) {
        self.push(Recorded::Display(direction, tier, object_type));
    }

    fn on_play_sound(&self, cue: &AlertCue) {
        self.push(Recorded::Sound(cue.sound_clip()));
    }

    fn on_stop_alert(&self, direction: Direction) {
        self.push(Recorded::Stop(direction));
    }
}

/// What a scripted stream does once its frames run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFrames {
    /// Stay connected without sending anything
    Idle,
    /// Peer closes the connection
    Eof,
}

/// Connector that refuses the first `failures` attempts, then hands out scripted streams
pub struct ScriptedConnector {
    failures: usize,
    frames: Vec<Vec<u8>>,
    after: AfterFrames,
    hang: bool,
    attempts: Mutex<Vec<Instant>>,
    reads_after_close: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(failures: usize, frames: Vec<Vec<u8>>, after: AfterFrames) -> Arc<Self> {
        Arc::new(ScriptedConnector {
            failures,
            frames,
            after,
            hang: false,
            attempts: Mutex::new(Vec::new()),
            reads_after_close: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// A connector whose connect never completes
    pub fn hanging() -> Arc<Self> {
        Arc::new(ScriptedConnector {
            failures: 0,
            frames: Vec::new(),
            after: AfterFrames::Idle,
            hang: true,
            attempts: Mutex::new(Vec::new()),
            reads_after_close: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn reads_after_close(&self) -> usize {
        self.reads_after_close.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn endpoint(&self) -> String {
        "scripted".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn MessageStream>, ClientError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len()
        };
        if self.hang {
            std::future::pending::<()>().await;
        }
        if attempt <= self.failures {
            return Err(ClientError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }
        Ok(Box::new(ScriptedStream {
            frames: self.frames.iter().cloned().collect(),
            after: self.after,
            closed: false,
            eof: false,
            reads_after_close: self.reads_after_close.clone(),
        }))
    }
}

pub struct ScriptedStream {
    frames: VecDeque<Vec<u8>>,
    after: AfterFrames,
    closed: bool,
    eof: bool,
    reads_after_close: Arc<AtomicUsize>,
}

#[async_trait]
impl MessageStream for ScriptedStream {
    async fn next_frames(&mut self) -> Result<Option<Vec<Vec<u8>>>, ClientError> {
        if self.closed || self.eof {
            self.reads_after_close.fetch_add(1, Ordering::SeqCst);
            return Err(ClientError::Closed);
        }
        if let Some(frame) = self.frames.pop_front() {
            return Ok(Some(vec![frame]));
        }
        match self.after {
            AfterFrames::Eof => {
                self.eof = true;
                Ok(None)
            }
            AfterFrames::Idle => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closed = true;
        Ok(())
    }
}

/// Driver-alert frame for `object_id` at `tier`, `secs` after a fixed base time
pub fn driver_alert(object_id: &str, tier: &str, direction: &str, object_type: &str, secs: u32) -> Vec<u8> {
    format!(
        r#"{{"driver_data":{{"object_id":"{}","risk_level":"{}","object_direction":"{}","object_type":"{}",
            "object_coordinates":{{"latitude":-23.5500,"longitude":-46.6300,"speed":1.5}}}},
            "location":{{"latitude":-23.5505,"longitude":-46.6300}},"driver_speed":8.0,
            "timestamp":"2025-06-01T12:00:{:02}Z"}}"#,
        object_id, tier, direction, object_type, secs
    )
    .into_bytes()
}
