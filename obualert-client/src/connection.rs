//! Connection Manager
//!
//! Owns the transport: connects, reads frames, decodes them and hands the
//! resulting notifications to the dispatcher over an unbounded channel. Any
//! transport failure is answered by waiting the reconnect delay and trying
//! again, for as long as the client runs.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Closed | Disconnected
//!      ^                                            |
//!      +------------ reconnect delay ---------------+
//! ```
//!
//! `ShuttingDown` is entered from any state once the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use obualert_core::model::Notification;
use obualert_core::protocol::Decoder;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::transport::{Connector, MessageStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The peer closed the connection
    Closed,
    ShuttingDown,
}

/// Advisory connectivity status for the notification surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting { attempt: u64 },
    Connected,
    Error(String),
}

/// What the connection worker hands to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Notification(Notification),
    Status(ConnectionStatus),
}

pub struct ConnectionManager {
    key: String,
    connector: Arc<dyn Connector>,
    decoder: Decoder,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<Event>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        decoder: Decoder,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<Event>,
        state: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) -> Self {
        ConnectionManager {
            key: connector.endpoint(),
            connector,
            decoder,
            reconnect_delay,
            events,
            state,
            cancel,
            attempts: 0,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn status(&self, status: ConnectionStatus) {
        // The dispatcher may already be gone during shutdown
        let _ = self.events.send(Event::Status(status));
    }

    /// Run the reconnect loop until cancelled
    ///
    /// Returns an error only for failures that retrying cannot fix, such as
    /// an invalid user id.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let result = self.reconnect_loop().await;
        self.set_state(ConnectionState::ShuttingDown);
        match result {
            Err(ClientError::Shutdown) => {
                log::debug!("{}: shutdown", self.key);
                Ok(())
            }
            other => other,
        }
    }

    async fn reconnect_loop(&mut self) -> Result<(), ClientError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ClientError::Shutdown);
            }

            self.attempts += 1;
            self.set_state(ConnectionState::Connecting);
            self.status(ConnectionStatus::Connecting {
                attempt: self.attempts,
            });
            log::debug!("{}: connecting (attempt {})", self.key, self.attempts);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ClientError::Shutdown),
                r = self.connector.connect() => r,
            };

            let reason = match connected {
                Ok(stream) => {
                    log::info!("{}: connected", self.key);
                    self.set_state(ConnectionState::Connected);
                    self.status(ConnectionStatus::Connected);
                    match self.read_loop(stream).await {
                        Ok(()) => {
                            self.set_state(ConnectionState::Closed);
                            ClientError::Closed.to_string()
                        }
                        Err(ClientError::Shutdown) => return Err(ClientError::Shutdown),
                        Err(e) => {
                            self.set_state(ConnectionState::Disconnected);
                            e.to_string()
                        }
                    }
                }
                Err(e) if !e.is_retryable() => {
                    log::error!("{}: {}", self.key, e);
                    self.set_state(ConnectionState::Disconnected);
                    self.status(ConnectionStatus::Error(e.to_string()));
                    return Err(e);
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    e.to_string()
                }
            };

            log::warn!(
                "{}: {}, reconnecting in {}s",
                self.key,
                reason,
                self.reconnect_delay.as_secs()
            );
            self.status(ConnectionStatus::Error(format!(
                "{}, reconnecting in {}s",
                reason,
                self.reconnect_delay.as_secs()
            )));

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ClientError::Shutdown),
                _ = sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Read until the peer closes, the transport fails or shutdown is requested
    ///
    /// The stream is closed on every exit path and never read again.
    async fn read_loop(&mut self, mut stream: Box<dyn MessageStream>) -> Result<(), ClientError> {
        let result = loop {
            let frames = tokio::select! {
                _ = self.cancel.cancelled() => break Err(ClientError::Shutdown),
                r = stream.next_frames() => r,
            };
            match frames {
                Ok(Some(frames)) => {
                    if let Err(e) = self.dispatch_frames(frames) {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = stream.close().await {
            log::debug!("{}: error closing transport: {}", self.key, e);
        }
        result
    }

    fn dispatch_frames(&self, frames: Vec<Vec<u8>>) -> Result<(), ClientError> {
        for frame in frames {
            log::trace!("{}: frame {}", self.key, String::from_utf8_lossy(&frame));
            match self.decoder.decode(&frame, Utc::now()) {
                Ok(notification) => {
                    if self.events.send(Event::Notification(notification)).is_err() {
                        return Err(ClientError::Shutdown);
                    }
                }
                Err(e) => {
                    log::debug!("{}: dropping frame: {}", self.key, e);
                }
            }
        }
        Ok(())
    }
}
