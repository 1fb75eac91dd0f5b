//! Alert client
//!
//! [`AlertClient`] wires a [`ConnectionManager`] and a [`Dispatcher`] together
//! and runs each as a tokio task. Stopping is a single idempotent call.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use obualert_client::client::AlertClient;
//! use obualert_client::config::ClientConfig;
//! use obualert_client::surface::LogSurface;
//! use obualert_core::preferences::AlertPreferences;
//!
//! # async fn run() -> Result<(), obualert_client::error::ClientError> {
//! let client = AlertClient::connect(
//!     &ClientConfig::default(),
//!     Arc::new(LogSurface),
//!     Box::new(AlertPreferences::default()),
//! );
//! tokio::signal::ctrl_c().await?;
//! client.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use obualert_core::arbitration::AlertEngine;
use obualert_core::preferences::Preferences;
use obualert_core::protocol::Decoder;
use obualert_core::state::ActiveAlertSnapshot;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientConfig, TransportConfig};
use crate::connection::{ConnectionManager, ConnectionState};
use crate::dispatcher::Dispatcher;
use crate::error::ClientError;
use crate::surface::AlertListener;
use crate::transport::{Connector, TcpConnector, WsConnector};

struct Tasks {
    connection: JoinHandle<Result<(), ClientError>>,
    dispatcher: JoinHandle<()>,
}

pub struct AlertClient {
    cancel: CancellationToken,
    tasks: Mutex<Option<Tasks>>,
    state: watch::Receiver<ConnectionState>,
    active: watch::Receiver<Option<ActiveAlertSnapshot>>,
}

/// Connector for the configured transport
pub fn connector_for(config: &ClientConfig) -> Arc<dyn Connector> {
    match &config.transport {
        TransportConfig::Tcp { host, port } => {
            Arc::new(TcpConnector::new(host.clone(), *port, config.connect_timeout))
        }
        TransportConfig::WebSocket { url, user_id } => {
            Arc::new(WsConnector::new(url.clone(), *user_id, config.connect_timeout))
        }
    }
}

impl AlertClient {
    /// Start a client for the configured transport
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        config: &ClientConfig,
        listener: Arc<dyn AlertListener>,
        preferences: Box<dyn Preferences>,
    ) -> Self {
        AlertClient::start(config, connector_for(config), listener, preferences)
    }

    /// Start a client on an explicit connector
    pub fn start(
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
        listener: Arc<dyn AlertListener>,
        preferences: Box<dyn Preferences>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (active_tx, active_rx) = watch::channel(None);

        let manager = ConnectionManager::new(
            connector,
            Decoder::new(config.decoder.clone()),
            config.reconnect_delay,
            event_tx,
            state_tx,
            cancel.clone(),
        );
        let dispatcher = Dispatcher::new(
            AlertEngine::new(config.arbitration, preferences),
            event_rx,
            listener,
            active_tx,
            cancel.clone(),
        );

        let tasks = Tasks {
            connection: tokio::spawn(manager.run()),
            dispatcher: tokio::spawn(dispatcher.run()),
        };

        AlertClient {
            cancel,
            tasks: Mutex::new(Some(tasks)),
            state: state_rx,
            active: active_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The alert currently displayed, if any
    pub fn active_alert(&self) -> Option<ActiveAlertSnapshot> {
        self.active.borrow().clone()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Option<ActiveAlertSnapshot>> {
        self.active.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop reconnecting, cancel the in-flight read, close the transport,
    /// cancel the pending expiry and clear the active alert
    ///
    /// Returns once both tasks have finished. Calling it again is a no-op.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let Some(tasks) = self.tasks.lock().await.take() else {
            return;
        };

        match tasks.connection.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::debug!("client: connection ended with {}", e),
            Err(e) => log::error!("client: connection task failed: {}", e),
        }
        if let Err(e) = tasks.dispatcher.await {
            log::error!("client: dispatcher task failed: {}", e);
        }
    }

    /// Wait until the connection task gives up on its own
    ///
    /// This only happens for failures that retrying cannot fix.
    pub async fn closed(&self) -> Result<(), ClientError> {
        let mut state = self.state.clone();
        while *state.borrow_and_update() != ConnectionState::ShuttingDown {
            if state.changed().await.is_err() {
                break;
            }
        }
        let Some(tasks) = self.tasks.lock().await.take() else {
            return Ok(());
        };
        let result = match tasks.connection.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Io(std::io::Error::other(e))),
        };
        // The event sender is gone now; the dispatcher drains what is left and exits
        if let Err(e) = tasks.dispatcher.await {
            log::error!("client: dispatcher task failed: {}", e);
        }
        self.cancel.cancel();
        result
    }
}

impl Drop for AlertClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
