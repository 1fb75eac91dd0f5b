//! obualert client
//!
//! Native tokio client for an on-board unit that streams collision-risk
//! telemetry. The connection worker reads and decodes frames; a single
//! dispatcher task runs arbitration and expiry and drives the
//! [`AlertListener`](surface::AlertListener) collaborators.
//!
//! ```text
//! Connector -> ConnectionManager --mpsc--> Dispatcher(AlertEngine) -> AlertListener
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod surface;
pub mod transport;

pub use client::AlertClient;
pub use config::{Cli, ClientConfig, TransportConfig};
pub use connection::{ConnectionState, ConnectionStatus, Event};
pub use error::ClientError;
pub use surface::{AlertListener, JsonLinesSurface, LogSurface};
