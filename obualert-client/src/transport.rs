//! Transports
//!
//! A [`Connector`] opens a [`MessageStream`]; the stream yields batches of
//! complete JSON frames. Two deployments exist:
//!
//! - raw TCP: a continuous byte stream cut into frames by
//!   [`StreamBuffer`](obualert_core::framing::StreamBuffer)
//! - WebSocket: one frame per text or binary message
//!
//! Both reads are cancel safe: dropping a pending `next_frames` future loses
//! no buffered bytes.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use obualert_core::framing::StreamBuffer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ClientError;

const READ_BUFFER_SIZE: usize = 4096;

#[async_trait]
pub trait MessageStream: Send {
    /// Wait for at least one complete frame
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. Calling it
    /// again after that, or after [`close`](MessageStream::close), returns
    /// [`ClientError::Closed`].
    async fn next_frames(&mut self) -> Result<Option<Vec<Vec<u8>>>, ClientError>;

    async fn close(&mut self) -> Result<(), ClientError>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Human readable endpoint, used as the log key
    fn endpoint(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn MessageStream>, ClientError>;
}

// =============================================================================
// Raw TCP
// =============================================================================

#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        TcpConnector {
            host: host.into(),
            port,
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<Box<dyn MessageStream>, ClientError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))??;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpMessageStream::new(stream)))
    }
}

pub struct TcpMessageStream {
    stream: TcpStream,
    buffer: StreamBuffer,
    read_buf: Vec<u8>,
    closed: bool,
}

impl TcpMessageStream {
    pub fn new(stream: TcpStream) -> Self {
        TcpMessageStream {
            stream,
            buffer: StreamBuffer::new(),
            read_buf: vec![0u8; READ_BUFFER_SIZE],
            closed: false,
        }
    }
}

#[async_trait]
impl MessageStream for TcpMessageStream {
    async fn next_frames(&mut self) -> Result<Option<Vec<Vec<u8>>>, ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        loop {
            let len = self.stream.read(&mut self.read_buf).await?;
            if len == 0 {
                self.closed = true;
                return Ok(None);
            }
            self.buffer.extend(&self.read_buf[..len]);
            let frames: Vec<Vec<u8>> = self.buffer.frames().collect();
            if !frames.is_empty() {
                return Ok(Some(frames));
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        if !self.closed {
            self.closed = true;
            self.buffer.clear();
            self.stream.shutdown().await?;
        }
        Ok(())
    }
}

// =============================================================================
// WebSocket
// =============================================================================

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    user_id: i64,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, user_id: i64, connect_timeout: Duration) -> Self {
        WsConnector {
            url: url.into(),
            user_id,
            connect_timeout,
        }
    }

    /// Server URL with the `user_id` query parameter appended
    pub fn request_url(&self) -> Result<String, ClientError> {
        if self.user_id < 0 {
            return Err(ClientError::InvalidUserId(self.user_id));
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}user_id={}", self.url, separator, self.user_id))
    }
}

#[async_trait]
impl Connector for WsConnector {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn connect(&self) -> Result<Box<dyn MessageStream>, ClientError> {
        let url = self.request_url()?;
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))??;
        Ok(Box::new(WsMessageStream { ws, closed: false }))
    }
}

pub struct WsMessageStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl MessageStream for WsMessageStream {
    async fn next_frames(&mut self) -> Result<Option<Vec<Vec<u8>>>, ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        loop {
            let message = match self.ws.next().await {
                Some(message) => message?,
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            };
            match message {
                Message::Text(text) => return Ok(Some(vec![text.as_str().as_bytes().to_vec()])),
                Message::Binary(data) => return Ok(Some(vec![data.to_vec()])),
                Message::Close(_) => {
                    self.closed = true;
                    return Ok(None);
                }
                // Pings are answered by tungstenite on the next read
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        if !self.closed {
            self.closed = true;
            self.ws.close(None).await?;
        }
        Ok(())
    }
}
