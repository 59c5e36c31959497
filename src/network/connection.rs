use crate::messages::wire::{FramedMessage, WireConfig, WireProtocolError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error(transparent)]
    Wire(#[from] WireProtocolError),

    #[error("No message received for {timeout:?}")]
    IdleTimeout { timeout: Duration },
}

impl ConnectionError {
    /// A bad payload inside an intact frame; the stream is still usable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConnectionError::Wire(e) if e.is_recoverable())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionError::Wire(WireProtocolError::ConnectionClosed))
    }
}

/// Receiving side of a connection
#[derive(Debug)]
pub struct FrameReader {
    half: OwnedReadHalf,
    framed: FramedMessage,
}

impl FrameReader {
    /// Wait for the next message. With an `idle_timeout`, silence longer than
    /// that ends the wait with [`ConnectionError::IdleTimeout`].
    pub async fn receive<T: DeserializeOwned>(
        &mut self,
        idle_timeout: Option<Duration>,
    ) -> Result<T, ConnectionError> {
        let read = self.framed.read_message(&mut self.half);
        match idle_timeout {
            Some(timeout) => tokio::time::timeout(timeout, read)
                .await
                .map_err(|_| ConnectionError::IdleTimeout { timeout })?
                .map_err(Into::into),
            None => read.await.map_err(Into::into),
        }
    }
}

/// Sending side of a connection
#[derive(Debug)]
pub struct FrameWriter {
    half: OwnedWriteHalf,
    framed: FramedMessage,
}

impl FrameWriter {
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), ConnectionError> {
        self.framed.write_message(&mut self.half, message).await?;
        Ok(())
    }

    /// Flush and shut down the write side
    pub async fn close(mut self) -> Result<(), ConnectionError> {
        self.half.shutdown().await.map_err(WireProtocolError::from)?;
        Ok(())
    }
}

/// A framed TCP stream. Split it to read and write from separate tasks.
#[derive(Debug)]
pub struct Connection {
    reader: FrameReader,
    writer: FrameWriter,
    peer_addr: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, wire_config: WireConfig) -> Result<Self, ConnectionError> {
        let peer_addr = stream.peer_addr().map_err(WireProtocolError::from)?;
        let framed = FramedMessage::new(wire_config);
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FrameReader {
                half: read_half,
                framed: framed.clone(),
            },
            writer: FrameWriter {
                half: write_half,
                framed,
            },
            peer_addr,
        })
    }

    #[instrument(level = "debug", skip(addr, wire_config))]
    pub async fn connect(
        addr: impl ToSocketAddrs,
        wire_config: WireConfig,
    ) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(WireProtocolError::from)?;
        let connection = Self::new(stream, wire_config)?;
        debug!("Connected to {}", connection.peer_addr);
        Ok(connection)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), ConnectionError> {
        self.writer.send(message).await
    }

    pub async fn receive<T: DeserializeOwned>(
        &mut self,
        idle_timeout: Option<Duration>,
    ) -> Result<T, ConnectionError> {
        self.reader.receive(idle_timeout).await
    }

    pub fn split(self) -> (FrameReader, FrameWriter) {
        (self.reader, self.writer)
    }
}
