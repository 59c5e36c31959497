use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, instrument, trace, warn};

// Wire protocol constants
pub const LENGTH_PREFIX_SIZE: usize = 4; // 4 bytes for u32 length prefix
pub const MIN_MESSAGE_SIZE: usize = 1;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64KB, a redacted board is well under 4KB
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for wire protocol operations
#[derive(Debug, Clone)]
pub struct WireConfig {
    pub max_message_size: usize,
    pub write_timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl WireConfig {
    pub fn new(max_message_size: usize, write_timeout: Duration) -> Self {
        Self {
            max_message_size,
            write_timeout,
        }
    }
}

/// Custom error types for wire protocol operations
#[derive(Error, Debug)]
pub enum WireProtocolError {
    #[error("Message too large: {size} bytes exceeds maximum of {max_size} bytes")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Message too small: {size} bytes is below minimum of {min_size} bytes")]
    MessageTooSmall { size: usize, min_size: usize },

    #[error("Write operation timed out after {timeout:?}")]
    WriteTimeout { timeout: Duration },

    #[error("Malformed message: {reason}")]
    Malformed { reason: String },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireProtocolError {
    /// Whether the connection can keep going after this error. Only a
    /// well-framed message with a bad payload qualifies.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WireProtocolError::Malformed { .. })
    }
}

/// Length-prefixed JSON framing: a 4-byte big-endian length followed by
/// that many bytes of UTF-8 JSON.
#[derive(Debug, Clone, Default)]
pub struct FramedMessage {
    wire_config: WireConfig,
}

impl FramedMessage {
    pub fn new(wire_config: WireConfig) -> Self {
        Self { wire_config }
    }

    pub fn wire_config(&self) -> &WireConfig {
        &self.wire_config
    }

    fn validate_message_size(&self, size: usize) -> Result<(), WireProtocolError> {
        if size < MIN_MESSAGE_SIZE {
            warn!(size, "Message size is below minimum threshold");
            return Err(WireProtocolError::MessageTooSmall {
                size,
                min_size: MIN_MESSAGE_SIZE,
            });
        }

        if size > self.wire_config.max_message_size {
            error!(
                size,
                max_size = self.wire_config.max_message_size,
                "Message size exceeds maximum allowed size"
            );
            return Err(WireProtocolError::MessageTooLarge {
                size,
                max_size: self.wire_config.max_message_size,
            });
        }

        Ok(())
    }

    /// Serialize and write one message, bounded by the write timeout
    #[instrument(level = "debug", skip(self, writer, message))]
    pub async fn write_message<T: Serialize>(
        &self,
        writer: &mut (impl AsyncWrite + Unpin),
        message: &T,
    ) -> Result<(), WireProtocolError> {
        let payload = serde_json::to_vec(message)?;
        self.validate_message_size(payload.len())?;

        let timeout = self.wire_config.write_timeout;
        tokio::time::timeout(timeout, async {
            let length_prefix = (payload.len() as u32).to_be_bytes();
            writer.write_all(&length_prefix).await?;
            writer.write_all(&payload).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| WireProtocolError::WriteTimeout { timeout })??;

        trace!("Wrote {} byte frame", payload.len());
        Ok(())
    }

    /// Read one raw frame. A clean EOF before the length prefix is reported
    /// as [`WireProtocolError::ConnectionClosed`].
    #[instrument(level = "debug", skip(self, reader))]
    pub async fn read_frame(
        &self,
        reader: &mut (impl AsyncRead + Unpin),
    ) -> Result<Vec<u8>, WireProtocolError> {
        let mut length_buffer = [0u8; LENGTH_PREFIX_SIZE];
        match reader.read_exact(&mut length_buffer).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(WireProtocolError::ConnectionClosed);
            }
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_be_bytes(length_buffer) as usize;
        self.validate_message_size(length)?;

        let mut payload = vec![0u8; length];
        reader.read_exact(&mut payload).await?;
        debug!("Read {} byte frame", length);
        Ok(payload)
    }

    /// Decode a frame payload
    pub fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, WireProtocolError> {
        serde_json::from_slice(payload).map_err(|e| WireProtocolError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Read and decode one message
    pub async fn read_message<T: DeserializeOwned>(
        &self,
        reader: &mut (impl AsyncRead + Unpin),
    ) -> Result<T, WireProtocolError> {
        let payload = self.read_frame(reader).await?;
        self.decode(&payload)
    }
}
