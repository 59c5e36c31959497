use crate::messages::wire::WireConfig;
use crate::messages::{ClientMessage, ServerMessage};
use crate::network::Connection;
use anyhow::{Context, Result};
use tokio::net::ToSocketAddrs;
use tracing::debug;

/// Minimal player-side connection, mostly for driving a server from tests
pub struct Client {
    connection: Connection,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let connection = Connection::connect(addr, WireConfig::default())
            .await
            .context("Failed to connect to server")?;
        Ok(Self { connection })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        debug!("Sending {}", message.message_type());
        self.connection
            .send(message)
            .await
            .with_context(|| format!("Failed to send {}", message.message_type()))
    }

    pub async fn recv(&mut self) -> Result<ServerMessage> {
        let message: ServerMessage = self
            .connection
            .receive(None)
            .await
            .context("Failed to receive server message")?;
        debug!("Received {}", message.message_type());
        Ok(message)
    }
}
