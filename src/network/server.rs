use crate::config::ServerConfig;
use crate::game::PlayerId;
use crate::messages::{ClientMessage, ServerMessage};
use crate::network::{Connection, ConnectionError, Lobby, Outgoing};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

/// Everything the lobby task reacts to, in arrival order
#[derive(Debug)]
enum LobbyEvent {
    Connected {
        player: PlayerId,
        outbox: Sender<ServerMessage>,
    },
    Message {
        player: PlayerId,
        message: ClientMessage,
    },
    Disconnected {
        player: PlayerId,
    },
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind server to address: {}", config.bind_addr))?;

        info!("Server successfully bound to address: {}", config.bind_addr);
        debug!(
            "Wire config - max_message_size: {}, write_timeout_secs: {}, idle_timeout_secs: {:?}",
            config.max_message_size, config.write_timeout_secs, config.idle_timeout_secs
        );

        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Serve until the process is killed
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drop every connection
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("Starting server on address: {:?}", self.listener.local_addr()?);

        let (events, event_rx) = mpsc::unbounded_channel();
        let lobby = Lobby::new(self.config.grace_period());
        let lobby_task = task::spawn(run_lobby(lobby, event_rx, self.config.purge_interval()));

        let mut active_connections: HashMap<PlayerId, JoinHandle<()>> = HashMap::new();
        let mut player_counter = 0u64;
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing {} connections", active_connections.len());
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            active_connections.retain(|player, handle| {
                if handle.is_finished() {
                    debug!("Cleaning up completed connection {}", player);
                    false
                } else {
                    true
                }
            });

            if active_connections.len() >= self.config.max_connections {
                warn!(
                    "Connection limit reached ({}), rejecting connection from {}",
                    self.config.max_connections, peer_addr
                );
                continue;
            }

            player_counter += 1;
            let player = PlayerId(player_counter);
            info!("Accepted connection from {} as {}", peer_addr, player);

            let events = events.clone();
            let config = self.config.clone();
            let handle = task::spawn(async move {
                if let Err(e) = handle_connection(stream, player, events, config).await {
                    error!("Connection {} failed: {:#}", player, e);
                }
            });
            active_connections.insert(player, handle);
        }

        for (_, handle) in active_connections {
            handle.abort();
        }
        lobby_task.abort();
        Ok(())
    }
}

/// Read frames from one player and forward them to the lobby. Replies are
/// written by a separate task draining the player's outbox.
#[instrument(skip(stream, events, config), fields(player = %player))]
async fn handle_connection(
    stream: TcpStream,
    player: PlayerId,
    events: UnboundedSender<LobbyEvent>,
    config: ServerConfig,
) -> Result<()> {
    let connection = Connection::new(stream, config.wire_config())
        .context("Failed to set up connection")?;
    let (mut reader, mut writer) = connection.split();

    // The lobby holds the only strong sender, so the writer stops as soon
    // as the lobby drops this player.
    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMessage>(config.outbox_capacity);
    let replies = outbox.downgrade();
    events
        .send(LobbyEvent::Connected { player, outbox })
        .context("Lobby is not running")?;

    let mut writer_task = task::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            debug!("Sending {} to {}", message.message_type(), player);
            if let Err(e) = writer.send(&message).await {
                warn!("Failed to write to {}: {}", player, e);
                return;
            }
        }
        if let Err(e) = writer.close().await {
            debug!("Error closing write side for {}: {}", player, e);
        }
    });

    let idle_timeout = config.idle_timeout();
    let mut writer_finished = false;
    loop {
        let received = tokio::select! {
            received = reader.receive::<ClientMessage>(idle_timeout) => received,
            _ = &mut writer_task => {
                info!("Stopped writing to {}, disconnecting", player);
                writer_finished = true;
                break;
            }
        };

        match received {
            Ok(message) => {
                debug!("Received {} from {}", message.message_type(), player);
                if events.send(LobbyEvent::Message { player, message }).is_err() {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!("Unparseable message from {}: {}", player, e);
                let reply = ServerMessage::error(format!("Invalid message: {}", e));
                if let Some(outbox) = replies.upgrade() {
                    if outbox.try_send(reply).is_err() {
                        warn!("Outbox for {} is full, dropping error reply", player);
                    }
                }
            }
            Err(ConnectionError::IdleTimeout { timeout }) => {
                info!("{} idle for {:?}, disconnecting", player, timeout);
                break;
            }
            Err(e) if e.is_closed() => {
                info!("Connection {} closed by peer", player);
                break;
            }
            Err(e) => {
                warn!("Error receiving from {}: {}", player, e);
                break;
            }
        }
    }

    // Once the lobby forgets this player the writer drains what is left
    // and closes.
    let _ = events.send(LobbyEvent::Disconnected { player });
    if !writer_finished {
        if let Err(e) = writer_task.await {
            debug!("Writer task for {} ended abnormally: {}", player, e);
        }
    }
    Ok(())
}

/// Owns all game state. Events are applied one at a time, so two requests
/// touching the same session can never interleave.
async fn run_lobby(
    mut lobby: Lobby,
    mut events: UnboundedReceiver<LobbyEvent>,
    purge_interval: Duration,
) {
    let mut outboxes: HashMap<PlayerId, Sender<ServerMessage>> = HashMap::new();
    let mut purge = tokio::time::interval(purge_interval);
    purge.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let outgoing = match event {
                    LobbyEvent::Connected { player, outbox } => {
                        outboxes.insert(player, outbox);
                        Vec::new()
                    }
                    LobbyEvent::Message { player, message } => {
                        lobby.handle(player, message, Instant::now())
                    }
                    LobbyEvent::Disconnected { player } => {
                        outboxes.remove(&player);
                        lobby.disconnect(player)
                    }
                };
                deliver(&mut outboxes, outgoing);
            }
            _ = purge.tick() => {
                lobby.purge_expired(Instant::now());
            }
        }
    }
    debug!("Lobby stopped");
}

/// Queue each message on its recipient's outbox. A player whose outbox is
/// full has stopped reading; dropping their sender ends the connection,
/// which then comes back as a regular disconnect.
fn deliver(outboxes: &mut HashMap<PlayerId, Sender<ServerMessage>>, outgoing: Vec<Outgoing>) {
    for Outgoing { to, message } in outgoing {
        let Some(outbox) = outboxes.get(&to) else {
            debug!("{} is no longer connected, dropping {}", to, message.message_type());
            continue;
        };
        match outbox.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(
                    "Outbox for {} is full, dropping {} and the connection",
                    to,
                    message.message_type()
                );
                outboxes.remove(&to);
            }
            Err(TrySendError::Closed(_)) => debug!("Outbox for {} already closed", to),
        }
    }
}
