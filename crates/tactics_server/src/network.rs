//! In-process transport.
//!
//! Clients and the coordinator exchange encoded frames over tokio
//! unbounded channels. Every client owns one outbound sender into the
//! shared server inbox and one receiver for its own frames; dropping the
//! server's sender for a connection is how the server closes it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tactics_core::client::{ClientPhase, ClientSession, GameOutcome};
use tactics_core::data::GameData;
use tactics_core::protocol::{ClientBound, ServerBound};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::coordinator::{MatchCoordinator, Outbound, ServerPhase};
use crate::error::{Result, ServerError};
use crate::player::ConnectionId;

/// Event delivered to the server loop.
#[derive(Debug)]
pub enum ServerEvent {
    /// An encoded [`ServerBound`] frame.
    Frame {
        /// Sender.
        connection: ConnectionId,
        /// Frame bytes.
        bytes: Vec<u8>,
    },
    /// The client went away.
    Disconnected {
        /// Connection that closed.
        connection: ConnectionId,
    },
}

/// Client end of a connection.
#[derive(Debug)]
pub struct ClientLink {
    /// Id the server knows this client by.
    pub connection: ConnectionId,
    /// Frames to the server.
    pub outbound: UnboundedSender<ServerEvent>,
    /// Frames from the server. Closes when the server drops the connection.
    pub inbound: UnboundedReceiver<Vec<u8>>,
}

impl ClientLink {
    /// Encode and send one message.
    ///
    /// # Errors
    ///
    /// Returns an encoding error or [`ServerError::TransportClosed`].
    pub fn send(&self, message: &ServerBound) -> Result<()> {
        let bytes = message.encode()?;
        self.outbound
            .send(ServerEvent::Frame {
                connection: self.connection,
                bytes,
            })
            .map_err(|_| ServerError::TransportClosed)
    }

    /// Tell the server this client is gone.
    pub fn close(&self) {
        // The server may already have shut down.
        let _ = self.outbound.send(ServerEvent::Disconnected {
            connection: self.connection,
        });
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Winning player, if one survived.
    pub winner: Option<i32>,
    /// Battle phases played.
    pub rounds: u32,
    /// Server frames run.
    pub frames: u64,
}

/// Server half of an in-process session.
#[derive(Debug)]
pub struct LocalServer {
    coordinator: MatchCoordinator,
    frame_seconds: f64,
    realtime: bool,
    inbox: UnboundedReceiver<ServerEvent>,
    inbox_sender: UnboundedSender<ServerEvent>,
    clients: BTreeMap<ConnectionId, UnboundedSender<Vec<u8>>>,
}

impl LocalServer {
    /// Create a server in the pregame phase.
    #[must_use]
    pub fn new(config: ServerConfig, data: Arc<GameData>) -> Self {
        let (inbox_sender, inbox) = unbounded_channel();
        Self {
            frame_seconds: config.frame_seconds(),
            realtime: config.realtime,
            coordinator: MatchCoordinator::new(config, data),
            inbox,
            inbox_sender,
            clients: BTreeMap::new(),
        }
    }

    /// Open a connection for a new client.
    pub fn connect(&mut self) -> ClientLink {
        let connection = self.coordinator.connect();
        let (sender, inbound) = unbounded_channel();
        self.clients.insert(connection, sender);
        // The coordinator may have refused the connection already.
        self.flush();
        ClientLink {
            connection,
            outbound: self.inbox_sender.clone(),
            inbound,
        }
    }

    /// Coordinator state.
    #[must_use]
    pub const fn coordinator(&self) -> &MatchCoordinator {
        &self.coordinator
    }

    /// Run frames until the game is over.
    ///
    /// # Errors
    ///
    /// Returns the first coordinator error.
    pub async fn run(mut self) -> Result<SessionSummary> {
        let mut ticker = interval(Duration::from_secs_f64(self.frame_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames = 0u64;

        while self.coordinator.phase() != ServerPhase::GameOver {
            if self.realtime {
                ticker.tick().await;
            } else {
                tokio::task::yield_now().await;
            }

            loop {
                match self.inbox.try_recv() {
                    Ok(event) => self.apply(event)?,
                    Err(TryRecvError::Empty) => break,
                    // Unreachable while this server holds a sender.
                    Err(TryRecvError::Disconnected) => return Err(ServerError::TransportClosed),
                }
            }

            self.coordinator.update(self.frame_seconds)?;
            self.flush();
            frames += 1;
        }

        // Close whatever the coordinator did not close itself.
        self.clients.clear();
        let summary = SessionSummary {
            winner: self.coordinator.winner(),
            rounds: self.coordinator.round(),
            frames,
        };
        info!(winner = ?summary.winner, rounds = summary.rounds, frames, "Session finished");
        Ok(summary)
    }

    fn apply(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Frame { connection, bytes } => {
                if !self.clients.contains_key(&connection) {
                    debug!(%connection, "Dropping frame from closed connection");
                    return Ok(());
                }
                let message = ServerBound::decode(&bytes)?;
                self.coordinator.handle_message(connection, message)
            }
            ServerEvent::Disconnected { connection } => {
                self.clients.remove(&connection);
                self.coordinator.disconnect(connection)
            }
        }
    }

    fn flush(&mut self) {
        for outbound in self.coordinator.drain_outbox() {
            match outbound {
                Outbound::Send {
                    connection,
                    message,
                } => {
                    let Some(sender) = self.clients.get(&connection) else {
                        continue;
                    };
                    match message.encode() {
                        Ok(bytes) => {
                            if sender.send(bytes).is_err() {
                                debug!(%connection, "Client already gone");
                            }
                        }
                        Err(e) => warn!(%connection, error = %e, "Failed to encode message"),
                    }
                }
                Outbound::Close { connection } => {
                    self.clients.remove(&connection);
                }
            }
        }
    }
}

/// What a bot client saw by the time its connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotResult {
    /// Bot name.
    pub username: String,
    /// Player id the server assigned.
    pub player_id: Option<i32>,
    /// Final outcome, if the server announced one.
    pub outcome: Option<GameOutcome>,
}

/// Drive a [`ClientSession`] that readies up, buys nothing and plays every
/// battle it is given, until the server closes the connection.
///
/// # Errors
///
/// Returns protocol and battle errors. The server is told about the
/// disconnect either way.
pub async fn run_bot(
    session: ClientSession,
    mut link: ClientLink,
    frame: Option<Duration>,
) -> Result<BotResult> {
    let result = bot_loop(session, &mut link, frame).await;
    link.close();
    result
}

async fn bot_loop(
    mut session: ClientSession,
    link: &mut ClientLink,
    frame: Option<Duration>,
) -> Result<BotResult> {
    link.send(&session.ready_message())?;

    let mut ticker = frame.map(|frame| {
        let mut ticker = interval(frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        match ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => tokio::task::yield_now().await,
        }

        loop {
            match link.inbound.try_recv() {
                Ok(bytes) => {
                    let message = ClientBound::decode(&bytes)?;
                    for reply in session.handle(message)? {
                        link.send(&reply)?;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!(username = session.username(), "Server closed the connection");
                    return Ok(BotResult {
                        username: session.username().to_string(),
                        player_id: session.player_id(),
                        outcome: session.outcome(),
                    });
                }
            }
        }

        if session.phase() == ClientPhase::Purchase {
            if let Some(message) = session.complete_purchase() {
                link.send(&message)?;
            }
        }
        for message in session.update()? {
            link.send(&message)?;
        }
    }
}
