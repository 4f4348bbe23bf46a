//! Server role of a session.
//!
//! The [`MatchCoordinator`] owns every player, drives the phase machine
//! `Pregame -> Purchase <-> Battle -> GameOver`, pairs players for each
//! battle phase and adjudicates the reports the two sides of every match
//! send back. It is synchronous and transport-agnostic: messages come in
//! through [`MatchCoordinator::handle_message`], time through
//! [`MatchCoordinator::update`], and everything to send is queued as
//! [`Outbound`] commands for the transport to drain.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tactics_core::data::GameData;
use tactics_core::error::GameError;
use tactics_core::protocol::{ClientBound, ServerBound};
use tactics_core::report::{verify_match_reports, MatchReport, UNPAIRED_MATCH_ID};
use tactics_core::rng::RandomStream;
use tracing::{debug, info, warn};

use crate::ai::AiProxy;
use crate::config::ServerConfig;
use crate::deck::CommunalDeck;
use crate::error::{Result, ServerError};
use crate::pairing::{assign_match_ids_for_players, Pairing};
use crate::player::{Connection, ConnectionId, Controller, Player};

/// Server phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    /// Waiting for clients to ready up.
    Pregame,
    /// Players are shopping.
    Purchase,
    /// Matches are being simulated by their participants.
    Battle,
    /// The game is decided.
    GameOver,
}

/// Command for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Deliver a message.
    Send {
        /// Recipient.
        connection: ConnectionId,
        /// Message.
        message: ClientBound,
    },
    /// Close a connection after delivering what was queued before.
    Close {
        /// Connection to close.
        connection: ConnectionId,
    },
}

/// A match of the current battle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledMatch {
    /// Participants.
    pub pairing: Pairing,
    /// Seed both participants simulate with.
    pub seed: u32,
    /// Whether `pairing.first` acts first.
    pub first_goes_first: bool,
}

/// Authoritative game state.
#[derive(Debug)]
pub struct MatchCoordinator {
    config: ServerConfig,
    data: Arc<GameData>,
    ai: AiProxy,
    rng: RandomStream,
    phase: ServerPhase,

    connections: BTreeMap<ConnectionId, Connection>,
    next_connection: u32,

    players: Vec<Player>,
    deck: CommunalDeck,
    next_unit_id: i32,

    countdown: Option<f64>,
    purchase_timer: f64,
    round: u32,

    matches: Vec<ScheduledMatch>,
    reports: BTreeMap<i32, Vec<MatchReport>>,
    reported: BTreeSet<i32>,

    winner: Option<i32>,
    outbox: Vec<Outbound>,
}

impl MatchCoordinator {
    /// Create a coordinator in the pregame phase.
    #[must_use]
    pub fn new(config: ServerConfig, data: Arc<GameData>) -> Self {
        let rng = RandomStream::new(config.seed);
        let ai = AiProxy::new(Arc::clone(&data), config.max_battle_ticks);
        Self {
            config,
            data,
            ai,
            rng,
            phase: ServerPhase::Pregame,
            connections: BTreeMap::new(),
            next_connection: 0,
            players: Vec::new(),
            deck: CommunalDeck::default(),
            next_unit_id: 0,
            countdown: None,
            purchase_timer: 0.0,
            round: 0,
            matches: Vec::new(),
            reports: BTreeMap::new(),
            reported: BTreeSet::new(),
            winner: None,
            outbox: Vec::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ServerPhase {
        self.phase
    }

    /// All players, once the game started.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player by id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotFound`] for an unknown id.
    pub fn player(&self, id: i32) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::PlayerNotFound(id).into())
    }

    /// Matches of the current battle phase.
    #[must_use]
    pub fn matches(&self) -> &[ScheduledMatch] {
        &self.matches
    }

    /// Battle phases started so far.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Winning player, once decided.
    #[must_use]
    pub const fn winner(&self) -> Option<i32> {
        self.winner
    }

    /// Open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Take every queued transport command.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Register a new client connection.
    ///
    /// Connections arriving after the pregame phase are closed right away.
    pub fn connect(&mut self) -> ConnectionId {
        let connection = ConnectionId(self.next_connection);
        self.next_connection += 1;

        if self.phase == ServerPhase::Pregame {
            info!(%connection, "Client connected");
            self.connections.insert(connection, Connection::default());
        } else {
            warn!(%connection, phase = ?self.phase, "Rejecting connection after game start");
            self.outbox.push(Outbound::Close { connection });
        }
        connection
    }

    /// Forget a connection the transport lost.
    ///
    /// A living player whose client leaves is handed to the AI and keeps
    /// playing. If the battle phase is running and the player has not
    /// reported yet, the AI files the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the AI cannot simulate the pending match.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Result<()> {
        let Some(state) = self.connections.remove(&connection) else {
            return Ok(());
        };
        info!(%connection, "Client disconnected");

        if self.phase == ServerPhase::Pregame {
            if self.connections.is_empty() {
                self.countdown = None;
            }
            return Ok(());
        }

        let Some(player_id) = state.player_id else {
            return Ok(());
        };
        let Some(index) = self.player_index(player_id) else {
            return Ok(());
        };
        self.players[index].controller = Controller::Ai;
        info!(player_id, "Player handed to AI");

        if self.phase == ServerPhase::Battle && !self.reported.contains(&player_id) {
            if let Some(scheduled) = self.match_of(index) {
                let report = self.ai_report(&scheduled, index)?;
                self.file_report(player_id, report);
            }
        }
        Ok(())
    }

    /// Apply one message from a client.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownConnection`] for a stranger and
    /// [`GameError::Protocol`] for a report that does not belong to the
    /// sender's match or repeats an earlier one.
    pub fn handle_message(&mut self, connection: ConnectionId, message: ServerBound) -> Result<()> {
        let phase = self.phase;
        let state = self
            .connections
            .get_mut(&connection)
            .ok_or(ServerError::UnknownConnection(connection.0))?;

        match message {
            ServerBound::ClientReady { username } => {
                if phase == ServerPhase::Pregame {
                    info!(%connection, %username, "Client ready");
                    state.username = Some(username);
                    state.ready = true;
                } else {
                    warn!(%connection, ?phase, "Ready message outside pregame");
                }
            }
            ServerBound::ClientCompletePurchasePhase => {
                if phase == ServerPhase::Purchase {
                    state.purchase_phase_complete = true;
                }
            }
            ServerBound::ClientCompleteBattlePhase => {
                if phase == ServerPhase::Battle {
                    state.battle_phase_complete = true;
                }
            }
            ServerBound::WinnerOfMatchBeingReported(report) => {
                let player_id = state.player_id.ok_or_else(|| {
                    GameError::Protocol(format!("connection {connection} reported without a player"))
                })?;
                self.accept_report(player_id, report)?;
            }
        }
        Ok(())
    }

    /// Advance timers and fire any phase transition that is due.
    ///
    /// # Errors
    ///
    /// Returns pairing failures, report count errors and AI battle errors.
    pub fn update(&mut self, dt: f64) -> Result<()> {
        match self.phase {
            ServerPhase::Pregame => self.update_pregame(dt),
            ServerPhase::Purchase => {
                self.purchase_timer -= dt;
                let all_done = self
                    .player_connections()
                    .all(|(_, state)| state.purchase_phase_complete);
                if all_done || self.purchase_timer <= 0.0 {
                    self.begin_battle_phase()?;
                }
                Ok(())
            }
            ServerPhase::Battle => {
                let all_done = self
                    .player_connections()
                    .all(|(_, state)| state.battle_phase_complete);
                let all_reported = self.matches.iter().all(|m| {
                    self.reports
                        .get(&m.pairing.match_id)
                        .is_some_and(|r| r.len() >= 2)
                });
                if all_done && all_reported {
                    self.finish_battle_phase()?;
                }
                Ok(())
            }
            ServerPhase::GameOver => Ok(()),
        }
    }

    fn update_pregame(&mut self, dt: f64) -> Result<()> {
        let all_ready =
            !self.connections.is_empty() && self.connections.values().all(|c| c.ready);

        match self.countdown {
            None if all_ready => {
                info!(
                    clients = self.connections.len(),
                    seconds = self.config.pregame_countdown,
                    "All clients ready, starting countdown"
                );
                self.countdown = Some(self.config.pregame_countdown);
            }
            None => {}
            Some(remaining) => {
                let remaining = remaining - dt * self.config.countdown_rate;
                if remaining <= 0.0 {
                    self.countdown = None;
                    self.start_game()?;
                } else {
                    self.countdown = Some(remaining);
                }
            }
        }
        Ok(())
    }

    fn start_game(&mut self) -> Result<()> {
        let unready: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| !c.ready)
            .map(|(id, _)| *id)
            .collect();
        for connection in unready {
            warn!(%connection, "Client never readied, dropping it");
            self.close(connection);
        }

        let ready: Vec<(ConnectionId, String)> = self
            .connections
            .iter()
            .map(|(id, c)| (*id, c.username.clone().unwrap_or_default()))
            .collect();

        let mut next_id = 0;
        for (connection, username) in ready {
            if self.players.len() >= self.config.max_players {
                warn!(%connection, "Game is full");
                self.close(connection);
                continue;
            }
            self.players.push(Player::new(
                next_id,
                username,
                self.config.starting_health,
                Controller::Human(connection),
            ));
            if let Some(state) = self.connections.get_mut(&connection) {
                state.player_id = Some(next_id);
            }
            next_id += 1;
        }
        // Pairing needs an even seat count.
        let seats = self.config.max_players.max(2).next_multiple_of(2);
        while self.players.len() < seats {
            let username = format!("AI {next_id}");
            self.players.push(Player::new(
                next_id,
                username,
                self.config.starting_health,
                Controller::Ai,
            ));
            next_id += 1;
        }

        self.deck = CommunalDeck::build(&self.data, self.config.copies_per_card, &mut self.rng);
        for index in 0..self.players.len() {
            let roster = self
                .deck
                .deal_roster(self.config.starting_roster_size, &mut self.next_unit_id);
            self.players[index].roster = roster;
        }

        for index in 0..self.players.len() {
            let player = &self.players[index];
            if let Some(connection) = player.connection() {
                let message = ClientBound::ReceivePlayerId {
                    player_id: player.id,
                    health: player.health,
                };
                self.send(connection, message);
            }
        }

        info!(
            players = self.players.len(),
            humans = self.players.iter().filter(|p| p.is_human()).count(),
            deck = self.deck.len(),
            "Game started"
        );
        self.begin_purchase_phase();
        Ok(())
    }

    fn begin_purchase_phase(&mut self) {
        self.phase = ServerPhase::Purchase;
        self.purchase_timer = self.config.purchase_timer;
        for state in self.connections.values_mut() {
            state.purchase_phase_complete = false;
        }
        info!(round = self.round, "Purchase phase");
        for connection in self.player_connection_ids() {
            self.send(connection, ClientBound::BeginPurchasePhase);
        }
    }

    fn begin_battle_phase(&mut self) -> Result<()> {
        self.phase = ServerPhase::Battle;
        self.round += 1;
        for state in self.connections.values_mut() {
            state.battle_phase_complete = false;
        }
        self.reports.clear();
        self.reported.clear();

        let pairings = assign_match_ids_for_players(&mut self.players)?;
        self.matches = pairings
            .into_iter()
            .map(|pairing| ScheduledMatch {
                pairing,
                seed: self.rng.next_u32(),
                first_goes_first: self.rng.next_int_in_range(0, 1) == 0,
            })
            .collect();
        info!(round = self.round, matches = self.matches.len(), "Battle phase");

        for scheduled in self.matches.clone() {
            let Pairing { first, second, .. } = scheduled.pairing;
            self.send_battle_setup(&scheduled, first, second, scheduled.first_goes_first);
            self.send_battle_setup(&scheduled, second, first, !scheduled.first_goes_first);

            if !self.players[first].is_human() && !self.players[second].is_human() {
                let match_id = scheduled.pairing.match_id;
                let ids = [self.players[first].id, self.players[second].id];
                for id in ids {
                    self.file_report(id, MatchReport::ignored(match_id));
                }
                continue;
            }
            for index in [first, second] {
                if !self.players[index].is_human() {
                    let report = self.ai_report(&scheduled, index)?;
                    let id = self.players[index].id;
                    self.file_report(id, report);
                }
            }
        }

        for index in 0..self.players.len() {
            let player = &self.players[index];
            if let Some(connection) = player.connection() {
                if player.match_id.is_none() {
                    self.send(connection, ClientBound::ReceiveMatchIdForBattle(UNPAIRED_MATCH_ID));
                }
                self.send(connection, ClientBound::BeginBattlePhase);
            }
        }
        Ok(())
    }

    fn send_battle_setup(
        &mut self,
        scheduled: &ScheduledMatch,
        own: usize,
        enemy: usize,
        goes_first: bool,
    ) {
        let Some(connection) = self.players[own].connection() else {
            return;
        };
        let (own, enemy) = (&self.players[own], &self.players[enemy]);
        let messages = [
            ClientBound::ReceiveEnemyPlayerInfo {
                player_id: enemy.id,
                health: enemy.health,
                username: enemy.username.clone(),
            },
            ClientBound::ReceiveMatchIdForBattle(scheduled.pairing.match_id),
            ClientBound::ReceiveUnitTypesForField(own.roster.clone()),
            ClientBound::ReceiveEnemyUnitTypesForEnemyField(enemy.roster.clone()),
            ClientBound::ReceiveGoesFirstForBattle(goes_first),
            ClientBound::ReceiveSeedForBattle(scheduled.seed),
        ];
        for message in messages {
            self.send(connection, message);
        }
    }

    fn ai_report(&self, scheduled: &ScheduledMatch, index: usize) -> Result<MatchReport> {
        let Pairing {
            match_id,
            first,
            second,
        } = scheduled.pairing;
        let (opponent, goes_first) = if index == first {
            (second, scheduled.first_goes_first)
        } else {
            (first, !scheduled.first_goes_first)
        };
        Ok(self.ai.report_for(
            match_id,
            scheduled.seed,
            &self.players[index],
            goes_first,
            &self.players[opponent],
        )?)
    }

    fn accept_report(&mut self, player_id: i32, report: MatchReport) -> Result<()> {
        let index = self
            .player_index(player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        if self.phase != ServerPhase::Battle
            || self.players[index].match_id != Some(report.match_id)
        {
            return Err(GameError::Protocol(format!(
                "player {player_id} reported for match {} outside its match",
                report.match_id
            ))
            .into());
        }
        if self.reported.contains(&player_id) {
            return Err(GameError::Protocol(format!(
                "player {player_id} reported match {} twice",
                report.match_id
            ))
            .into());
        }
        self.file_report(player_id, report);
        Ok(())
    }

    fn file_report(&mut self, player_id: i32, report: MatchReport) {
        debug!(player_id, %report, "Report filed");
        self.reported.insert(player_id);
        self.reports.entry(report.match_id).or_default().push(report);
    }

    fn finish_battle_phase(&mut self) -> Result<()> {
        let match_ids: Vec<i32> = self.matches.iter().map(|m| m.pairing.match_id).collect();
        for match_id in match_ids {
            let reports = self.reports.remove(&match_id).unwrap_or_default();
            match verify_match_reports(match_id, &reports) {
                Ok(report) if report.ignore => {}
                Ok(report) => self.apply_result(&report)?,
                Err(GameError::MatchDesync { first, second, .. }) => {
                    warn!(match_id, %first, %second, "Match desync, resolving as a draw");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.matches.clear();

        self.end_of_round();
        if self.phase != ServerPhase::GameOver {
            self.begin_purchase_phase();
        }
        Ok(())
    }

    fn apply_result(&mut self, report: &MatchReport) -> Result<()> {
        let index = self
            .player_index(report.losing_player_id)
            .ok_or(GameError::PlayerNotFound(report.losing_player_id))?;
        let loser = &mut self.players[index];
        let health = loser.lose_health(report.damage_dealt_to_losing_player);
        info!(
            match_id = report.match_id,
            winner = report.winning_player_id,
            loser = loser.id,
            damage = report.damage_dealt_to_losing_player,
            health,
            "Match resolved"
        );
        if let Some(connection) = loser.connection() {
            self.send(connection, ClientBound::ReceiveUpdatedPlayerHealth(health));
        }
        Ok(())
    }

    fn end_of_round(&mut self) {
        for index in 0..self.players.len() {
            let player = &self.players[index];
            if player.is_alive() || player.marked_dead {
                continue;
            }
            let Some(connection) = player.connection() else {
                continue;
            };
            info!(player_id = player.id, "Player eliminated");
            self.send(connection, ClientBound::YouLoseTheGame);
            self.close(connection);
            let player = &mut self.players[index];
            player.marked_dead = true;
            player.controller = Controller::Ai;
        }

        let alive: Vec<usize> = (0..self.players.len())
            .filter(|&i| self.players[i].is_alive())
            .collect();
        if let [last] = alive.as_slice() {
            let winner = &self.players[*last];
            info!(player_id = winner.id, username = %winner.username, "Game won");
            self.winner = Some(winner.id);
            if let Some(connection) = winner.connection() {
                self.send(connection, ClientBound::YouWinTheGame);
            }
            self.game_over();
        } else if !self.players.iter().any(|p| p.is_human() && p.is_alive()) {
            info!(alive = alive.len(), "No human players left");
            self.game_over();
        }
    }

    fn game_over(&mut self) {
        self.phase = ServerPhase::GameOver;
        let connections: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for connection in connections {
            self.close(connection);
        }
    }

    fn send(&mut self, connection: ConnectionId, message: ClientBound) {
        self.outbox.push(Outbound::Send {
            connection,
            message,
        });
    }

    fn close(&mut self, connection: ConnectionId) {
        self.connections.remove(&connection);
        self.outbox.push(Outbound::Close { connection });
    }

    fn player_index(&self, id: i32) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn match_of(&self, index: usize) -> Option<ScheduledMatch> {
        let match_id = self.players[index].match_id?;
        self.matches
            .iter()
            .find(|m| m.pairing.match_id == match_id)
            .copied()
    }

    fn player_connections(&self) -> impl Iterator<Item = (&ConnectionId, &Connection)> + '_ {
        self.connections.iter().filter(|(_, c)| c.player_id.is_some())
    }

    fn player_connection_ids(&self) -> Vec<ConnectionId> {
        self.player_connections().map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_test_utils::fixtures::shipped_data;

    fn config() -> ServerConfig {
        ServerConfig {
            max_players: 4,
            starting_health: 5,
            realtime: false,
            ..ServerConfig::default()
        }
    }

    fn coordinator() -> MatchCoordinator {
        MatchCoordinator::new(config(), shipped_data())
    }

    fn sent_to(outbox: &[Outbound], connection: ConnectionId) -> Vec<ClientBound> {
        outbox
            .iter()
            .filter_map(|o| match o {
                Outbound::Send {
                    connection: c,
                    message,
                } if *c == connection => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ready one client and run the pregame countdown out.
    fn started(coordinator: &mut MatchCoordinator) -> ConnectionId {
        let connection = coordinator.connect();
        coordinator
            .handle_message(
                connection,
                ServerBound::ClientReady {
                    username: "alice".into(),
                },
            )
            .unwrap();
        for _ in 0..200 {
            coordinator.update(0.05).unwrap();
            if coordinator.phase() != ServerPhase::Pregame {
                break;
            }
        }
        connection
    }

    #[test]
    fn test_countdown_starts_game_with_ai_fill() {
        let mut coordinator = coordinator();
        let connection = coordinator.connect();
        coordinator.update(1.0).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Pregame);

        coordinator
            .handle_message(
                connection,
                ServerBound::ClientReady {
                    username: "alice".into(),
                },
            )
            .unwrap();
        coordinator.update(0.0).unwrap();
        // 3.5 s at half rate.
        coordinator.update(6.0).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Pregame);
        coordinator.update(1.5).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Purchase);

        let players = coordinator.players();
        assert_eq!(players.len(), 4);
        assert_eq!(players.iter().filter(|p| p.is_human()).count(), 1);
        assert!(players.iter().all(|p| p.roster.len() == 3));

        let sent = sent_to(&coordinator.drain_outbox(), connection);
        assert_eq!(
            sent,
            vec![
                ClientBound::ReceivePlayerId {
                    player_id: 0,
                    health: 5
                },
                ClientBound::BeginPurchasePhase,
            ]
        );
    }

    #[test]
    fn test_unready_connection_is_closed_at_game_start() {
        let mut coordinator = coordinator();
        let alice = coordinator.connect();
        coordinator
            .handle_message(
                alice,
                ServerBound::ClientReady {
                    username: "alice".into(),
                },
            )
            .unwrap();
        coordinator.update(0.0).unwrap();
        // Joins during the countdown and never readies.
        let lurker = coordinator.connect();
        coordinator.update(10.0).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Purchase);

        let outbox = coordinator.drain_outbox();
        assert!(outbox.contains(&Outbound::Close { connection: lurker }));
        assert!(sent_to(&outbox, lurker).is_empty());
        assert_eq!(coordinator.connection_count(), 1);
        assert_eq!(
            coordinator.players().iter().filter(|p| p.is_human()).count(),
            1
        );
    }

    #[test]
    fn test_battle_setup_messages_in_order() {
        let mut coordinator = coordinator();
        let connection = started(&mut coordinator);
        coordinator.drain_outbox();

        coordinator
            .handle_message(connection, ServerBound::ClientCompletePurchasePhase)
            .unwrap();
        coordinator.update(0.05).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Battle);
        assert_eq!(coordinator.round(), 1);

        let sent = sent_to(&coordinator.drain_outbox(), connection);
        assert_eq!(sent.len(), 7);
        assert!(matches!(sent[0], ClientBound::ReceiveEnemyPlayerInfo { .. }));
        assert!(matches!(sent[1], ClientBound::ReceiveMatchIdForBattle(_)));
        assert!(matches!(sent[2], ClientBound::ReceiveUnitTypesForField(_)));
        assert!(matches!(sent[3], ClientBound::ReceiveEnemyUnitTypesForEnemyField(_)));
        assert!(matches!(sent[4], ClientBound::ReceiveGoesFirstForBattle(_)));
        assert!(matches!(sent[5], ClientBound::ReceiveSeedForBattle(_)));
        assert_eq!(sent[6], ClientBound::BeginBattlePhase);

        // Every player is in exactly one match.
        assert_eq!(coordinator.matches().len(), 2);
        assert!(coordinator.players().iter().all(|p| p.match_id.is_some()));
    }

    #[test]
    fn test_purchase_timer_forces_battle() {
        let mut coordinator = coordinator();
        started(&mut coordinator);
        coordinator.update(29.0).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Purchase);
        coordinator.update(1.0).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Battle);
    }

    #[test]
    fn test_report_for_wrong_match_is_rejected() {
        let mut coordinator = coordinator();
        let connection = started(&mut coordinator);
        coordinator
            .handle_message(connection, ServerBound::ClientCompletePurchasePhase)
            .unwrap();
        coordinator.update(0.05).unwrap();

        let result = coordinator.handle_message(
            connection,
            ServerBound::WinnerOfMatchBeingReported(MatchReport::new(0, 1, 1, 99)),
        );
        assert!(matches!(
            result,
            Err(ServerError::Game(GameError::Protocol(_)))
        ));
    }

    #[test]
    fn test_unknown_connection() {
        let mut coordinator = coordinator();
        let result =
            coordinator.handle_message(ConnectionId(42), ServerBound::ClientCompleteBattlePhase);
        assert!(matches!(result, Err(ServerError::UnknownConnection(42))));
    }

    #[test]
    fn test_late_connection_is_closed() {
        let mut coordinator = coordinator();
        started(&mut coordinator);
        coordinator.drain_outbox();
        let late = coordinator.connect();
        assert_eq!(
            coordinator.drain_outbox(),
            vec![Outbound::Close { connection: late }]
        );
    }

    fn to_battle(coordinator: &mut MatchCoordinator, connection: ConnectionId) {
        coordinator
            .handle_message(connection, ServerBound::ClientCompletePurchasePhase)
            .unwrap();
        coordinator.update(0.05).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::Battle);
    }

    #[test]
    fn test_desync_resolves_as_draw() {
        let mut coordinator = coordinator();
        let connection = started(&mut coordinator);
        to_battle(&mut coordinator, connection);

        let me = coordinator.player(0).unwrap();
        let match_id = me.match_id.unwrap();
        let opponent = coordinator
            .players()
            .iter()
            .find(|p| p.id != 0 && p.match_id == Some(match_id))
            .unwrap()
            .id;
        let bogus = MatchReport::new(0, opponent, 99, match_id);
        coordinator
            .handle_message(connection, ServerBound::WinnerOfMatchBeingReported(bogus))
            .unwrap();
        coordinator
            .handle_message(connection, ServerBound::ClientCompleteBattlePhase)
            .unwrap();
        coordinator.update(0.05).unwrap();

        assert_eq!(coordinator.phase(), ServerPhase::Purchase);
        assert!(coordinator.players().iter().all(|p| p.health == 5));
    }

    #[test]
    fn test_duplicate_report_is_rejected() {
        let mut coordinator = coordinator();
        let connection = started(&mut coordinator);
        to_battle(&mut coordinator, connection);

        let match_id = coordinator.player(0).unwrap().match_id.unwrap();
        let report = MatchReport::new(0, 1, 1, match_id);
        coordinator
            .handle_message(connection, ServerBound::WinnerOfMatchBeingReported(report))
            .unwrap();
        assert!(coordinator
            .handle_message(connection, ServerBound::WinnerOfMatchBeingReported(report))
            .is_err());
    }

    #[test]
    fn test_disconnect_hands_player_to_ai() {
        let mut coordinator = coordinator();
        let connection = started(&mut coordinator);
        to_battle(&mut coordinator, connection);

        coordinator.disconnect(connection).unwrap();
        assert!(!coordinator.player(0).unwrap().is_human());
        assert_eq!(coordinator.connection_count(), 0);

        // The AI filed the missing report, and with no humans left the game ends.
        coordinator.update(0.05).unwrap();
        assert_eq!(coordinator.phase(), ServerPhase::GameOver);
    }

    #[test]
    fn test_game_driven_by_client_session_finishes() {
        use tactics_core::client::{ClientSession, GameOutcome};

        let data = shipped_data();
        let mut coordinator = MatchCoordinator::new(
            ServerConfig {
                max_players: 2,
                starting_health: 2,
                ..config()
            },
            Arc::clone(&data),
        );
        let connection = coordinator.connect();
        let mut session = ClientSession::new(data, "alice");
        coordinator
            .handle_message(connection, session.ready_message())
            .unwrap();

        let mut closed = false;
        for _ in 0..200_000 {
            coordinator.update(0.05).unwrap();
            let mut replies = Vec::new();
            for outbound in coordinator.drain_outbox() {
                match outbound {
                    Outbound::Send { message, .. } => replies.extend(session.handle(message).unwrap()),
                    Outbound::Close { .. } => closed = true,
                }
            }
            if closed {
                break;
            }
            replies.extend(session.complete_purchase());
            replies.extend(session.update().unwrap());
            for reply in replies {
                coordinator.handle_message(connection, reply).unwrap();
            }
        }

        assert!(closed);
        assert_eq!(coordinator.phase(), ServerPhase::GameOver);
        match session.outcome() {
            Some(GameOutcome::Won) => assert_eq!(coordinator.winner(), Some(0)),
            Some(GameOutcome::Lost) => assert_eq!(coordinator.winner(), Some(1)),
            None => panic!("client never learned the outcome"),
        }
    }
}
