//! Client role of a session.
//!
//! [`ClientSession`] mirrors what one participant knows about the game. It
//! consumes [`ClientBound`] messages, runs its own [`BattleSimulator`] when a
//! battle phase begins, and answers with [`ServerBound`] messages. Every
//! completion message is guarded by a sent-flag so it goes out exactly once
//! per phase.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::battle::{
    frame_delta, BattleSetup, BattleSimulator, RosterEntry, SideSetup, DEFAULT_MAX_TICKS,
};
use crate::data::GameData;
use crate::error::{GameError, Result};
use crate::protocol::{ClientBound, ServerBound};
use crate::report::UNPAIRED_MATCH_ID;

/// Phase as seen by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Connected, waiting for the game to start.
    Lobby,
    /// Shopping.
    Purchase,
    /// Simulating a battle.
    Battle,
    /// The game is decided for this client.
    GameOver,
}

/// How the game ended for this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// Last player standing.
    Won,
    /// Health reached zero.
    Lost,
}

/// The opponent of the coming battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyInfo {
    /// Opponent's id.
    pub player_id: i32,
    /// Opponent's health.
    pub health: i32,
    /// Opponent's name.
    pub username: String,
}

/// One participant's view of the game.
#[derive(Debug)]
pub struct ClientSession {
    data: Arc<GameData>,
    username: String,
    player_id: Option<i32>,
    health: i32,
    phase: ClientPhase,
    outcome: Option<GameOutcome>,

    own_roster: Vec<RosterEntry>,
    enemy_roster: Vec<RosterEntry>,
    enemy: Option<EnemyInfo>,
    seed: u32,
    goes_first: bool,
    match_id: i32,
    battle: Option<BattleSimulator>,
    max_battle_ticks: u64,

    purchase_complete_sent: bool,
    battle_complete_sent: bool,
}

impl ClientSession {
    /// Create a session for `username`.
    #[must_use]
    pub fn new(data: Arc<GameData>, username: impl Into<String>) -> Self {
        Self {
            data,
            username: username.into(),
            player_id: None,
            health: 0,
            phase: ClientPhase::Lobby,
            outcome: None,
            own_roster: Vec::new(),
            enemy_roster: Vec::new(),
            enemy: None,
            seed: 0,
            goes_first: false,
            match_id: UNPAIRED_MATCH_ID,
            battle: None,
            max_battle_ticks: DEFAULT_MAX_TICKS,
            purchase_complete_sent: false,
            battle_complete_sent: false,
        }
    }

    /// Override the battle tick budget.
    #[must_use]
    pub const fn with_max_battle_ticks(mut self, max_battle_ticks: u64) -> Self {
        self.max_battle_ticks = max_battle_ticks;
        self
    }

    /// The greeting this client sends on connect.
    #[must_use]
    pub fn ready_message(&self) -> ServerBound {
        ServerBound::ClientReady {
            username: self.username.clone(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Id assigned by the server, once received.
    #[must_use]
    pub const fn player_id(&self) -> Option<i32> {
        self.player_id
    }

    /// Last known own health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ClientPhase {
        self.phase
    }

    /// Outcome once the game is decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Opponent of the current or last battle.
    #[must_use]
    pub const fn enemy(&self) -> Option<&EnemyInfo> {
        self.enemy.as_ref()
    }

    /// Battle of the current phase, if any.
    #[must_use]
    pub const fn battle(&self) -> Option<&BattleSimulator> {
        self.battle.as_ref()
    }

    /// Whether the battle-complete message went out this phase.
    #[must_use]
    pub const fn battle_complete_sent(&self) -> bool {
        self.battle_complete_sent
    }

    /// Whether the purchase-complete message went out this phase.
    #[must_use]
    pub const fn purchase_complete_sent(&self) -> bool {
        self.purchase_complete_sent
    }

    /// Apply one message from the server.
    ///
    /// Returns the messages to send back right away.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] if a battle starts without the setup
    /// messages that precede it, or an error building the battle.
    pub fn handle(&mut self, message: ClientBound) -> Result<Vec<ServerBound>> {
        match message {
            ClientBound::ReceivePlayerId { player_id, health } => {
                info!(player_id, health, username = %self.username, "Assigned player id");
                self.player_id = Some(player_id);
                self.health = health;
            }
            ClientBound::BeginPurchasePhase => {
                self.phase = ClientPhase::Purchase;
                self.purchase_complete_sent = false;
                self.battle = None;
            }
            ClientBound::BeginBattlePhase => return self.begin_battle(),
            ClientBound::ReceiveUnitTypesForField(roster) => self.own_roster = roster,
            ClientBound::ReceiveEnemyUnitTypesForEnemyField(roster) => self.enemy_roster = roster,
            ClientBound::ReceiveSeedForBattle(seed) => self.seed = seed,
            ClientBound::ReceiveGoesFirstForBattle(goes_first) => self.goes_first = goes_first,
            ClientBound::ReceiveMatchIdForBattle(match_id) => self.match_id = match_id,
            ClientBound::ReceiveEnemyPlayerInfo {
                player_id,
                health,
                username,
            } => {
                self.enemy = Some(EnemyInfo {
                    player_id,
                    health,
                    username,
                });
            }
            ClientBound::ReceiveUpdatedPlayerHealth(health) => {
                info!(player_id = ?self.player_id, health, "Health updated");
                self.health = health;
            }
            ClientBound::YouWinTheGame => self.finish(GameOutcome::Won),
            ClientBound::YouLoseTheGame => self.finish(GameOutcome::Lost),
        }
        Ok(Vec::new())
    }

    /// Finish shopping. Only the first call per purchase phase yields a
    /// message.
    pub fn complete_purchase(&mut self) -> Option<ServerBound> {
        if self.phase != ClientPhase::Purchase || self.purchase_complete_sent {
            return None;
        }
        self.purchase_complete_sent = true;
        Some(ServerBound::ClientCompletePurchasePhase)
    }

    /// Advance the running battle by one frame.
    ///
    /// When the battle produces its report this returns the report followed
    /// by the battle-complete message, once.
    ///
    /// # Errors
    ///
    /// Returns battle errors, or [`GameError::BattleStalled`] once the tick
    /// budget is spent.
    pub fn update(&mut self) -> Result<Vec<ServerBound>> {
        if self.phase != ClientPhase::Battle || self.battle_complete_sent {
            return Ok(Vec::new());
        }
        let Some(battle) = self.battle.as_mut() else {
            return Ok(Vec::new());
        };

        if battle.report().is_none() {
            if battle.tick_count() >= self.max_battle_ticks {
                return Err(GameError::BattleStalled {
                    ticks: battle.tick_count(),
                });
            }
            battle.tick(frame_delta())?;
        }

        let Some(report) = battle.report().copied() else {
            return Ok(Vec::new());
        };
        debug!(match_id = self.match_id, %report, "Battle finished");
        self.battle_complete_sent = true;
        Ok(vec![
            ServerBound::WinnerOfMatchBeingReported(report),
            ServerBound::ClientCompleteBattlePhase,
        ])
    }

    fn begin_battle(&mut self) -> Result<Vec<ServerBound>> {
        self.phase = ClientPhase::Battle;
        self.battle_complete_sent = false;
        self.battle = None;

        if self.match_id == UNPAIRED_MATCH_ID {
            warn!(player_id = ?self.player_id, "Battle phase without a match");
            self.battle_complete_sent = true;
            return Ok(vec![ServerBound::ClientCompleteBattlePhase]);
        }

        let player_id = self
            .player_id
            .ok_or_else(|| GameError::Protocol("battle began before a player id".into()))?;
        let enemy = self
            .enemy
            .as_ref()
            .ok_or_else(|| GameError::Protocol("battle began without enemy info".into()))?;

        let setup = BattleSetup::from_perspective(
            self.match_id,
            self.seed,
            self.goes_first,
            SideSetup {
                player_id,
                roster: self.own_roster.clone(),
            },
            SideSetup {
                player_id: enemy.player_id,
                roster: self.enemy_roster.clone(),
            },
        );
        info!(
            match_id = self.match_id,
            player_id,
            enemy_id = enemy.player_id,
            seed = self.seed,
            goes_first = self.goes_first,
            "Starting battle"
        );
        self.battle = Some(BattleSimulator::new(Arc::clone(&self.data), setup)?);
        Ok(Vec::new())
    }

    fn finish(&mut self, outcome: GameOutcome) {
        info!(player_id = ?self.player_id, ?outcome, "Game over");
        self.outcome = Some(outcome);
        self.phase = ClientPhase::GameOver;
        self.battle = None;
    }
}
