//! Players and the connections that control them.

use tactics_core::battle::{RosterEntry, SideSetup};

/// Transport-level id of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u32);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who makes a player's decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// A connected client.
    Human(ConnectionId),
    /// Simulated by the server.
    Ai,
}

/// A seat in the game.
#[derive(Debug, Clone)]
pub struct Player {
    /// Player id, unique per game.
    pub id: i32,
    /// Display name.
    pub username: String,
    /// Current health.
    pub health: i32,
    /// Health cap.
    pub max_health: i32,
    /// Human or AI.
    pub controller: Controller,
    /// Units on the field.
    pub roster: Vec<RosterEntry>,
    /// Match of the current battle phase.
    pub match_id: Option<i32>,
    /// The player has been told they lost.
    pub marked_dead: bool,
}

impl Player {
    /// Create a player at full health.
    #[must_use]
    pub fn new(id: i32, username: impl Into<String>, health: i32, controller: Controller) -> Self {
        Self {
            id,
            username: username.into(),
            health,
            max_health: health,
            controller,
            roster: Vec::new(),
            match_id: None,
            marked_dead: false,
        }
    }

    /// Check whether health is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Check whether a client controls this player.
    #[must_use]
    pub const fn is_human(&self) -> bool {
        matches!(self.controller, Controller::Human(_))
    }

    /// Connection of a human player.
    #[must_use]
    pub const fn connection(&self) -> Option<ConnectionId> {
        match self.controller {
            Controller::Human(connection) => Some(connection),
            Controller::Ai => None,
        }
    }

    /// Subtract `damage`, clamped to `[0, max_health]`. Returns the new health.
    pub fn lose_health(&mut self, damage: i32) -> i32 {
        self.health = self.health.saturating_sub(damage).clamp(0, self.max_health);
        self.health
    }

    /// This player's side of a battle.
    #[must_use]
    pub fn side(&self) -> SideSetup {
        SideSetup {
            player_id: self.id,
            roster: self.roster.clone(),
        }
    }
}

/// Per-connection bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// Name sent with the ready message.
    pub username: Option<String>,
    /// Player this connection controls, once the game started.
    pub player_id: Option<i32>,
    /// Ready message received.
    pub ready: bool,
    /// Purchase-complete received this phase.
    pub purchase_phase_complete: bool,
    /// Battle-complete received this phase.
    pub battle_phase_complete: bool,
}
