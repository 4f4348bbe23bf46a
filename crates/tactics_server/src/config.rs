//! Server configuration.

use std::path::{Path, PathBuf};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tactics_core::battle::{DEFAULT_MAX_TICKS, TICK_RATE};
use tactics_core::client::ClientSession;
use tactics_core::data::GameData;

use crate::error::{Result, ServerError};

/// Server configuration.
///
/// Every field has a default, so a RON file only needs the fields it
/// changes:
///
/// ```ron
/// ServerConfig(starting_health: 10, local_clients: 2)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Players per game; AI fills the seats humans leave empty.
    pub max_players: usize,
    /// Health every player starts with.
    pub starting_health: i32,
    /// Units dealt to each player at game start.
    pub starting_roster_size: usize,
    /// Copies of each unit type in the communal deck.
    pub copies_per_card: usize,
    /// Pregame countdown, in seconds.
    pub pregame_countdown: f64,
    /// Rate at which the pregame countdown runs, relative to real time.
    pub countdown_rate: f64,
    /// Seconds a purchase phase lasts at most.
    pub purchase_timer: f64,
    /// Simulation tick rate (should match client).
    pub tick_rate: u32,
    /// Ticks after which a battle counts as stalled, for AI seats and bots.
    pub max_battle_ticks: u64,
    /// Pace the session loop in real time instead of running flat out.
    pub realtime: bool,
    /// Seed of the server's random stream.
    pub seed: u32,
    /// Directory holding the game data files.
    pub data_dir: PathBuf,
    /// Bot clients started by the local session binary.
    pub local_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            starting_health: 20,
            starting_roster_size: 3,
            copies_per_card: 6,
            pregame_countdown: 3.5,
            countdown_rate: 0.5,
            purchase_timer: 30.0,
            tick_rate: TICK_RATE,
            max_battle_ticks: DEFAULT_MAX_TICKS,
            realtime: true,
            seed: 0x5eed,
            data_dir: PathBuf::from("assets/data"),
            local_clients: 2,
        }
    }
}

impl ServerConfig {
    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |message: String| ServerError::Config {
            path: path.display().to_string(),
            message,
        };
        let src = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        ron::from_str(&src).map_err(|e| config_error(e.to_string()))
    }

    /// Seconds per simulation tick.
    #[must_use]
    pub fn frame_seconds(&self) -> f64 {
        1.0 / f64::from(self.tick_rate.max(1))
    }

    /// Client session for a local bot, with this config's battle budget.
    #[must_use]
    pub fn client_session(&self, data: Arc<GameData>, username: impl Into<String>) -> ClientSession {
        ClientSession::new(data, username).with_max_battle_ticks(self.max_battle_ticks)
    }
}
