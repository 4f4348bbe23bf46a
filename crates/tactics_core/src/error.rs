//! Error types for the battle core.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the battle core.
///
/// Everything the game treats as unrecoverable (bad data, a desync between
/// two peers, a protocol violation) is surfaced here and propagated to the
/// per-frame driver instead of aborting in place.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Loaded data is internally inconsistent.
    #[error("Game data failed validation: {0:?}")]
    DataValidation(Vec<String>),

    /// An ability name was not found in the loaded data.
    #[error("Unknown ability: {0}")]
    UnknownAbility(String),

    /// A unit job type was not found in the loaded data.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(i32),

    /// Percent damage was applied by an ability with no target alliance.
    #[error("Ability '{0}' applied damage without declaring a target alliance")]
    MissingAlliance(String),

    /// Physical healing is not supported.
    #[error("Ability '{0}' tried to heal with the Physical damage class")]
    UnsupportedHealing(String),

    /// A buff was applied whose template target choice cannot receive buffs.
    #[error("Buff '{ability}' has unsupported target choice {choice}")]
    InvalidBuffTarget {
        /// Buff ability name.
        ability: String,
        /// Offending target choice.
        choice: String,
    },

    /// Turn selection returned a dead unit.
    #[error("Unit {unit_id} of player {player_id} was selected to act while dead")]
    DeadUnitSelected {
        /// Owning player.
        player_id: i32,
        /// Unit identifier.
        unit_id: i32,
    },

    /// An ability had no valid target.
    #[error("No target available for ability '{0}'")]
    NoTargetAvailable(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Two peers reported different outcomes for the same match.
    #[error("Desync detected in match {match_id}: {first} != {second}")]
    MatchDesync {
        /// Match identifier.
        match_id: i32,
        /// First report, formatted.
        first: String,
        /// Second report, formatted.
        second: String,
    },

    /// A match did not receive exactly two reports.
    #[error("Match {match_id} received {count} reports, expected exactly 2")]
    ReportCount {
        /// Match identifier.
        match_id: i32,
        /// Number of reports received.
        count: usize,
    },

    /// Players could not be paired.
    #[error("Pairing failed: {0}")]
    PairingFailed(String),

    /// No player matched a lookup.
    #[error("Player not found: {0}")]
    PlayerNotFound(i32),

    /// Malformed or unexpected wire message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A battle ran past its tick budget without a winner.
    #[error("Battle stalled after {ticks} ticks without a winner")]
    BattleStalled {
        /// Ticks simulated.
        ticks: u64,
    },
}
