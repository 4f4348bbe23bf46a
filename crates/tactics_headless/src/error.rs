//! Headless runner errors.

use tactics_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors raised by the headless runner.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Error from the battle core.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Neither a scenario file nor a built-in scenario by that name.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// A scenario names a unit the game data does not define.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a scenario file.
    #[error("Failed to parse scenario: {0}")]
    Scenario(#[from] ron::error::SpannedError),

    /// Failed to read or write batch results.
    #[error("Failed to (de)serialize results: {0}")]
    Json(#[from] serde_json::Error),
}
