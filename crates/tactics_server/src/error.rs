//! Server error types.

use tactics_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised by the coordinator and its transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Error from the battle core.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Server configuration could not be loaded.
    #[error("Failed to load config '{path}': {message}")]
    Config {
        /// Config file path.
        path: String,
        /// Error message.
        message: String,
    },

    /// A message arrived from a connection the server does not know.
    #[error("Unknown connection {0}")]
    UnknownConnection(u32),

    /// The transport's inbound channel closed while the game was running.
    #[error("Transport closed before the game ended")]
    TransportClosed,
}
