//! # Tactics Server
//!
//! Match coordinator for Tactics Arena.
//!
//! The server never simulates a human's battle. It deals rosters, pairs
//! players for every battle phase, hands both sides of a match the same
//! seed and compares the two reports they send back. AI seats are played
//! by the server itself through [`ai::AiProxy`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod config;
pub mod coordinator;
pub mod deck;
pub mod error;
pub mod network;
pub mod pairing;
pub mod player;

pub use config::ServerConfig;
pub use coordinator::{MatchCoordinator, Outbound, ServerPhase};
pub use error::{Result, ServerError};
pub use network::{run_bot, LocalServer, SessionSummary};
