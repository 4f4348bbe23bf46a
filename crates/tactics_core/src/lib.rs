//! # Tactics Core
//!
//! Deterministic battle core for Tactics Arena.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio playback
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Two peers that receive the same [`battle::BattleSetup`] compute the same
//! battle tick for tick, so the server only has to compare their reports.
//!
//! ## Crate Structure
//!
//! - [`rng`] - Position-addressable random stream
//! - [`data`] - Ability and unit definitions loaded from RON
//! - [`term`] - Timed steps an ability is built from
//! - [`ability`] - Ability templates, live instances and damage resolution
//! - [`unit`] - Units and their per-turn sequencing
//! - [`battle`] - The battle simulator
//! - [`report`] - Match outcomes and their verification
//! - [`protocol`] - Wire messages
//! - [`client`] - Client role of a session
//! - [`replay`] - Recorded battles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ability;
pub mod battle;
pub mod client;
pub mod data;
pub mod error;
pub mod math;
pub mod protocol;
pub mod replay;
pub mod report;
pub mod rng;
pub mod targeting;
pub mod term;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ability::{AbilityEvent, AbilityInstance, AbilityTemplate};
    pub use crate::battle::{
        frame_delta, BattleSetup, BattleSimulator, RosterEntry, Side, SideSetup, TICK_RATE,
    };
    pub use crate::client::{ClientPhase, ClientSession, GameOutcome};
    pub use crate::data::{
        AbilityData, DamageClass, EffectKind, GameData, TargetAlliance, TargetChoice, TermData,
        TermKind, UnitData, UnitStats,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::protocol::{ClientBound, ServerBound};
    pub use crate::replay::{BattleReplay, BattleReplayPlayer};
    pub use crate::report::{verify_match_reports, MatchReport, UNPAIRED_MATCH_ID};
    pub use crate::rng::RandomStream;
    pub use crate::term::{Term, TermState};
    pub use crate::unit::{TurnPhase, Unit, UnitHandle, UnitId};
}
