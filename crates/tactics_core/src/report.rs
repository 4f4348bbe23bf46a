//! Match outcomes and their cross-validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Match id carried on the wire by a player that is not paired.
pub const UNPAIRED_MATCH_ID: i32 = -1;

/// The outcome one participant computed for one match.
///
/// Equality is structural, except that an ignored report compares equal to
/// any other report. That makes `==` reflexive and symmetric but not
/// transitive, so reports are never used as map keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchReport {
    /// Player whose side survived.
    pub winning_player_id: i32,
    /// Player whose side was wiped.
    pub losing_player_id: i32,
    /// Health the loser loses.
    pub damage_dealt_to_losing_player: i32,
    /// Match this report belongs to.
    pub match_id: i32,
    /// Synthetic report that does not take part in verification.
    pub ignore: bool,
}

impl MatchReport {
    /// Report of a simulated battle.
    #[must_use]
    pub const fn new(winning_player_id: i32, losing_player_id: i32, damage: i32, match_id: i32) -> Self {
        Self {
            winning_player_id,
            losing_player_id,
            damage_dealt_to_losing_player: damage,
            match_id,
            ignore: false,
        }
    }

    /// Placeholder report for a match nobody simulates.
    #[must_use]
    pub const fn ignored(match_id: i32) -> Self {
        Self {
            winning_player_id: UNPAIRED_MATCH_ID,
            losing_player_id: UNPAIRED_MATCH_ID,
            damage_dealt_to_losing_player: 0,
            match_id,
            ignore: true,
        }
    }
}

impl PartialEq for MatchReport {
    fn eq(&self, other: &Self) -> bool {
        if self.ignore || other.ignore {
            return true;
        }
        self.winning_player_id == other.winning_player_id
            && self.losing_player_id == other.losing_player_id
            && self.damage_dealt_to_losing_player == other.damage_dealt_to_losing_player
            && self.match_id == other.match_id
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignore {
            return write!(f, "match {} (ignored)", self.match_id);
        }
        write!(
            f,
            "match {}: player {} beat player {} for {} damage",
            self.match_id,
            self.winning_player_id,
            self.losing_player_id,
            self.damage_dealt_to_losing_player
        )
    }
}

/// Check the reports collected for one match.
///
/// Returns the agreed outcome. When both reports are ignored the result is
/// an ignored report and nothing should be applied.
///
/// # Errors
///
/// Returns [`GameError::ReportCount`] unless there are exactly two reports
/// and [`GameError::MatchDesync`] when they disagree.
pub fn verify_match_reports(match_id: i32, reports: &[MatchReport]) -> Result<MatchReport> {
    let [first, second] = reports else {
        return Err(GameError::ReportCount {
            match_id,
            count: reports.len(),
        });
    };

    if first != second {
        return Err(GameError::MatchDesync {
            match_id,
            first: first.to_string(),
            second: second.to_string(),
        });
    }

    Ok(if first.ignore { *second } else { *first })
}
