//! Tagged binary wire messages.
//!
//! Every frame starts with a one-byte message id followed by the payload.
//! Integers are little-endian; strings are an `i32` byte length followed by
//! UTF-8; bools are one byte. Ids below 64 travel server → client, ids from
//! 64 up travel client → server.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::battle::RosterEntry;
use crate::error::{GameError, Result};
use crate::report::MatchReport;

/// Longest string accepted on the wire, in bytes.
pub const MAX_STRING_BYTES: usize = 256;

/// Most roster entries accepted in one message.
pub const MAX_ROSTER_LEN: usize = 64;

/// Message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientBound {
    /// Identity and starting health of the receiving player.
    ReceivePlayerId {
        /// Receiving player's id.
        player_id: i32,
        /// Starting health.
        health: i32,
    },
    /// A purchase phase starts.
    BeginPurchasePhase,
    /// A battle phase starts; battle setup messages precede it.
    BeginBattlePhase,
    /// The receiving player's own roster.
    ReceiveUnitTypesForField(Vec<RosterEntry>),
    /// The opponent's roster.
    ReceiveEnemyUnitTypesForEnemyField(Vec<RosterEntry>),
    /// Shared seed for the coming battle.
    ReceiveSeedForBattle(u32),
    /// Whether the receiving player's side acts first.
    ReceiveGoesFirstForBattle(bool),
    /// Match id of the coming battle.
    ReceiveMatchIdForBattle(i32),
    /// The opponent of the coming battle.
    ReceiveEnemyPlayerInfo {
        /// Opponent's id.
        player_id: i32,
        /// Opponent's health.
        health: i32,
        /// Opponent's name.
        username: String,
    },
    /// The receiving player's health after a lost match.
    ReceiveUpdatedPlayerHealth(i32),
    /// The receiving player won the game.
    YouWinTheGame,
    /// The receiving player lost the game.
    YouLoseTheGame,
}

/// Message sent from a client to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerBound {
    /// The client joined and is ready to start.
    ClientReady {
        /// Display name.
        username: String,
    },
    /// The client finished its purchase phase.
    ClientCompletePurchasePhase,
    /// The client finished simulating its battle.
    ClientCompleteBattlePhase,
    /// The outcome the client computed for its match.
    WinnerOfMatchBeingReported(MatchReport),
}

mod id {
    pub const RECEIVE_PLAYER_ID: u8 = 1;
    pub const BEGIN_PURCHASE_PHASE: u8 = 2;
    pub const BEGIN_BATTLE_PHASE: u8 = 3;
    pub const RECEIVE_UNIT_TYPES_FOR_FIELD: u8 = 4;
    pub const RECEIVE_ENEMY_UNIT_TYPES_FOR_ENEMY_FIELD: u8 = 5;
    pub const RECEIVE_SEED_FOR_BATTLE: u8 = 6;
    pub const RECEIVE_GOES_FIRST_FOR_BATTLE: u8 = 7;
    pub const RECEIVE_MATCH_ID_FOR_BATTLE: u8 = 8;
    pub const RECEIVE_ENEMY_PLAYER_INFO: u8 = 9;
    pub const RECEIVE_UPDATED_PLAYER_HEALTH: u8 = 10;
    pub const YOU_WIN_THE_GAME: u8 = 11;
    pub const YOU_LOSE_THE_GAME: u8 = 12;

    pub const CLIENT_READY: u8 = 64;
    pub const CLIENT_COMPLETE_PURCHASE_PHASE: u8 = 65;
    pub const CLIENT_COMPLETE_BATTLE_PHASE: u8 = 66;
    pub const WINNER_OF_MATCH_BEING_REPORTED: u8 = 67;
}

impl ClientBound {
    /// Message id byte.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::ReceivePlayerId { .. } => id::RECEIVE_PLAYER_ID,
            Self::BeginPurchasePhase => id::BEGIN_PURCHASE_PHASE,
            Self::BeginBattlePhase => id::BEGIN_BATTLE_PHASE,
            Self::ReceiveUnitTypesForField(_) => id::RECEIVE_UNIT_TYPES_FOR_FIELD,
            Self::ReceiveEnemyUnitTypesForEnemyField(_) => {
                id::RECEIVE_ENEMY_UNIT_TYPES_FOR_ENEMY_FIELD
            }
            Self::ReceiveSeedForBattle(_) => id::RECEIVE_SEED_FOR_BATTLE,
            Self::ReceiveGoesFirstForBattle(_) => id::RECEIVE_GOES_FIRST_FOR_BATTLE,
            Self::ReceiveMatchIdForBattle(_) => id::RECEIVE_MATCH_ID_FOR_BATTLE,
            Self::ReceiveEnemyPlayerInfo { .. } => id::RECEIVE_ENEMY_PLAYER_INFO,
            Self::ReceiveUpdatedPlayerHealth(_) => id::RECEIVE_UPDATED_PLAYER_HEALTH,
            Self::YouWinTheGame => id::YOU_WIN_THE_GAME,
            Self::YouLoseTheGame => id::YOU_LOSE_THE_GAME,
        }
    }

    /// Encode into one frame.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] if a string or roster is too long.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![self.id()];
        match self {
            Self::ReceivePlayerId { player_id, health } => {
                write_i32(&mut buf, *player_id)?;
                write_i32(&mut buf, *health)?;
            }
            Self::BeginPurchasePhase
            | Self::BeginBattlePhase
            | Self::YouWinTheGame
            | Self::YouLoseTheGame => {}
            Self::ReceiveUnitTypesForField(roster)
            | Self::ReceiveEnemyUnitTypesForEnemyField(roster) => write_roster(&mut buf, roster)?,
            Self::ReceiveSeedForBattle(seed) => buf
                .write_u32::<LittleEndian>(*seed)
                .map_err(io_error)?,
            Self::ReceiveGoesFirstForBattle(goes_first) => buf.push(u8::from(*goes_first)),
            Self::ReceiveMatchIdForBattle(value) | Self::ReceiveUpdatedPlayerHealth(value) => {
                write_i32(&mut buf, *value)?;
            }
            Self::ReceiveEnemyPlayerInfo {
                player_id,
                health,
                username,
            } => {
                write_i32(&mut buf, *player_id)?;
                write_i32(&mut buf, *health)?;
                write_string(&mut buf, username)?;
            }
        }
        Ok(buf)
    }

    /// Decode one frame.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] for an unknown id, a truncated or
    /// oversized payload, or trailing bytes.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(frame);
        let message = match reader.read_u8().map_err(io_error)? {
            id::RECEIVE_PLAYER_ID => Self::ReceivePlayerId {
                player_id: read_i32(&mut reader)?,
                health: read_i32(&mut reader)?,
            },
            id::BEGIN_PURCHASE_PHASE => Self::BeginPurchasePhase,
            id::BEGIN_BATTLE_PHASE => Self::BeginBattlePhase,
            id::RECEIVE_UNIT_TYPES_FOR_FIELD => {
                Self::ReceiveUnitTypesForField(read_roster(&mut reader)?)
            }
            id::RECEIVE_ENEMY_UNIT_TYPES_FOR_ENEMY_FIELD => {
                Self::ReceiveEnemyUnitTypesForEnemyField(read_roster(&mut reader)?)
            }
            id::RECEIVE_SEED_FOR_BATTLE => {
                Self::ReceiveSeedForBattle(reader.read_u32::<LittleEndian>().map_err(io_error)?)
            }
            id::RECEIVE_GOES_FIRST_FOR_BATTLE => {
                Self::ReceiveGoesFirstForBattle(read_bool(&mut reader)?)
            }
            id::RECEIVE_MATCH_ID_FOR_BATTLE => Self::ReceiveMatchIdForBattle(read_i32(&mut reader)?),
            id::RECEIVE_ENEMY_PLAYER_INFO => Self::ReceiveEnemyPlayerInfo {
                player_id: read_i32(&mut reader)?,
                health: read_i32(&mut reader)?,
                username: read_string(&mut reader)?,
            },
            id::RECEIVE_UPDATED_PLAYER_HEALTH => {
                Self::ReceiveUpdatedPlayerHealth(read_i32(&mut reader)?)
            }
            id::YOU_WIN_THE_GAME => Self::YouWinTheGame,
            id::YOU_LOSE_THE_GAME => Self::YouLoseTheGame,
            other => {
                return Err(GameError::Protocol(format!(
                    "unknown client-bound message id {other}"
                )))
            }
        };
        expect_end(&reader)?;
        Ok(message)
    }
}

impl ServerBound {
    /// Message id byte.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::ClientReady { .. } => id::CLIENT_READY,
            Self::ClientCompletePurchasePhase => id::CLIENT_COMPLETE_PURCHASE_PHASE,
            Self::ClientCompleteBattlePhase => id::CLIENT_COMPLETE_BATTLE_PHASE,
            Self::WinnerOfMatchBeingReported(_) => id::WINNER_OF_MATCH_BEING_REPORTED,
        }
    }

    /// Encode into one frame. The report's ignore flag does not travel.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] if the username is too long.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![self.id()];
        match self {
            Self::ClientReady { username } => write_string(&mut buf, username)?,
            Self::ClientCompletePurchasePhase | Self::ClientCompleteBattlePhase => {}
            Self::WinnerOfMatchBeingReported(report) => {
                write_i32(&mut buf, report.winning_player_id)?;
                write_i32(&mut buf, report.losing_player_id)?;
                write_i32(&mut buf, report.damage_dealt_to_losing_player)?;
                write_i32(&mut buf, report.match_id)?;
            }
        }
        Ok(buf)
    }

    /// Decode one frame.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] for an unknown id, a truncated or
    /// oversized payload, or trailing bytes.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(frame);
        let message = match reader.read_u8().map_err(io_error)? {
            id::CLIENT_READY => Self::ClientReady {
                username: read_string(&mut reader)?,
            },
            id::CLIENT_COMPLETE_PURCHASE_PHASE => Self::ClientCompletePurchasePhase,
            id::CLIENT_COMPLETE_BATTLE_PHASE => Self::ClientCompleteBattlePhase,
            id::WINNER_OF_MATCH_BEING_REPORTED => {
                Self::WinnerOfMatchBeingReported(MatchReport::new(
                    read_i32(&mut reader)?,
                    read_i32(&mut reader)?,
                    read_i32(&mut reader)?,
                    read_i32(&mut reader)?,
                ))
            }
            other => {
                return Err(GameError::Protocol(format!(
                    "unknown server-bound message id {other}"
                )))
            }
        };
        expect_end(&reader)?;
        Ok(message)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn io_error(error: std::io::Error) -> GameError {
    GameError::Protocol(format!("truncated frame: {error}"))
}

fn write_i32(buf: &mut Vec<u8>, value: i32) -> Result<()> {
    buf.write_i32::<LittleEndian>(value).map_err(io_error)
}

fn read_i32(reader: &mut Cursor<&[u8]>) -> Result<i32> {
    reader.read_i32::<LittleEndian>().map_err(io_error)
}

fn read_bool(reader: &mut Cursor<&[u8]>) -> Result<bool> {
    match reader.read_u8().map_err(io_error)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(GameError::Protocol(format!("invalid bool byte {other}"))),
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    if value.len() > MAX_STRING_BYTES {
        return Err(GameError::Protocol(format!(
            "string of {} bytes exceeds {MAX_STRING_BYTES}",
            value.len()
        )));
    }
    write_i32(buf, value.len() as i32)?;
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn read_string(reader: &mut Cursor<&[u8]>) -> Result<String> {
    let len = read_len(reader, MAX_STRING_BYTES, "string")?;
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes).map_err(io_error)?;
    String::from_utf8(bytes).map_err(|e| GameError::Protocol(format!("invalid UTF-8: {e}")))
}

fn write_roster(buf: &mut Vec<u8>, roster: &[RosterEntry]) -> Result<()> {
    if roster.len() > MAX_ROSTER_LEN {
        return Err(GameError::Protocol(format!(
            "roster of {} units exceeds {MAX_ROSTER_LEN}",
            roster.len()
        )));
    }
    write_i32(buf, roster.len() as i32)?;
    for entry in roster {
        write_i32(buf, entry.job_type)?;
        write_i32(buf, entry.unit_id)?;
        write_i32(buf, entry.slot_id)?;
    }
    Ok(())
}

fn read_roster(reader: &mut Cursor<&[u8]>) -> Result<Vec<RosterEntry>> {
    let len = read_len(reader, MAX_ROSTER_LEN, "roster")?;
    (0..len)
        .map(|_| {
            Ok(RosterEntry {
                job_type: read_i32(reader)?,
                unit_id: read_i32(reader)?,
                slot_id: read_i32(reader)?,
            })
        })
        .collect()
}

fn read_len(reader: &mut Cursor<&[u8]>, max: usize, what: &str) -> Result<usize> {
    let len = read_i32(reader)?;
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= max)
        .ok_or_else(|| GameError::Protocol(format!("invalid {what} length {len}")))
}

fn expect_end(reader: &Cursor<&[u8]>) -> Result<()> {
    let consumed = reader.position();
    let total = reader.get_ref().len() as u64;
    if consumed == total {
        Ok(())
    } else {
        Err(GameError::Protocol(format!(
            "{} trailing bytes after message",
            total - consumed
        )))
    }
}
