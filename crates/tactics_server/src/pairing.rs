//! Battle-phase pairing.

use tactics_core::error::{GameError, Result};

use crate::player::Player;

/// Two players meeting in one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    /// Shared match id.
    pub match_id: i32,
    /// Index of one participant in the player list.
    pub first: usize,
    /// Index of the other participant.
    pub second: usize,
}

/// Reset every match id, then pair players for the coming battle phase.
///
/// 1. Alive humans are paired with each other two at a time.
/// 2. An odd human left over faces an alive AI, or a dead AI if no alive
///    AI exists.
/// 3. Remaining alive AI are paired with each other two at a time.
/// 4. An odd alive AI left over faces a dead AI.
///
/// Dead humans are never paired. Every returned match has exactly two
/// participants and no player is in two matches.
///
/// # Errors
///
/// Returns [`GameError::PairingFailed`] when a leftover player has nobody
/// to face.
pub fn assign_match_ids_for_players(players: &mut [Player]) -> Result<Vec<Pairing>> {
    for player in players.iter_mut() {
        player.match_id = None;
    }

    let humans = indices(players, |p| p.is_human() && p.is_alive());
    let mut alive_ai = indices(players, |p| !p.is_human() && p.is_alive());
    let mut dead_ai = indices(players, |p| !p.is_human() && !p.is_alive());

    let mut pairs = Vec::new();
    let mut human_chunks = humans.chunks_exact(2);
    for chunk in human_chunks.by_ref() {
        pairs.push((chunk[0], chunk[1]));
    }

    if let [odd_human] = human_chunks.remainder() {
        let opponent = if alive_ai.is_empty() {
            take_first(&mut dead_ai)
        } else {
            take_first(&mut alive_ai)
        };
        let opponent = opponent.ok_or_else(|| {
            GameError::PairingFailed(format!(
                "player {} has no AI opponent",
                players[*odd_human].id
            ))
        })?;
        pairs.push((*odd_human, opponent));
    }

    let mut ai_chunks = alive_ai.chunks_exact(2);
    for chunk in ai_chunks.by_ref() {
        pairs.push((chunk[0], chunk[1]));
    }

    if let [odd_ai] = ai_chunks.remainder() {
        let opponent = take_first(&mut dead_ai).ok_or_else(|| {
            GameError::PairingFailed(format!(
                "AI player {} has no dead AI opponent",
                players[*odd_ai].id
            ))
        })?;
        pairs.push((*odd_ai, opponent));
    }

    let pairings: Vec<Pairing> = pairs
        .into_iter()
        .zip(0..)
        .map(|((first, second), match_id)| Pairing {
            match_id,
            first,
            second,
        })
        .collect();
    for pairing in &pairings {
        players[pairing.first].match_id = Some(pairing.match_id);
        players[pairing.second].match_id = Some(pairing.match_id);
    }

    tracing::debug!(matches = pairings.len(), "Players paired");
    Ok(pairings)
}

fn indices(players: &[Player], pred: impl Fn(&Player) -> bool) -> Vec<usize> {
    players
        .iter()
        .enumerate()
        .filter(|(_, p)| pred(p))
        .map(|(i, _)| i)
        .collect()
}

fn take_first(indices: &mut Vec<usize>) -> Option<usize> {
    if indices.is_empty() {
        None
    } else {
        Some(indices.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ConnectionId, Controller};

    fn players(humans: usize, alive_ai: usize, dead_ai: usize) -> Vec<Player> {
        let mut players = Vec::new();
        let mut id = 0;
        for _ in 0..humans {
            let connection = ConnectionId(id as u32);
            players.push(Player::new(id, "h", 10, Controller::Human(connection)));
            id += 1;
        }
        for _ in 0..alive_ai {
            players.push(Player::new(id, "ai", 10, Controller::Ai));
            id += 1;
        }
        for _ in 0..dead_ai {
            let mut player = Player::new(id, "dead", 10, Controller::Ai);
            player.lose_health(10);
            players.push(player);
            id += 1;
        }
        players
    }

    #[test]
    fn test_humans_paired_together_first() {
        let mut players = players(2, 2, 0);
        let pairs = assign_match_ids_for_players(&mut players).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
        assert_eq!((pairs[1].first, pairs[1].second), (2, 3));
        assert_eq!(players[0].match_id, players[1].match_id);
    }

    #[test]
    fn test_odd_human_prefers_alive_ai() {
        let mut players = players(1, 1, 1);
        let pairs = assign_match_ids_for_players(&mut players).unwrap();
        assert_eq!(
            pairs,
            vec![Pairing {
                match_id: 0,
                first: 0,
                second: 1
            }]
        );
        assert_eq!(players[2].match_id, None);
    }

    #[test]
    fn test_odd_human_falls_back_to_dead_ai() {
        let mut players = players(1, 0, 2);
        let pairs = assign_match_ids_for_players(&mut players).unwrap();
        assert_eq!(
            pairs,
            vec![Pairing {
                match_id: 0,
                first: 0,
                second: 1
            }]
        );
    }

    #[test]
    fn test_odd_ai_faces_dead_ai() {
        let mut players = players(0, 3, 1);
        let pairs = assign_match_ids_for_players(&mut players).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[1].first, pairs[1].second), (2, 3));
    }

    #[test]
    fn test_lonely_human_fails() {
        let mut players = players(1, 0, 0);
        let result = assign_match_ids_for_players(&mut players);
        assert!(matches!(result, Err(GameError::PairingFailed(_))));
    }

    #[test]
    fn test_dead_humans_sit_out_and_ids_reset() {
        let mut players = players(3, 2, 0);
        players[2].lose_health(10);
        players[2].match_id = Some(9);
        let pairs = assign_match_ids_for_players(&mut players).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(players[2].match_id, None);
    }
}
