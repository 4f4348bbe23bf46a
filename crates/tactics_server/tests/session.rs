//! Full sessions over the in-process transport, plus pairing properties.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tactics_core::client::GameOutcome;
use tactics_server::pairing::assign_match_ids_for_players;
use tactics_server::player::{ConnectionId, Controller, Player};
use tactics_server::{run_bot, LocalServer, ServerConfig};
use tactics_test_utils::fixtures::shipped_data;
use tactics_test_utils::strategies::arb_player_mix;

fn fast_config(max_players: usize) -> ServerConfig {
    ServerConfig {
        max_players,
        starting_health: 3,
        realtime: false,
        ..ServerConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_three_bots_play_to_the_end() {
    let data = shipped_data();
    let config = fast_config(4);
    let mut server = LocalServer::new(config.clone(), Arc::clone(&data));
    let bots: Vec<_> = (0..3)
        .map(|i| {
            let link = server.connect();
            let session = config.client_session(Arc::clone(&data), format!("bot-{i}"));
            tokio::spawn(run_bot(session, link, None))
        })
        .collect();

    let summary = tokio::time::timeout(Duration::from_secs(120), server.run())
        .await
        .expect("session timed out")
        .unwrap();

    let mut results = Vec::new();
    for bot in bots {
        results.push(bot.await.unwrap().unwrap());
    }

    assert!(summary.rounds >= 1);
    let mut ids: Vec<i32> = results.iter().filter_map(|r| r.player_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);

    let winners: Vec<_> = results
        .iter()
        .filter(|r| r.outcome == Some(GameOutcome::Won))
        .collect();
    assert!(winners.len() <= 1);
    if let Some(winner) = winners.first() {
        assert_eq!(summary.winner, winner.player_id);
    }
    // Anyone who was told nothing was still alive when the game ended.
    for result in &results {
        if result.outcome.is_none() {
            assert_ne!(summary.winner, result.player_id);
        }
    }
}

#[tokio::test]
async fn test_session_with_realtime_pacing() {
    let data = shipped_data();
    let config = ServerConfig {
        max_players: 2,
        starting_health: 1,
        tick_rate: 200,
        realtime: true,
        ..ServerConfig::default()
    };
    let frame = Duration::from_secs_f64(config.frame_seconds());
    let session = config.client_session(Arc::clone(&data), "paced");
    let mut server = LocalServer::new(config, Arc::clone(&data));
    let link = server.connect();
    let bot = tokio::spawn(run_bot(session, link, Some(frame)));

    let summary = tokio::time::timeout(Duration::from_secs(120), server.run())
        .await
        .expect("session timed out")
        .unwrap();
    let bot = bot.await.unwrap().unwrap();

    // One hit point: the first decided match ends the game.
    assert!(summary.winner.is_some());
    assert!(bot.outcome.is_some());
}

fn mixed_players(humans: usize, alive_ai: usize, dead_ai: usize) -> Vec<Player> {
    let mut players = Vec::new();
    for i in 0..humans + alive_ai + dead_ai {
        let id = i32::try_from(i).unwrap();
        let controller = if i < humans {
            Controller::Human(ConnectionId(id as u32))
        } else {
            Controller::Ai
        };
        let mut player = Player::new(id, format!("p{id}"), 5, controller);
        if i >= humans + alive_ai {
            player.lose_health(5);
        }
        players.push(player);
    }
    players
}

proptest! {
    #[test]
    fn prop_every_living_player_gets_exactly_one_match(mix in arb_player_mix()) {
        let mut players = mixed_players(mix.humans, mix.alive_ai, mix.dead_ai);
        let pairings = assign_match_ids_for_players(&mut players).unwrap();

        let mut seen = std::collections::BTreeSet::new();
        for pairing in &pairings {
            prop_assert_ne!(pairing.first, pairing.second);
            prop_assert!(seen.insert(pairing.first));
            prop_assert!(seen.insert(pairing.second));
            prop_assert_eq!(players[pairing.first].match_id, Some(pairing.match_id));
            prop_assert_eq!(players[pairing.second].match_id, Some(pairing.match_id));
        }
        for (index, player) in players.iter().enumerate() {
            if player.is_alive() {
                prop_assert!(seen.contains(&index), "living player {} unpaired", player.id);
            }
            if player.is_human() && !player.is_alive() {
                prop_assert_eq!(player.match_id, None);
            }
        }
    }

    #[test]
    fn prop_humans_meet_humans_first(mix in arb_player_mix()) {
        let mut players = mixed_players(mix.humans, mix.alive_ai, mix.dead_ai);
        let pairings = assign_match_ids_for_players(&mut players).unwrap();
        let human_pairs = pairings
            .iter()
            .filter(|p| players[p.first].is_human() && players[p.second].is_human())
            .count();
        prop_assert_eq!(human_pairs, mix.humans / 2);
    }
}
