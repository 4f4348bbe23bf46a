//! Tactics Arena - local session
//!
//! Runs a coordinator and a handful of bot clients in one process.
//! Usage: `tactics_server [config.ron]`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tactics_core::data::GameData;
use tactics_server::{run_bot, LocalServer, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(&PathBuf::from(path))?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        max_players = config.max_players,
        local_clients = config.local_clients,
        realtime = config.realtime,
        "Starting Tactics Arena session"
    );

    let data = Arc::new(GameData::load_from_dir(&config.data_dir)?);
    let frame = config
        .realtime
        .then(|| Duration::from_secs_f64(config.frame_seconds()));

    let mut server = LocalServer::new(config.clone(), Arc::clone(&data));
    let bots: Vec<_> = (0..config.local_clients)
        .map(|i| {
            let link = server.connect();
            let session = config.client_session(Arc::clone(&data), format!("bot-{i}"));
            tokio::spawn(run_bot(session, link, frame))
        })
        .collect();

    let summary = server.run().await?;
    for bot in bots {
        match bot.await? {
            Ok(result) => tracing::info!(
                username = %result.username,
                player_id = ?result.player_id,
                outcome = ?result.outcome,
                "Bot finished"
            ),
            Err(e) => tracing::warn!(error = %e, "Bot failed"),
        }
    }

    match summary.winner {
        Some(winner) => tracing::info!(winner, rounds = summary.rounds, "Game over"),
        None => tracing::info!(rounds = summary.rounds, "Game over without a winner"),
    }
    Ok(())
}
