//! Submit a score and print the resulting rank
//!
//! ```bash
//! ASCND_API_KEY=key_live_... cargo run -p ascnd-client --example submit_score
//! ```

use anyhow::Context;
use ascnd_client::{RankingClient, ScoreSubmission};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LEADERBOARD_ID: &str = "weekly-highscores";
const PLAYER_ID: &str = "player_example_001";
const SCORE: i64 = 42500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = RankingClient::from_env().context("failed to configure the Ascnd client")?;

    info!(leaderboard = LEADERBOARD_ID, player = PLAYER_ID, score = SCORE, "Submitting score");

    let submission = ScoreSubmission::new(LEADERBOARD_ID, PLAYER_ID, SCORE)
        .with_metadata(br#"{"character":"warrior","level":15}"#.to_vec());
    let result = client.submit_score(submission).await;

    client.shutdown().await;

    let result = result.context("score submission failed")?;
    println!("Score submitted!");
    println!("{}", result);

    if let Some(anticheat) = &result.anticheat {
        if !anticheat.passed {
            println!("Flagged by anticheat ({})", anticheat.action);
        }
    }

    Ok(())
}
