//! Look up a player's rank
//!
//! ```bash
//! ASCND_API_KEY=key_live_... cargo run -p ascnd-client --example get_player_rank -- weekly-highscores player_example_001
//! ```

use anyhow::Context;
use ascnd_client::{PeriodSelector, RankQuery, RankingClient};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let leaderboard_id = args.next().unwrap_or_else(|| "weekly-highscores".to_string());
    let player_id = args.next().unwrap_or_else(|| "player_example_001".to_string());

    let client = RankingClient::from_env()?;
    let query = RankQuery::new(&leaderboard_id, &player_id).period(PeriodSelector::Current);
    let result = client.get_player_rank(query).await.context("rank lookup failed");
    client.shutdown().await;

    let result = result?;
    match &result.standing {
        Some(standing) => {
            println!(
                "{} is #{} of {} (score {})",
                player_id, standing.rank, result.total_entries, standing.score
            );
            if let Some(best) = standing.best_score {
                println!("Personal best: {}", best);
            }
            if let Some(percentile) = &standing.percentile {
                println!("Percentile: {}", percentile);
            }
        }
        None => println!("{} has no score on {} yet", player_id, leaderboard_id),
    }

    Ok(())
}
