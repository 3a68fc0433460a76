//! Print the top of a leaderboard
//!
//! ```bash
//! ASCND_API_KEY=key_live_... cargo run -p ascnd-client --example get_leaderboard -- weekly-highscores
//! ```

use anyhow::Context;
use ascnd_client::RankingClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let leaderboard_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "weekly-highscores".to_string());

    let client = RankingClient::from_env()?;
    let page = client
        .get_leaderboard_page(&leaderboard_id, Some(10), None)
        .await
        .with_context(|| format!("failed to read leaderboard {}", leaderboard_id));
    client.close();
    let page = page?;

    println!("Top {} of {} on {}:", page.entries.len(), page.total_entries, leaderboard_id);
    for entry in &page.entries {
        println!("  #{:<4} {:<24} {}", entry.rank, entry.player_id, entry.score);
    }
    if page.has_more {
        println!("  ... more entries available");
    }

    Ok(())
}
