//! Ascnd Leaderboard Client
//!
//! Async client for the Ascnd leaderboard service: submit scores, read
//! leaderboard pages and look up a player's rank over gRPC.
//!
//! ## Core Components
//!
//! - **RankingClient**: the client; cheap `&self` calls, exactly-once close
//! - **ClientOptions / ClientConfig**: raw and validated configuration
//! - **AscndError**: single error type; remote failures carry a normalized status
//! - **LeaderboardTransport**: seam over the wire, implemented by `GrpcTransport`
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ascnd_client::{LeaderboardQuery, RankingClient};
//!
//! # async fn example() -> Result<(), ascnd_client::AscndError> {
//! let client = RankingClient::new("key_live_...")?;
//!
//! let result = client.submit("weekly-highscores", "player_example_001", 42500).await?;
//! println!("{}", result);
//!
//! let page = client
//!     .get_leaderboard(LeaderboardQuery::new("weekly-highscores").limit(10))
//!     .await?;
//! for entry in &page.entries {
//!     println!("#{} {} {}", entry.rank, entry.player_id, entry.score);
//! }
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Calls emit `tracing` events under the `ascnd_client` target. Install any
//! subscriber to collect them; the API key is never logged.

pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
mod lifecycle;
pub mod models;
pub mod transport;

pub use client::RankingClient;
pub use config::{
    ClientConfig, ClientOptions, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT,
};
pub use error::{
    normalized_status, normalized_status_from_raw, AscndError, ConfigError, ErrorKind,
    RemoteError, Result,
};
pub use interceptor::{ApiKeyInterceptor, API_KEY_HEADER};
pub use models::{
    AnticheatOutcome, AnticheatViolation, Bracket, LeaderboardEntry, LeaderboardPage,
    LeaderboardQuery, LeaderboardView, PeriodBounds, PeriodSelector, PlayerStanding, RankQuery,
    RankResult, ScoreSubmission, SubmissionResult, DEFAULT_PAGE_LIMIT,
};
pub use transport::{GrpcTransport, LeaderboardTransport};

// Re-export the wire types and the cancellation token for callers and custom transports
pub use ascnd_proto as proto;
pub use tokio_util::sync::CancellationToken;
