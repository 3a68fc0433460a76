//! Ascnd ranking client
//!
//! Wraps a [`LeaderboardTransport`] with request validation, per-call
//! deadlines, caller cancellation and an exactly-once close.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, ClientOptions, MAX_TIMEOUT};
use crate::error::{AscndError, RemoteError, Result};
use crate::lifecycle::Lifecycle;
use crate::models::{
    LeaderboardPage, LeaderboardQuery, RankQuery, RankResult, ScoreSubmission, SubmissionResult,
    DEFAULT_PAGE_LIMIT,
};
use crate::transport::{GrpcTransport, LeaderboardTransport};

/// Client for the Ascnd leaderboard service
///
/// Share one instance across tasks (e.g. behind an `Arc`); every method takes
/// `&self`. Once closed, every call fails with [`AscndError::Closed`].
#[derive(Debug)]
pub struct RankingClient<T = GrpcTransport> {
    config: ClientConfig,
    transport: T,
    lifecycle: Lifecycle,
}

impl RankingClient<GrpcTransport> {
    /// Client for the production endpoint with default settings
    ///
    /// Fails before any network activity if the key is blank. Must be called
    /// from within a Tokio runtime; the channel connects on first use.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_options(ClientOptions::new(api_key))
    }

    pub fn from_options(options: ClientOptions) -> Result<Self> {
        Self::from_config(options.validate()?)
    }

    /// Client configured from `ASCND_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = GrpcTransport::connect_lazy(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: LeaderboardTransport> RankingClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        info!(
            endpoint = %config.endpoint(),
            timeout_ms = config.request_timeout().as_millis() as u64,
            "Ascnd client ready"
        );

        Self {
            config,
            transport,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    /// Reports `Closed` ahead of argument validation; `invoke` re-checks on entry.
    fn ensure_open(&self) -> Result<()> {
        if self.lifecycle.is_closed() {
            return Err(AscndError::Closed);
        }
        Ok(())
    }

    // ============================================
    // SubmitScore
    // ============================================

    pub async fn submit_score(&self, submission: ScoreSubmission) -> Result<SubmissionResult> {
        self.submit_score_inner(submission, None).await
    }

    pub async fn submit_score_cancellable(
        &self,
        submission: ScoreSubmission,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        self.submit_score_inner(submission, Some(cancel)).await
    }

    /// Shorthand for a submission without metadata or idempotency key
    pub async fn submit(
        &self,
        leaderboard_id: impl Into<String>,
        player_id: impl Into<String>,
        score: i64,
    ) -> Result<SubmissionResult> {
        self.submit_score(ScoreSubmission::new(leaderboard_id, player_id, score))
            .await
    }

    async fn submit_score_inner(
        &self,
        submission: ScoreSubmission,
        cancel: Option<&CancellationToken>,
    ) -> Result<SubmissionResult> {
        self.ensure_open()?;
        let message = submission.into_request()?;

        let response = self
            .invoke("SubmitScore", message, cancel, |req| {
                self.transport.submit_score(req)
            })
            .await?;

        Ok(SubmissionResult::from(response))
    }

    // ============================================
    // GetLeaderboard
    // ============================================

    pub async fn get_leaderboard(&self, query: LeaderboardQuery) -> Result<LeaderboardPage> {
        self.get_leaderboard_inner(query, None).await
    }

    pub async fn get_leaderboard_cancellable(
        &self,
        query: LeaderboardQuery,
        cancel: &CancellationToken,
    ) -> Result<LeaderboardPage> {
        self.get_leaderboard_inner(query, Some(cancel)).await
    }

    /// Fetch one page; `limit` defaults to 10
    pub async fn get_leaderboard_page(
        &self,
        leaderboard_id: impl Into<String>,
        limit: Option<i32>,
        cursor: Option<String>,
    ) -> Result<LeaderboardPage> {
        let query = LeaderboardQuery {
            limit: Some(limit.unwrap_or(DEFAULT_PAGE_LIMIT)),
            cursor,
            ..LeaderboardQuery::new(leaderboard_id)
        };
        self.get_leaderboard(query).await
    }

    async fn get_leaderboard_inner(
        &self,
        query: LeaderboardQuery,
        cancel: Option<&CancellationToken>,
    ) -> Result<LeaderboardPage> {
        self.ensure_open()?;
        let message = query.into_request()?;

        let response = self
            .invoke("GetLeaderboard", message, cancel, |req| {
                self.transport.get_leaderboard(req)
            })
            .await?;

        Ok(LeaderboardPage::try_from(response)?)
    }

    // ============================================
    // GetPlayerRank
    // ============================================

    pub async fn get_player_rank(&self, query: RankQuery) -> Result<RankResult> {
        self.get_player_rank_inner(query, None).await
    }

    pub async fn get_player_rank_cancellable(
        &self,
        query: RankQuery,
        cancel: &CancellationToken,
    ) -> Result<RankResult> {
        self.get_player_rank_inner(query, Some(cancel)).await
    }

    async fn get_player_rank_inner(
        &self,
        query: RankQuery,
        cancel: Option<&CancellationToken>,
    ) -> Result<RankResult> {
        self.ensure_open()?;
        let message = query.into_request()?;

        let response = self
            .invoke("GetPlayerRank", message, cancel, |req| {
                self.transport.get_player_rank(req)
            })
            .await?;

        Ok(RankResult::try_from(response)?)
    }

    // ============================================
    // Shared call path
    // ============================================

    /// Run one unary call under the configured deadline
    ///
    /// The deadline travels as `grpc-timeout` and is also enforced locally.
    /// Teardown and caller cancellation take precedence over the response.
    async fn invoke<Req, Resp, F, Fut>(
        &self,
        method: &'static str,
        message: Req,
        cancel: Option<&CancellationToken>,
        send: F,
    ) -> Result<Resp>
    where
        F: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = std::result::Result<Response<Resp>, Status>>,
    {
        let _in_flight = self.lifecycle.enter()?;

        let timeout = self.config.request_timeout();
        let deadline = deadline_after(timeout);
        let mut request = Request::new(message);
        request.set_timeout(timeout);

        let started = Instant::now();
        let caller_cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = self.lifecycle.aborted() => Err(AscndError::Closed),
            _ = caller_cancelled => Err(AscndError::Cancelled),
            result = tokio::time::timeout_at(deadline, send(request)) => match result {
                Ok(Ok(response)) => Ok(response.into_inner()),
                Ok(Err(status)) => Err(AscndError::Remote(RemoteError::from(status))),
                Err(_) => Err(AscndError::Remote(RemoteError::deadline_exceeded(timeout))),
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => debug!(method, elapsed_ms, "Ascnd call completed"),
            Err(AscndError::Remote(remote)) => warn!(
                method,
                elapsed_ms,
                code = ?remote.code(),
                status = remote.status_code(),
                message = %remote.message(),
                "Ascnd call failed"
            ),
            Err(other) => debug!(method, elapsed_ms, error = %other, "Ascnd call abandoned"),
        }

        outcome
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Close the client and release the connection
    ///
    /// Idempotent and safe to call from many threads at once; only the first
    /// call tears down. Calls still in flight fail with [`AscndError::Closed`].
    pub fn close(&self) {
        if !self.lifecycle.begin_close() {
            return;
        }

        self.lifecycle.abort_in_flight();
        self.transport.release();
        info!(in_flight = self.lifecycle.in_flight(), "Ascnd client closed");
    }

    /// Close the client, letting in-flight calls finish first
    ///
    /// Waits at most one request timeout before aborting whatever is still
    /// running. Idempotent like [`close`](Self::close).
    pub async fn shutdown(&self) {
        if !self.lifecycle.begin_close() {
            return;
        }

        let grace = self.config.request_timeout();
        let drained = self.lifecycle.wait_drained(deadline_after(grace)).await;
        if !drained {
            warn!(
                in_flight = self.lifecycle.in_flight(),
                grace_ms = grace.as_millis() as u64,
                "Aborting Ascnd calls still running at shutdown"
            );
        }

        self.lifecycle.abort_in_flight();
        self.transport.release();
        info!("Ascnd client shut down");
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + MAX_TIMEOUT)
}
