//! Transport seam between the client and the wire
//!
//! [`RankingClient`](crate::RankingClient) talks to the service only through
//! [`LeaderboardTransport`]. The production implementation is
//! [`GrpcTransport`]; tests substitute an in-memory one.

use ascnd_proto::v1::{
    AscndServiceClient, GetLeaderboardRequest, GetLeaderboardResponse, GetPlayerRankRequest,
    GetPlayerRankResponse, SubmitScoreRequest, SubmitScoreResponse,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::interceptor::ApiKeyInterceptor;

/// One unary call per method, plus a teardown hook
///
/// Implementations must be safe to call concurrently through `&self`.
#[async_trait]
pub trait LeaderboardTransport: Send + Sync {
    async fn submit_score(
        &self,
        request: Request<SubmitScoreRequest>,
    ) -> Result<Response<SubmitScoreResponse>, Status>;

    async fn get_leaderboard(
        &self,
        request: Request<GetLeaderboardRequest>,
    ) -> Result<Response<GetLeaderboardResponse>, Status>;

    async fn get_player_rank(
        &self,
        request: Request<GetPlayerRankRequest>,
    ) -> Result<Response<GetPlayerRankResponse>, Status>;

    /// Release the underlying connection. Called at most once per client.
    fn release(&self);
}

type AuthedStub = AscndServiceClient<InterceptedService<Channel, ApiKeyInterceptor>>;

/// gRPC transport over a single lazily-connected tonic channel
///
/// The stub is cloned out per call under a short read lock; clones share the
/// channel. `release` takes the stub out of its slot, so the channel and its
/// connection drop once the last in-flight clone finishes.
#[derive(Debug)]
pub struct GrpcTransport {
    stub: RwLock<Option<AuthedStub>>,
    endpoint: String,
}

impl GrpcTransport {
    /// Build the channel without connecting
    ///
    /// The connection is established on the first call. Must be called from
    /// within a Tokio runtime.
    pub fn connect_lazy(config: &ClientConfig) -> Result<Self, ConfigError> {
        let interceptor = ApiKeyInterceptor::new(config.api_key())?;
        let channel = config.make_endpoint()?.connect_lazy();

        debug!(endpoint = %config.endpoint(), tls = config.uses_tls(), "Created lazy Ascnd channel");

        Ok(Self {
            stub: RwLock::new(Some(AscndServiceClient::with_interceptor(
                channel,
                interceptor,
            ))),
            endpoint: config.endpoint().to_string(),
        })
    }

    /// Whether `release` has dropped the channel
    pub fn is_released(&self) -> bool {
        self.stub.read().is_none()
    }

    fn stub(&self) -> Result<AuthedStub, Status> {
        self.stub
            .read()
            .clone()
            .ok_or_else(|| Status::unavailable("Ascnd channel has been released"))
    }
}

#[async_trait]
impl LeaderboardTransport for GrpcTransport {
    async fn submit_score(
        &self,
        request: Request<SubmitScoreRequest>,
    ) -> Result<Response<SubmitScoreResponse>, Status> {
        let mut client = self.stub()?;
        client.submit_score(request).await
    }

    async fn get_leaderboard(
        &self,
        request: Request<GetLeaderboardRequest>,
    ) -> Result<Response<GetLeaderboardResponse>, Status> {
        let mut client = self.stub()?;
        client.get_leaderboard(request).await
    }

    async fn get_player_rank(
        &self,
        request: Request<GetPlayerRankRequest>,
    ) -> Result<Response<GetPlayerRankResponse>, Status> {
        let mut client = self.stub()?;
        client.get_player_rank(request).await
    }

    fn release(&self) {
        if self.stub.write().take().is_some() {
            info!(endpoint = %self.endpoint, "Released Ascnd channel");
        }
    }
}
