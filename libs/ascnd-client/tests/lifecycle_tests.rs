//! Lifecycle and call-path tests
//!
//! A mockall transport with no expectations panics on any call, which is how
//! these tests prove that nothing reaches the wire.

use ascnd_client::proto::v1::{
    GetLeaderboardRequest, GetLeaderboardResponse, GetPlayerRankRequest, GetPlayerRankResponse,
    SubmitScoreRequest, SubmitScoreResponse,
};
use ascnd_client::{
    AscndError, CancellationToken, ClientConfig, ClientOptions, ErrorKind, LeaderboardQuery,
    LeaderboardTransport, RankQuery, RankingClient, ScoreSubmission,
};
use async_trait::async_trait;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tonic::{Code, Request, Response, Status};

mock! {
    pub Transport {}

    #[async_trait]
    impl LeaderboardTransport for Transport {
        async fn submit_score(&self, request: Request<SubmitScoreRequest>) -> Result<Response<SubmitScoreResponse>, Status>;
        async fn get_leaderboard(&self, request: Request<GetLeaderboardRequest>) -> Result<Response<GetLeaderboardResponse>, Status>;
        async fn get_player_rank(&self, request: Request<GetPlayerRankRequest>) -> Result<Response<GetPlayerRankResponse>, Status>;
        fn release(&self);
    }
}

fn test_config() -> ClientConfig {
    ClientOptions::new("test-api-key")
        .with_endpoint("http://localhost:50051")
        .with_timeout_secs(1)
        .validate()
        .expect("test config is valid")
}

fn releasing_once() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_release().times(1).return_const(());
    transport
}

async fn assert_all_calls_closed<T: LeaderboardTransport>(client: &RankingClient<T>) {
    let submit = client
        .submit_score(ScoreSubmission::new("weekly-highscores", "player_1", 10))
        .await;
    assert!(matches!(submit, Err(AscndError::Closed)));

    let page = client
        .get_leaderboard(LeaderboardQuery::new("weekly-highscores"))
        .await;
    assert!(matches!(page, Err(AscndError::Closed)));

    let rank = client
        .get_player_rank(RankQuery::new("weekly-highscores", "player_1"))
        .await;
    assert!(matches!(rank, Err(AscndError::Closed)));
}

// ============================================
// Close semantics
// ============================================

#[tokio::test]
async fn test_calls_after_close_never_reach_transport() {
    let client = RankingClient::with_transport(test_config(), releasing_once());

    client.close();
    assert!(client.is_closed());
    assert_all_calls_closed(&client).await;

    client.close();
    client.close();
    assert_all_calls_closed(&client).await;
}

#[tokio::test]
async fn test_closed_error_kind() {
    let client = RankingClient::with_transport(test_config(), releasing_once());
    client.close();

    let err = client.submit("weekly", "player_1", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    assert_eq!(err.status_code(), None);
}

#[test]
fn test_concurrent_close_from_threads_tears_down_once() {
    let client = Arc::new(RankingClient::with_transport(test_config(), releasing_once()));

    std::thread::scope(|scope| {
        for _ in 0..16 {
            let client = Arc::clone(&client);
            scope.spawn(move || client.close());
        }
    });

    assert!(client.is_closed());
    // `times(1)` on release is verified when the mock drops here
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shutdown_from_tasks_tears_down_once() {
    let client = Arc::new(RankingClient::with_transport(test_config(), releasing_once()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    client.shutdown().await;
                } else {
                    client.close();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("close task panicked");
    }

    assert!(client.is_closed());
}

#[tokio::test]
async fn test_shutdown_after_close_is_noop() {
    let client = RankingClient::with_transport(test_config(), releasing_once());

    client.close();
    client.shutdown().await;
    client.shutdown().await;

    assert_all_calls_closed(&client).await;
}

#[tokio::test]
async fn test_closed_reported_before_argument_errors() {
    let client = RankingClient::with_transport(test_config(), releasing_once());
    client.close();

    let err = client
        .submit_score(ScoreSubmission::new("", "", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AscndError::Closed));

    let err = client
        .get_player_rank(RankQuery::new("weekly", " "))
        .await
        .unwrap_err();
    assert!(matches!(err, AscndError::Closed));
}

#[tokio::test]
async fn test_maximum_timeout_does_not_overflow_deadlines() {
    let config = ClientOptions::new("test-api-key")
        .with_endpoint("http://localhost:50051")
        .with_timeout_secs(i64::MAX)
        .validate()
        .unwrap();

    let mut transport = releasing_once();
    transport
        .expect_submit_score()
        .withf(|req: &Request<SubmitScoreRequest>| {
            req.metadata().get("grpc-timeout").is_some()
        })
        .times(1)
        .returning(|_| {
            Ok(Response::new(SubmitScoreResponse {
                score_id: "score_max".to_string(),
                rank: 1,
                is_new_best: true,
                was_deduplicated: false,
                anticheat: None,
            }))
        });

    let client = RankingClient::with_transport(config, transport);
    let result = client.submit("lb", "p", 1).await.unwrap();
    assert_eq!(result.score_id, "score_max");

    client.shutdown().await;
    assert!(client.is_closed());
}

// ============================================
// Argument validation
// ============================================

#[tokio::test]
async fn test_missing_fields_rejected_before_transport() {
    let client = RankingClient::with_transport(test_config(), MockTransport::new());

    let err = client
        .submit_score(ScoreSubmission::new("weekly", "", 100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AscndError::InvalidArgument {
            field: "player_id",
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = client
        .get_leaderboard(LeaderboardQuery::new(" "))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AscndError::InvalidArgument {
            field: "leaderboard_id",
            ..
        }
    ));

    let err = client
        .get_player_rank(RankQuery::new("weekly", ""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ============================================
// Request shaping and error mapping
// ============================================

#[tokio::test]
async fn test_submission_forwarded_with_deadline() {
    let mut transport = MockTransport::new();
    transport
        .expect_submit_score()
        .withf(|req: &Request<SubmitScoreRequest>| {
            let msg = req.get_ref();
            req.metadata().get("grpc-timeout").is_some()
                && msg.leaderboard_id == "weekly-highscores"
                && msg.player_id == "player_example_001"
                && msg.score == 42500
                && msg.metadata.as_deref() == Some(&b"{\"level\":3}"[..])
                && msg.idempotency_key.as_deref() == Some("run-77")
        })
        .times(1)
        .returning(|_| {
            Ok(Response::new(SubmitScoreResponse {
                score_id: "score_abc".to_string(),
                rank: 2,
                is_new_best: true,
                was_deduplicated: false,
                anticheat: None,
            }))
        });

    let client = RankingClient::with_transport(test_config(), transport);
    let submission = ScoreSubmission::new("weekly-highscores", "player_example_001", 42500)
        .with_metadata(&b"{\"level\":3}"[..])
        .with_idempotency_key("run-77");

    let result = client.submit_score(submission).await.unwrap();
    assert_eq!(result.rank, 2);
    assert!(result.is_new_best);
    assert_eq!(result.score_id, "score_abc");
}

#[tokio::test]
async fn test_remote_status_is_normalized() {
    let cases = [
        (Code::NotFound, 404),
        (Code::PermissionDenied, 403),
        (Code::ResourceExhausted, 429),
        (Code::Unauthenticated, 401),
        (Code::DeadlineExceeded, 504),
        (Code::Internal, 500),
    ];

    for (code, expected) in cases {
        let mut transport = MockTransport::new();
        transport
            .expect_get_player_rank()
            .times(1)
            .returning(move |_| Err(Status::new(code, "rejected by service")));

        let client = RankingClient::with_transport(test_config(), transport);
        let err = client
            .get_player_rank(RankQuery::new("weekly", "player_1"))
            .await
            .unwrap_err();

        match err {
            AscndError::Remote(remote) => {
                assert_eq!(remote.status_code(), expected, "code {:?}", code);
                assert_eq!(remote.code(), code);
                assert_eq!(remote.message(), "rejected by service");
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_unranked_player_is_not_an_error() {
    let mut transport = MockTransport::new();
    transport.expect_get_player_rank().times(1).returning(|_| {
        Ok(Response::new(GetPlayerRankResponse {
            total_entries: 40,
            ..Default::default()
        }))
    });

    let client = RankingClient::with_transport(test_config(), transport);
    let result = client
        .get_player_rank(RankQuery::new("weekly", "newcomer"))
        .await
        .unwrap();

    assert!(!result.has_rank());
    assert_eq!(result.total_entries, 40);
}

#[tokio::test]
async fn test_malformed_page_surfaces_as_remote_error() {
    let mut transport = MockTransport::new();
    transport.expect_get_leaderboard().times(1).returning(|_| {
        Ok(Response::new(GetLeaderboardResponse {
            period: Some(Default::default()),
            ..Default::default()
        }))
    });

    let client = RankingClient::with_transport(test_config(), transport);
    let err = client
        .get_leaderboard(LeaderboardQuery::new("weekly"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_ranked_player_without_score_is_malformed() {
    let mut transport = MockTransport::new();
    transport.expect_get_player_rank().times(1).returning(|_| {
        Ok(Response::new(GetPlayerRankResponse {
            rank: Some(3),
            score: None,
            total_entries: 40,
            ..Default::default()
        }))
    });

    let client = RankingClient::with_transport(test_config(), transport);
    let err = client
        .get_player_rank(RankQuery::new("weekly", "player_1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status_code(), Some(500));
}

// ============================================
// Slow transport: deadlines, cancellation, in-flight close
// ============================================

/// Transport whose submit call takes `delay` and signals when it starts
struct SlowTransport {
    delay: Duration,
    started: Arc<Notify>,
    releases: Arc<AtomicUsize>,
}

impl SlowTransport {
    fn new(delay: Duration) -> (Self, Arc<Notify>, Arc<AtomicUsize>) {
        let started = Arc::new(Notify::new());
        let releases = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            delay,
            started: Arc::clone(&started),
            releases: Arc::clone(&releases),
        };
        (transport, started, releases)
    }
}

#[async_trait]
impl LeaderboardTransport for SlowTransport {
    async fn submit_score(
        &self,
        _request: Request<SubmitScoreRequest>,
    ) -> Result<Response<SubmitScoreResponse>, Status> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(Response::new(SubmitScoreResponse {
            score_id: "slow".to_string(),
            rank: 1,
            is_new_best: true,
            was_deduplicated: false,
            anticheat: None,
        }))
    }

    async fn get_leaderboard(
        &self,
        _request: Request<GetLeaderboardRequest>,
    ) -> Result<Response<GetLeaderboardResponse>, Status> {
        Err(Status::unimplemented("slow transport only submits"))
    }

    async fn get_player_rank(
        &self,
        _request: Request<GetPlayerRankRequest>,
    ) -> Result<Response<GetPlayerRankResponse>, Status> {
        Err(Status::unimplemented("slow transport only submits"))
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_local_deadline_maps_to_gateway_timeout() {
    let (transport, _, _) = SlowTransport::new(Duration::from_secs(60));
    let client = RankingClient::with_transport(test_config(), transport);

    let err = client.submit("weekly", "player_1", 5).await.unwrap_err();

    match err {
        AscndError::Remote(remote) => {
            assert_eq!(remote.code(), Code::DeadlineExceeded);
            assert_eq!(remote.status_code(), 504);
        }
        other => panic!("expected deadline error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_caller_cancellation_before_call() {
    let (transport, _, _) = SlowTransport::new(Duration::from_secs(60));
    let client = RankingClient::with_transport(test_config(), transport);

    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .submit_score_cancellable(ScoreSubmission::new("weekly", "player_1", 5), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_caller_cancellation_during_call() {
    let (transport, started, _) = SlowTransport::new(Duration::from_secs(60));
    let client = Arc::new(RankingClient::with_transport(test_config(), transport));
    let token = CancellationToken::new();

    let call = {
        let client = Arc::clone(&client);
        let token = token.clone();
        tokio::spawn(async move {
            client
                .submit_score_cancellable(ScoreSubmission::new("weekly", "player_1", 5), &token)
                .await
        })
    };

    started.notified().await;
    token.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, AscndError::Cancelled));
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_close_aborts_in_flight_call() {
    let (transport, started, releases) = SlowTransport::new(Duration::from_secs(60));
    let client = Arc::new(RankingClient::with_transport(test_config(), transport));

    let call = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.submit("weekly", "player_1", 5).await })
    };

    started.notified().await;
    client.close();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, AscndError::Closed));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_call_finish() {
    let (transport, started, releases) = SlowTransport::new(Duration::from_millis(50));
    let client = Arc::new(RankingClient::with_transport(test_config(), transport));

    let call = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.submit("weekly", "player_1", 5).await })
    };

    started.notified().await;
    client.shutdown().await;

    let result = call.await.unwrap().expect("in-flight call should complete");
    assert_eq!(result.score_id, "slow");
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(matches!(
        client.submit("weekly", "player_1", 6).await,
        Err(AscndError::Closed)
    ));
}
