//! Ascnd wire protocol
//!
//! Message types and the unary client for the `ascnd.v1.AscndService` gRPC
//! service, generated at build time from `proto/ascnd/v1/ascnd.proto`.

pub mod v1 {
    tonic::include_proto!("ascnd.v1");

    pub use ascnd_service_client::AscndServiceClient;
}

pub use v1::*;

#[cfg(test)]
mod tests {
    use super::v1::*;
    use prost::Message;

    #[test]
    fn test_absent_rank_survives_the_wire() {
        let unranked = GetPlayerRankResponse {
            total_entries: 12,
            ..Default::default()
        };

        let decoded = GetPlayerRankResponse::decode(unranked.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.rank, None);
        assert_eq!(decoded.total_entries, 12);
    }

    #[test]
    fn test_explicit_zero_is_distinct_from_absent() {
        let ranked = GetPlayerRankResponse {
            rank: Some(0),
            score: Some(0),
            ..Default::default()
        };

        let decoded = GetPlayerRankResponse::decode(ranked.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.rank, Some(0));
        assert_eq!(decoded.score, Some(0));
    }

    #[test]
    fn test_unset_optional_request_fields_are_not_encoded() {
        let bare = GetLeaderboardRequest {
            leaderboard_id: "weekly-highscores".to_string(),
            ..Default::default()
        };
        let with_cursor = GetLeaderboardRequest {
            cursor: Some(String::new()),
            ..bare.clone()
        };

        // An empty-but-present cursor still occupies a field on the wire.
        assert!(with_cursor.encoded_len() > bare.encoded_len());
    }
}
