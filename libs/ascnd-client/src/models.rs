//! Request and result types
//!
//! Value types handed to and returned from [`RankingClient`](crate::RankingClient).
//! Requests convert into wire messages; responses convert from them. Optional
//! wire fields stay `Option` so a result can never claim a value it lacks.

use ascnd_proto::v1 as proto;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::error::{AscndError, RemoteError, Result};

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_LIMIT: i32 = 10;

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AscndError::missing(field));
    }
    Ok(())
}

fn timestamp_to_utc(
    field: &str,
    ts: prost_types::Timestamp,
) -> std::result::Result<DateTime<Utc>, RemoteError> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::<Utc>::from_timestamp(ts.seconds, nanos))
        .ok_or_else(|| {
            RemoteError::malformed_response(format!("{} is not a valid timestamp", field))
        })
}

// ============================================
// Shared descriptors
// ============================================

/// Which leaderboard period to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodSelector {
    Current,
    Previous,
    /// The period containing this instant
    At(DateTime<Utc>),
}

impl PeriodSelector {
    fn to_wire(&self) -> String {
        match self {
            Self::Current => "current".to_string(),
            Self::Previous => "previous".to_string(),
            Self::At(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Time bounds of the period a page was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: DateTime<Utc>,
    /// `None` while the period is open-ended
    pub end: Option<DateTime<Utc>>,
}

impl TryFrom<proto::PeriodInfo> for PeriodBounds {
    type Error = RemoteError;

    fn try_from(info: proto::PeriodInfo) -> std::result::Result<Self, Self::Error> {
        let start = info
            .start
            .ok_or_else(|| RemoteError::malformed_response("period.start is missing"))?;
        Ok(Self {
            start: timestamp_to_utc("period.start", start)?,
            end: info
                .end
                .map(|end| timestamp_to_utc("period.end", end))
                .transpose()?,
        })
    }
}

/// A filtered view of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardView {
    pub slug: String,
    pub name: String,
}

impl From<proto::ViewInfo> for LeaderboardView {
    fn from(view: proto::ViewInfo) -> Self {
        Self {
            slug: view.slug,
            name: view.name,
        }
    }
}

/// Skill bracket a player was placed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

impl From<proto::BracketInfo> for Bracket {
    fn from(bracket: proto::BracketInfo) -> Self {
        Self {
            id: bracket.id,
            name: bracket.name,
            color: bracket.color,
        }
    }
}

// ============================================
// SubmitScore
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub leaderboard_id: String,
    pub player_id: String,
    pub score: i64,
    /// Opaque payload stored next to the score
    pub metadata: Option<Vec<u8>>,
    /// Resubmitting with the same key returns the original result
    pub idempotency_key: Option<String>,
}

impl ScoreSubmission {
    pub fn new(leaderboard_id: impl Into<String>, player_id: impl Into<String>, score: i64) -> Self {
        Self {
            leaderboard_id: leaderboard_id.into(),
            player_id: player_id.into(),
            score,
            metadata: None,
            idempotency_key: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub(crate) fn into_request(self) -> Result<proto::SubmitScoreRequest> {
        require("leaderboard_id", &self.leaderboard_id)?;
        require("player_id", &self.player_id)?;

        Ok(proto::SubmitScoreRequest {
            leaderboard_id: self.leaderboard_id,
            player_id: self.player_id,
            score: self.score,
            metadata: self.metadata,
            idempotency_key: self.idempotency_key,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnticheatViolation {
    pub flag_type: String,
    pub reason: String,
}

/// Verdict of the service's anticheat checks on a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnticheatOutcome {
    pub passed: bool,
    /// Action taken by the service, e.g. `none`, `flag`, `reject`
    pub action: String,
    pub violations: Vec<AnticheatViolation>,
}

impl From<proto::AnticheatResult> for AnticheatOutcome {
    fn from(result: proto::AnticheatResult) -> Self {
        Self {
            passed: result.passed,
            action: result.action,
            violations: result
                .violations
                .into_iter()
                .map(|v| AnticheatViolation {
                    flag_type: v.flag_type,
                    reason: v.reason,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub score_id: String,
    pub rank: i32,
    pub is_new_best: bool,
    pub was_deduplicated: bool,
    pub anticheat: Option<AnticheatOutcome>,
}

impl From<proto::SubmitScoreResponse> for SubmissionResult {
    fn from(response: proto::SubmitScoreResponse) -> Self {
        Self {
            score_id: response.score_id,
            rank: response.rank,
            is_new_best: response.is_new_best,
            was_deduplicated: response.was_deduplicated,
            anticheat: response.anticheat.map(AnticheatOutcome::from),
        }
    }
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rank: #{}", self.rank)?;
        write!(
            f,
            "New personal best: {}",
            if self.is_new_best { "Yes!" } else { "No" }
        )
    }
}

// ============================================
// GetLeaderboard
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub leaderboard_id: String,
    /// `None` lets the service pick its default page size
    pub limit: Option<i32>,
    /// Opaque cursor from a previous page; `None` starts at rank 1
    pub cursor: Option<String>,
    pub period: Option<PeriodSelector>,
    pub view_slug: Option<String>,
    /// Center the page on this rank. Centering is decided by the service.
    pub around_rank: Option<i32>,
}

impl LeaderboardQuery {
    pub fn new(leaderboard_id: impl Into<String>) -> Self {
        Self {
            leaderboard_id: leaderboard_id.into(),
            limit: None,
            cursor: None,
            period: None,
            view_slug: None,
            around_rank: None,
        }
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn period(mut self, period: PeriodSelector) -> Self {
        self.period = Some(period);
        self
    }

    pub fn view(mut self, slug: impl Into<String>) -> Self {
        self.view_slug = Some(slug.into());
        self
    }

    pub fn around_rank(mut self, rank: i32) -> Self {
        self.around_rank = Some(rank);
        self
    }

    pub(crate) fn into_request(self) -> Result<proto::GetLeaderboardRequest> {
        require("leaderboard_id", &self.leaderboard_id)?;

        Ok(proto::GetLeaderboardRequest {
            leaderboard_id: self.leaderboard_id,
            limit: self.limit.unwrap_or(0),
            cursor: self.cursor,
            period: self.period.as_ref().map(PeriodSelector::to_wire),
            view_slug: self.view_slug,
            around_rank: self.around_rank,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub player_id: String,
    pub score: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub metadata: Option<Vec<u8>>,
    pub bracket: Option<Bracket>,
}

impl TryFrom<proto::LeaderboardEntry> for LeaderboardEntry {
    type Error = RemoteError;

    fn try_from(entry: proto::LeaderboardEntry) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            rank: entry.rank,
            player_id: entry.player_id,
            score: entry.score,
            submitted_at: entry
                .submitted_at
                .map(|ts| timestamp_to_utc("entry.submitted_at", ts))
                .transpose()?,
            metadata: entry.metadata,
            bracket: entry.bracket.map(Bracket::from),
        })
    }
}

/// One page of a leaderboard, entries in the order the service returned them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub total_entries: i32,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub period: Option<PeriodBounds>,
    pub view: Option<LeaderboardView>,
}

impl TryFrom<proto::GetLeaderboardResponse> for LeaderboardPage {
    type Error = RemoteError;

    fn try_from(response: proto::GetLeaderboardResponse) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            entries: response
                .entries
                .into_iter()
                .map(LeaderboardEntry::try_from)
                .collect::<std::result::Result<_, _>>()?,
            total_entries: response.total_entries,
            has_more: response.has_more,
            next_cursor: response.next_cursor.filter(|c| !c.is_empty()),
            period: response.period.map(PeriodBounds::try_from).transpose()?,
            view: response.view.map(LeaderboardView::from),
        })
    }
}

// ============================================
// GetPlayerRank
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankQuery {
    pub leaderboard_id: String,
    pub player_id: String,
    pub period: Option<PeriodSelector>,
    pub view_slug: Option<String>,
}

impl RankQuery {
    pub fn new(leaderboard_id: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            leaderboard_id: leaderboard_id.into(),
            player_id: player_id.into(),
            period: None,
            view_slug: None,
        }
    }

    pub fn period(mut self, period: PeriodSelector) -> Self {
        self.period = Some(period);
        self
    }

    pub fn view(mut self, slug: impl Into<String>) -> Self {
        self.view_slug = Some(slug.into());
        self
    }

    pub(crate) fn into_request(self) -> Result<proto::GetPlayerRankRequest> {
        require("leaderboard_id", &self.leaderboard_id)?;
        require("player_id", &self.player_id)?;

        Ok(proto::GetPlayerRankRequest {
            leaderboard_id: self.leaderboard_id,
            player_id: self.player_id,
            period: self.period.as_ref().map(PeriodSelector::to_wire),
            view_slug: self.view_slug,
        })
    }
}

/// Where a ranked player stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStanding {
    pub rank: i32,
    pub score: i64,
    /// `None` when the service did not report a personal best
    pub best_score: Option<i64>,
    /// Display string from the service, e.g. `top 5%`
    pub percentile: Option<String>,
    pub global_rank: Option<i32>,
    pub bracket: Option<Bracket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankResult {
    /// `None` when the player has no score on this leaderboard
    pub standing: Option<PlayerStanding>,
    pub total_entries: i32,
    pub view: Option<LeaderboardView>,
}

impl RankResult {
    pub fn has_rank(&self) -> bool {
        self.standing.is_some()
    }
}

impl TryFrom<proto::GetPlayerRankResponse> for RankResult {
    type Error = RemoteError;

    fn try_from(response: proto::GetPlayerRankResponse) -> std::result::Result<Self, Self::Error> {
        let proto::GetPlayerRankResponse {
            rank,
            score,
            best_score,
            total_entries,
            percentile,
            global_rank,
            bracket,
            view,
        } = response;

        let standing = match rank {
            Some(rank) => Some(PlayerStanding {
                rank,
                score: score.ok_or_else(|| {
                    RemoteError::malformed_response("ranked player has no score")
                })?,
                best_score,
                percentile,
                global_rank,
                bracket: bracket.map(Bracket::from),
            }),
            None => None,
        };

        Ok(Self {
            standing,
            total_entries,
            view: view.map(LeaderboardView::from),
        })
    }
}
