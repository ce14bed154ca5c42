use chrono::{DateTime, Utc};
use common::{Admission, RoundAccess, TeamStatus};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::advancement::Decision;

/// Access state of one round for the calling team.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RoundStateItem {
    #[schema(example = 2)]
    pub round: i32,
    pub state: RoundAccess,
}

/// Question content for an unlocked round.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RoundQuestionResponse {
    #[schema(example = 2)]
    pub round: i32,
    #[schema(example = "What has keys but can't open locks?")]
    pub question: String,
    #[schema(example = "Look near the music room")]
    pub clue: Option<String>,
    pub state: RoundAccess,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitAnswerRequest {
    #[schema(example = "piano")]
    pub answer: String,
}

pub fn validate_submit_answer(payload: &SubmitAnswerRequest) -> Result<(), AppError> {
    if payload.answer.trim().is_empty() {
        return Err(AppError::Validation("Answer must not be empty".into()));
    }
    if payload.answer.len() > 1024 {
        return Err(AppError::Validation(
            "Answer must be at most 1024 bytes".into(),
        ));
    }
    Ok(())
}

/// Outcome of a correct submission.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitAnswerResponse {
    pub advanced: bool,
    pub eliminated: bool,
    /// The team's round after the decision.
    #[schema(example = 3)]
    pub current_round: i32,
    pub status: TeamStatus,
    /// `true` when the round had already been decided and this is the recorded outcome.
    pub replayed: bool,
}

impl From<Decision> for SubmitAnswerResponse {
    fn from(d: Decision) -> Self {
        Self {
            advanced: d.admission == Admission::Advanced,
            eliminated: d.admission == Admission::Eliminated,
            current_round: d.team.current_round,
            status: d.team.status,
            replayed: d.replayed,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LeaderboardQuery {
    /// Maximum entries to return (1-1000). Defaults to the server setting.
    #[param(example = 10)]
    pub limit: Option<u64>,
}

/// One completed submission in arrival order.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based arrival position.
    #[schema(example = 1)]
    pub position: u64,
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = "Night Owls")]
    pub team_name: String,
    pub submission_time: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    #[schema(example = 2)]
    pub round: i32,
    pub entries: Vec<LeaderboardEntry>,
}
