use chrono::{DateTime, Utc};
use common::{ParticipantLimits, TeamStatus};
use serde::{Deserialize, Serialize};

use crate::entity::team;
use crate::error::AppError;
use crate::models::shared::{validate_password, validate_team_name, validate_team_number};

/// A team's record as seen by the team itself and by admins.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = "Night Owls")]
    pub team_name: String,
    /// 1-8 while playing, 9 once every round is cleared.
    #[schema(example = 3)]
    pub current_round: i32,
    pub status: TeamStatus,
    /// Round the team was cut at. Only set while eliminated.
    #[schema(example = json!(null))]
    pub eliminated_round: Option<i32>,
    pub eliminated_at: Option<DateTime<Utc>>,
    pub event_access: bool,
    /// Capacity snapshot taken at event start.
    pub participant_limits: Option<ParticipantLimits>,
    #[schema(example = 120)]
    pub total_score: i32,
    #[schema(example = 2)]
    pub answers_correct: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<team::Model> for TeamResponse {
    fn from(t: team::Model) -> Self {
        let participant_limits = t.participant_limits.as_ref().map(|_| t.limits());
        Self {
            team_number: t.team_number,
            team_name: t.team_name,
            current_round: t.current_round,
            status: t.status,
            eliminated_round: t.eliminated_round,
            eliminated_at: t.eliminated_at,
            event_access: t.event_access,
            participant_limits,
            total_score: t.total_score,
            answers_correct: t.answers_correct,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Filters for the admin team list.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TeamListQuery {
    /// `active` or `eliminated`.
    #[param(example = "active")]
    pub status: Option<TeamStatus>,
    /// Only teams currently in this round (1-9).
    #[param(example = 3)]
    pub round: Option<i32>,
}

/// Request body for adding a team from the admin console.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    #[schema(example = 42)]
    pub team_number: i32,
    #[schema(example = "Late Entrants")]
    pub team_name: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_create_team(payload: &CreateTeamRequest) -> Result<(), AppError> {
    validate_team_number(payload.team_number)?;
    validate_team_name(&payload.team_name)?;
    validate_password(&payload.password)
}

/// Score edit. Absent fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateTeamScoresRequest {
    #[schema(example = 150)]
    pub total_score: Option<i32>,
    #[schema(example = 3)]
    pub answers_correct: Option<i32>,
}

pub fn validate_update_scores(payload: &UpdateTeamScoresRequest) -> Result<(), AppError> {
    if payload.total_score.is_none() && payload.answers_correct.is_none() {
        return Err(AppError::Validation(
            "At least one of total_score, answers_correct is required".into(),
        ));
    }
    if payload.answers_correct.is_some_and(|n| n < 0) {
        return Err(AppError::Validation("answers_correct must be >= 0".into()));
    }
    Ok(())
}
