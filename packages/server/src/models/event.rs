use chrono::{DateTime, Utc};
use common::ParticipantLimits;
use serde::{Deserialize, Serialize};

use crate::entity::override_log;
use crate::error::AppError;
use crate::models::shared::BulkOperationResponse;
use crate::services::control::{AutoEliminateReport, EventStatus};
use crate::services::directory::Progress;

/// Public event summary.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EventStatusResponse {
    pub event_started: bool,
    /// Registered teams.
    #[schema(example = 42)]
    pub participant_count: u64,
    /// Teams that currently hold event access.
    #[schema(example = 40)]
    pub active_participants: u64,
}

impl From<EventStatus> for EventStatusResponse {
    fn from(s: EventStatus) -> Self {
        Self {
            event_started: s.running,
            participant_count: s.counts.total,
            active_participants: s.counts.with_access,
        }
    }
}

/// Event state as seen from the admin console.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminEventResponse {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    #[schema(example = 42)]
    pub total_teams: u64,
    #[schema(example = 30)]
    pub active_teams: u64,
    #[schema(example = 12)]
    pub eliminated_teams: u64,
    #[schema(example = 42)]
    pub teams_with_access: u64,
    pub capacities: ParticipantLimits,
}

impl AdminEventResponse {
    pub fn new(status: EventStatus, capacities: ParticipantLimits) -> Self {
        Self {
            running: status.running,
            started_at: status.started_at,
            stopped_at: status.stopped_at,
            total_teams: status.counts.total,
            active_teams: status.counts.active,
            eliminated_teams: status.counts.eliminated,
            teams_with_access: status.counts.with_access,
            capacities,
        }
    }
}

/// Optional capacity override saved before the event starts.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct StartEventRequest {
    #[schema(example = json!({"1": 30, "2": 28, "3": 25, "4": 22, "5": 20, "6": 18, "7": 15, "8": 10}))]
    pub participant_limits: Option<ParticipantLimits>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct CapacitiesPayload {
    /// Round number to capacity.
    #[schema(example = json!({"1": 30, "2": 28}))]
    pub participant_limits: ParticipantLimits,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TeamNumbersRequest {
    #[schema(example = json!([3, 7, 12]))]
    pub team_numbers: Vec<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AutoEliminateRequest {
    /// How many teams to keep.
    #[schema(example = 10)]
    pub limit: i64,
}

pub fn validate_auto_eliminate(payload: &AutoEliminateRequest) -> Result<usize, AppError> {
    usize::try_from(payload.limit)
        .map_err(|_| AppError::Validation("limit must be >= 0".into()))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AutoEliminateResponse {
    #[schema(example = json!([4, 9]))]
    pub accepted: Vec<i32>,
    #[schema(example = json!([2]))]
    pub eliminated: Vec<i32>,
    #[serde(flatten)]
    pub result: BulkOperationResponse,
}

impl From<AutoEliminateReport> for AutoEliminateResponse {
    fn from(r: AutoEliminateReport) -> Self {
        Self {
            accepted: r.accepted,
            eliminated: r.eliminated,
            result: r.report.into(),
        }
    }
}

/// Question content for one team.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RoundRecordItem {
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = "What has keys but can't open locks?")]
    pub question: String,
    #[schema(example = "piano")]
    pub answer: String,
    #[schema(example = "Look near the music room")]
    pub clue: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RoundRecordsUpload {
    pub records: Vec<RoundRecordItem>,
}

pub fn validate_records_upload(payload: &RoundRecordsUpload, max: usize) -> Result<(), AppError> {
    if payload.records.is_empty() {
        return Err(AppError::Validation("records must not be empty".into()));
    }
    if payload.records.len() > max {
        return Err(AppError::Validation(format!("Too many records: max {max}")));
    }
    for record in &payload.records {
        if record.question.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Question for team {} must not be empty",
                record.team_number
            )));
        }
        if record.answer.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Answer for team {} must not be empty",
                record.team_number
            )));
        }
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RoundProgressItem {
    #[schema(example = 3)]
    pub round: i32,
    /// Active teams currently in this round.
    #[schema(example = 20)]
    pub active: u64,
    /// Teams eliminated while in this round.
    #[schema(example = 5)]
    pub eliminated: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    pub rounds: Vec<RoundProgressItem>,
    /// Teams that cleared every round.
    #[schema(example = 8)]
    pub finished: u64,
    #[schema(example = 42)]
    pub total_teams: u64,
    #[schema(example = 30)]
    pub active_teams: u64,
    #[schema(example = 12)]
    pub eliminated_teams: u64,
}

impl From<Progress> for ProgressResponse {
    fn from(p: Progress) -> Self {
        let rounds: Vec<RoundProgressItem> = p
            .rounds
            .into_iter()
            .map(|(round, h)| RoundProgressItem {
                round,
                active: h.active,
                eliminated: h.eliminated,
            })
            .collect();
        let active_in_rounds: u64 = rounds.iter().map(|r| r.active).sum();
        let eliminated_teams = rounds.iter().map(|r| r.eliminated).sum();
        let active_teams = active_in_rounds + p.finished;
        Self {
            rounds,
            finished: p.finished,
            total_teams: active_teams + eliminated_teams,
            active_teams,
            eliminated_teams,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct OverrideListQuery {
    /// Only entries for this team.
    #[param(example = 17)]
    pub team_number: Option<i32>,
    /// Maximum entries to return (1-1000, default 100).
    #[param(example = 50)]
    pub limit: Option<u64>,
}

/// One admin override, newest first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OverrideLogItem {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = 3)]
    pub round_number: i32,
    #[schema(example = "manual_accept")]
    pub action: String,
    #[schema(example = "admin")]
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<override_log::Model> for OverrideLogItem {
    fn from(m: override_log::Model) -> Self {
        Self {
            id: m.id,
            team_number: m.team_number,
            round_number: m.round_number,
            action: m.action,
            actor: m.actor,
            created_at: m.created_at,
        }
    }
}
