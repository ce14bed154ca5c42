use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, State},
};
use common::RoundAccess;
use common::round::{rounds, validate_round};
use sea_orm::*;
use tracing::instrument;

use crate::entity::team;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::round::{
    LeaderboardEntry, LeaderboardQuery, LeaderboardResponse, RoundQuestionResponse,
    RoundStateItem, SubmitAnswerRequest, SubmitAnswerResponse, validate_submit_answer,
};
use crate::services::advancement::AdvancementEngine;
use crate::services::directory::TeamDirectory;
use crate::services::ledger::{RoundLedger, SubmissionLog};
use crate::state::AppState;
use crate::utils::permissions::ROUND_PLAY;

/// Upper bound on leaderboard page size.
const MAX_LEADERBOARD_LIMIT: u64 = 1000;

async fn calling_team(
    auth_user: &AuthUser,
    db: &DatabaseConnection,
) -> Result<team::Model, AppError> {
    auth_user.require_permission(ROUND_PLAY)?;
    let team_number = auth_user.require_team()?;
    TeamDirectory::new(db)
        .get_team(team_number)
        .await?
        .ok_or(AppError::TeamNotFound)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Rounds",
    operation_id = "listRounds",
    summary = "List round states for the calling team",
    description = "Returns `locked`, `unlocked` or `completed` for every round 1-8. `completed` does not say whether the team advanced; read `/auth/me` for that.",
    responses(
        (status = 200, description = "Round states", body = Vec<RoundStateItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a team token (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (TEAM_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_number = auth_user.user_id))]
pub async fn list_rounds(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RoundStateItem>>, AppError> {
    let team = calling_team(&auth_user, &state.db).await?;

    let submitted: HashSet<i32> = RoundLedger::new(&state.db)
        .records_for_team(team.team_number)
        .await?
        .into_iter()
        .filter(|r| r.submitted)
        .map(|r| r.round_number)
        .collect();

    let progress = team.progress();
    let items = rounds()
        .map(|round| RoundStateItem {
            round,
            state: progress.access(round, submitted.contains(&round)),
        })
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/{round}",
    tag = "Rounds",
    operation_id = "getRound",
    summary = "Get the question for an unlocked round",
    params(("round" = i32, Path, description = "Round number (1-8)")),
    responses(
        (status = 200, description = "Question and clue", body = RoundQuestionResponse),
        (status = 400, description = "Round out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Round not unlocked (ROUND_NOT_ACCESSIBLE)", body = ErrorBody),
        (status = 404, description = "TEAM_NOT_FOUND or ROUND_RECORD_NOT_FOUND", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_number = auth_user.user_id))]
pub async fn get_round(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
) -> Result<Json<RoundQuestionResponse>, AppError> {
    let round = validate_round(round)?;
    let team = calling_team(&auth_user, &state.db).await?;

    let record = RoundLedger::new(&state.db)
        .get_record(team.team_number, round)
        .await?;
    let submitted = record.as_ref().is_some_and(|r| r.submitted);

    let access = team.progress().access(round, submitted);
    if access != RoundAccess::Unlocked {
        return Err(AppError::RoundNotAccessible);
    }
    let record = record.ok_or(AppError::RoundRecordNotFound)?;

    Ok(Json(RoundQuestionResponse {
        round,
        question: record.question,
        clue: record.clue,
        state: access,
    }))
}

#[utoipa::path(
    post,
    path = "/{round}/submit",
    tag = "Rounds",
    operation_id = "submitAnswer",
    summary = "Submit an answer for the current round",
    description = "A correct answer runs the atomic advancement decision: the first N correct teams of a round (N = the capacity snapshotted at event start) advance, later ones are eliminated. Resubmitting a decided round returns the recorded outcome with `replayed = true`.",
    params(("round" = i32, Path, description = "Round number (1-8)")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Decision", body = SubmitAnswerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "ROUND_NOT_ACCESSIBLE or PERMISSION_DENIED", body = ErrorBody),
        (status = 404, description = "TEAM_NOT_FOUND or ROUND_RECORD_NOT_FOUND", body = ErrorBody),
        (status = 409, description = "No capacity for this round (CAPACITY_NOT_CONFIGURED)", body = ErrorBody),
        (status = 422, description = "Wrong answer (INCORRECT_ANSWER)", body = ErrorBody),
        (status = 503, description = "Decision rolled back, retry (ADVANCEMENT_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(team_number = auth_user.user_id))]
pub async fn submit_answer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
    AppJson(payload): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    auth_user.require_permission(ROUND_PLAY)?;
    let team_number = auth_user.require_team()?;
    let round = validate_round(round)?;
    validate_submit_answer(&payload)?;

    let decision = AdvancementEngine::new(&state.db, state.config.rounds.case_sensitive_answers)
        .submit_answer(team_number, round, &payload.answer)
        .await?;

    Ok(Json(SubmitAnswerResponse::from(decision)))
}

#[utoipa::path(
    get,
    path = "/{round}/leaderboard",
    tag = "Rounds",
    operation_id = "getRoundLeaderboard",
    summary = "Completed submissions of a round in arrival order",
    params(
        ("round" = i32, Path, description = "Round number (1-8)"),
        LeaderboardQuery,
    ),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn leaderboard(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
    AppQuery(query): AppQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let round = validate_round(round)?;
    let limit = query
        .limit
        .unwrap_or(state.config.rounds.leaderboard_limit)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let arrivals = SubmissionLog::new(&state.db).arrivals(round, limit).await?;

    let team_numbers: Vec<i32> = arrivals.iter().map(|e| e.team_number).collect();
    let names: HashMap<i32, String> = if team_numbers.is_empty() {
        HashMap::new()
    } else {
        team::Entity::find()
            .select_only()
            .column(team::Column::TeamNumber)
            .column(team::Column::TeamName)
            .filter(team::Column::TeamNumber.is_in(team_numbers))
            .into_tuple::<(i32, String)>()
            .all(&state.db)
            .await?
            .into_iter()
            .collect()
    };

    let entries = arrivals
        .into_iter()
        .enumerate()
        .map(|(i, e)| LeaderboardEntry {
            position: i as u64 + 1,
            team_name: names.get(&e.team_number).cloned().unwrap_or_default(),
            team_number: e.team_number,
            submission_time: e.submission_time,
        })
        .collect();

    Ok(Json(LeaderboardResponse { round, entries }))
}
