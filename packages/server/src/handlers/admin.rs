use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::round::{FINISHED_ROUND, FIRST_ROUND, validate_round};
use sea_orm::SqlErr;
use tracing::{debug, info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::event::{
    AdminEventResponse, AutoEliminateRequest, AutoEliminateResponse, CapacitiesPayload,
    OverrideListQuery, OverrideLogItem, ProgressResponse, RoundRecordsUpload, StartEventRequest,
    TeamNumbersRequest, validate_auto_eliminate, validate_records_upload,
};
use crate::models::shared::{BulkOperationResponse, MAX_BULK_TEAMS, validate_bulk_ids};
use crate::models::team::{
    CreateTeamRequest, TeamListQuery, TeamResponse, UpdateTeamScoresRequest,
    validate_create_team, validate_update_scores,
};
use crate::services::control::EventControl;
use crate::services::directory::{self, NewTeam, TeamDirectory, TeamFilter};
use crate::services::ledger::RecordContent;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::permissions::{EVENT_MANAGE, TEAM_MANAGE};

const DEFAULT_OVERRIDE_LIMIT: u64 = 100;
const MAX_OVERRIDE_LIMIT: u64 = 1000;

async fn event_response(control: &EventControl<'_>) -> Result<AdminEventResponse, AppError> {
    let status = control.status().await?;
    let capacities = control.capacities().await?;
    Ok(AdminEventResponse::new(status, capacities))
}

#[utoipa::path(
    get,
    path = "/event",
    tag = "Admin",
    operation_id = "getEvent",
    summary = "Event state with team counts and capacities",
    responses(
        (status = 200, description = "Event state", body = AdminEventResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn get_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminEventResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    Ok(Json(event_response(&EventControl::new(&state.db)).await?))
}

#[utoipa::path(
    post,
    path = "/event/start",
    tag = "Admin",
    operation_id = "startEvent",
    summary = "Start the event",
    description = "Optionally saves `participant_limits` as the capacity configuration, then clears the submission log and submitted flags, and puts every team in round 1 with access and a snapshot of the capacities. The body may be empty.",
    request_body(content = StartEventRequest, description = "Optional capacity override"),
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 400, description = "Invalid body or capacities (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Some rounds have no capacity (CAPACITY_NOT_CONFIGURED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, body), fields(admin = %auth_user.username))]
pub async fn start_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;

    let payload: StartEventRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartEventRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };

    let report = EventControl::new(&state.db)
        .start(payload.participant_limits)
        .await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/event/stop",
    tag = "Admin",
    operation_id = "stopEvent",
    summary = "Stop the event",
    description = "Revokes event access from every team. Progress is kept.",
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn stop_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let report = EventControl::new(&state.db).stop().await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    delete,
    path = "/event",
    tag = "Admin",
    operation_id = "resetEvent",
    summary = "Reset the event",
    description = "Clears the submission log and submitted flags and returns every team to round 1, active, without access or capacity snapshot. Idempotent.",
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn reset_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let report = EventControl::new(&state.db).reset().await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/capacities",
    tag = "Admin",
    operation_id = "getCapacities",
    summary = "Configured round capacities",
    responses(
        (status = 200, description = "Capacities", body = CapacitiesPayload),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn get_capacities(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CapacitiesPayload>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let participant_limits = EventControl::new(&state.db).capacities().await?;
    Ok(Json(CapacitiesPayload { participant_limits }))
}

#[utoipa::path(
    put,
    path = "/capacities",
    tag = "Admin",
    operation_id = "updateCapacities",
    summary = "Update round capacities",
    description = "Upserts the given rounds. Rejected while the event is running; changes apply at the next start.",
    request_body = CapacitiesPayload,
    responses(
        (status = 200, description = "Capacities after the update", body = CapacitiesPayload),
        (status = 400, description = "Round out of range or negative capacity (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Event is running (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn update_capacities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CapacitiesPayload>,
) -> Result<Json<CapacitiesPayload>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let participant_limits = EventControl::new(&state.db)
        .update_capacities(&payload.participant_limits)
        .await?;
    Ok(Json(CapacitiesPayload { participant_limits }))
}

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Admin",
    operation_id = "listTeams",
    summary = "List teams",
    description = "Sorted by team number. Filter by `status` and/or current `round`.",
    params(TeamListQuery),
    responses(
        (status = 200, description = "Teams", body = Vec<TeamResponse>),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn list_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TeamListQuery>,
) -> Result<Json<Vec<TeamResponse>>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    if let Some(round) = query.round
        && !(FIRST_ROUND..=FINISHED_ROUND).contains(&round)
    {
        return Err(AppError::Validation(format!(
            "round must be between {FIRST_ROUND} and {FINISHED_ROUND}"
        )));
    }

    let filter = TeamFilter {
        status: query.status,
        round: query.round,
    };
    let teams = TeamDirectory::new(&state.db).list_teams(&filter).await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "Admin",
    operation_id = "createTeam",
    summary = "Add a team",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Team number already registered (TEAM_NUMBER_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username, team_number = payload.team_number))]
pub async fn create_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    validate_create_team(&payload)?;

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let team = TeamDirectory::new(&state.db)
        .create_team(NewTeam {
            team_number: payload.team_number,
            team_name: payload.team_name.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                debug!("Team number collision on admin create");
                AppError::TeamNumberTaken
            }
            _ => AppError::from(e),
        })?;

    info!(team_number = team.team_number, "Team created by admin");
    Ok((StatusCode::CREATED, Json(TeamResponse::from(team))))
}

#[utoipa::path(
    patch,
    path = "/teams/{team_number}",
    tag = "Admin",
    operation_id = "updateTeamScores",
    summary = "Edit a team's scores",
    params(("team_number" = i32, Path, description = "Team number")),
    request_body = UpdateTeamScoresRequest,
    responses(
        (status = 200, description = "Updated team", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (TEAM_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn update_team_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(team_number): Path<i32>,
    AppJson(payload): AppJson<UpdateTeamScoresRequest>,
) -> Result<Json<TeamResponse>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    validate_update_scores(&payload)?;

    let team = directory::set_scores(
        &state.db,
        team_number,
        payload.total_score,
        payload.answers_correct,
    )
    .await?
    .ok_or(AppError::TeamNotFound)?;

    Ok(Json(TeamResponse::from(team)))
}

#[utoipa::path(
    delete,
    path = "/teams/{team_number}",
    tag = "Admin",
    operation_id = "deleteTeam",
    summary = "Delete a team",
    description = "Also removes the team's round records, submission log entries and override log entries.",
    params(("team_number" = i32, Path, description = "Team number")),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (TEAM_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn delete_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(team_number): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;

    if !TeamDirectory::new(&state.db).delete_team(team_number).await? {
        return Err(AppError::TeamNotFound);
    }

    info!(team_number, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/teams/accept",
    tag = "Admin",
    operation_id = "acceptTeams",
    summary = "Manually advance teams",
    description = "Moves each team one round forward (capped after round 8), clearing any elimination. Recorded in the override log, never in the submission log.",
    request_body = TeamNumbersRequest,
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn accept_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TeamNumbersRequest>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    validate_bulk_ids(&payload.team_numbers, "team_numbers", MAX_BULK_TEAMS)?;

    let report = EventControl::new(&state.db)
        .accept(&payload.team_numbers, &auth_user.username)
        .await;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/teams/eliminate",
    tag = "Admin",
    operation_id = "eliminateTeams",
    summary = "Manually eliminate teams",
    description = "Eliminates each active team at its current round. Recorded in the override log.",
    request_body = TeamNumbersRequest,
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn eliminate_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TeamNumbersRequest>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    validate_bulk_ids(&payload.team_numbers, "team_numbers", MAX_BULK_TEAMS)?;

    let report = EventControl::new(&state.db)
        .eliminate(&payload.team_numbers, &auth_user.username)
        .await;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/rounds/{round}/auto-eliminate",
    tag = "Admin",
    operation_id = "autoEliminate",
    summary = "Keep the top scorers of a round",
    description = "Ranks active teams in `round` by total score (ties go to the lower team number). The top `limit` advance, the rest are eliminated at `round`.",
    params(("round" = i32, Path, description = "Round number (1-8)")),
    request_body = AutoEliminateRequest,
    responses(
        (status = 200, description = "Cut and per-team result", body = AutoEliminateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn auto_eliminate(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
    AppJson(payload): AppJson<AutoEliminateRequest>,
) -> Result<Json<AutoEliminateResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let round = validate_round(round)?;
    let limit = validate_auto_eliminate(&payload)?;

    let report = EventControl::new(&state.db)
        .auto_eliminate(round, limit, &auth_user.username)
        .await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    put,
    path = "/rounds/{round}/records",
    tag = "Admin",
    operation_id = "uploadRoundRecords",
    summary = "Upload question content for a round",
    description = "Inserts or replaces question, answer and clue per team. Submitted flags are left untouched.",
    params(("round" = i32, Path, description = "Round number (1-8)")),
    request_body = RoundRecordsUpload,
    responses(
        (status = 200, description = "Per-team result", body = BulkOperationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin = %auth_user.username))]
pub async fn upload_round_records(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
    AppJson(payload): AppJson<RoundRecordsUpload>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let round = validate_round(round)?;
    validate_records_upload(&payload, MAX_BULK_TEAMS)?;

    let records = payload
        .records
        .into_iter()
        .map(|r| RecordContent {
            team_number: r.team_number,
            question: r.question,
            answer: r.answer,
            clue: r.clue,
        })
        .collect();

    let report = EventControl::new(&state.db)
        .upload_records(round, records)
        .await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/progress",
    tag = "Admin",
    operation_id = "getProgress",
    summary = "Per-round headcounts",
    responses(
        (status = 200, description = "Progress", body = ProgressResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn progress(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let progress = TeamDirectory::new(&state.db).progress().await?;
    Ok(Json(progress.into()))
}

#[utoipa::path(
    get,
    path = "/overrides",
    tag = "Admin",
    operation_id = "listOverrides",
    summary = "Override audit log",
    description = "Manual and automatic accept/eliminate decisions, newest first.",
    params(OverrideListQuery),
    responses(
        (status = 200, description = "Override entries", body = Vec<OverrideLogItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permission denied (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username))]
pub async fn list_overrides(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<OverrideListQuery>,
) -> Result<Json<Vec<OverrideLogItem>>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_OVERRIDE_LIMIT)
        .clamp(1, MAX_OVERRIDE_LIMIT);

    let entries = EventControl::new(&state.db)
        .overrides(query.team_number, limit)
        .await?;
    Ok(Json(entries.into_iter().map(OverrideLogItem::from).collect()))
}
