use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use tracing::{debug, instrument};

use crate::entity::admin_user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    AdminLoginRequest, LoginRequest, LoginResponse, MeResponse, RegisterRequest,
    validate_admin_login_request, validate_login_request, validate_register_request,
};
use crate::models::team::TeamResponse;
use crate::services::directory::{NewTeam, TeamDirectory};
use crate::state::AppState;
use crate::utils::permissions::{ADMIN_ROLE, TEAM_ROLE, permissions_for};
use crate::utils::{hash, jwt};

fn sign_token(
    state: &AppState,
    uid: i32,
    name: &str,
    role: &str,
) -> Result<(String, Vec<String>), AppError> {
    let permissions = permissions_for(role);
    let token = jwt::sign(
        uid,
        name,
        role,
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;
    Ok((token, permissions))
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "registerTeam",
    summary = "Register a team",
    description = "Creates a team in round 1 without event access. The team number is the login identifier and must be unique.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Team registered", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Team number already registered (TEAM_NUMBER_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(team_number = payload.team_number))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let directory = TeamDirectory::new(&state.db);
    if directory.get_team(payload.team_number).await?.is_some() {
        return Err(AppError::TeamNumberTaken);
    }

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let team = directory
        .create_team(NewTeam {
            team_number: payload.team_number,
            team_name: payload.team_name.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                debug!("Registration race condition: unique constraint caught on insert");
                AppError::TeamNumberTaken
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(team))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "loginTeam",
    summary = "Log in as a team",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong team number or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(team_number = payload.team_number))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let team = TeamDirectory::new(&state.db)
        .get_team(payload.team_number)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &team.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let (token, permissions) = sign_token(&state, team.team_number, &team.team_name, TEAM_ROLE)?;

    Ok(Json(LoginResponse {
        token,
        id: team.team_number,
        name: team.team_name,
        role: TEAM_ROLE.to_string(),
        permissions,
    }))
}

#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "Auth",
    operation_id = "loginAdmin",
    summary = "Log in as an admin",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong username or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AdminLoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_admin_login_request(&payload)?;

    let admin = admin_user::Entity::find()
        .filter(admin_user::Column::Username.eq(payload.username.trim()))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &admin.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let (token, permissions) = sign_token(&state, admin.id, &admin.username, ADMIN_ROLE)?;

    Ok(Json(LoginResponse {
        token,
        id: admin.id,
        name: admin.username,
        role: ADMIN_ROLE.to_string(),
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getMe",
    summary = "Get the caller's identity",
    description = "Team tokens also receive the team's current record, which is how a client learns the outcome of a submission.",
    responses(
        (status = 200, description = "Caller identity", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team was deleted (TEAM_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let team = if auth_user.role == TEAM_ROLE {
        let team = TeamDirectory::new(&state.db)
            .get_team(auth_user.user_id)
            .await?
            .ok_or(AppError::TeamNotFound)?;
        Some(TeamResponse::from(team))
    } else {
        None
    };

    Ok(Json(MeResponse {
        id: auth_user.user_id,
        name: auth_user.username,
        role: auth_user.role,
        permissions: auth_user.permissions,
        team,
    }))
}
