use crate::error::AppError;
use crate::models::shared::{validate_password, validate_team_name, validate_team_number};
use serde::{Deserialize, Serialize};

/// Request body for team signup.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique positive team number. Also the login identifier.
    #[schema(example = 17)]
    pub team_number: i32,
    /// Display name (1-64 chars).
    #[schema(example = "Night Owls")]
    pub team_name: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_team_number(payload.team_number)?;
    validate_team_name(&payload.team_name)?;
    validate_password(&payload.password)
}

/// Request body for team login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    validate_team_number(payload.team_number)?;
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Request body for admin login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AdminLoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_admin_login_request(payload: &AdminLoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    /// Team number for teams, admin ID for admins.
    #[schema(example = 17)]
    pub id: i32,
    /// Team name or admin username.
    #[schema(example = "Night Owls")]
    pub name: String,
    #[schema(example = "team")]
    pub role: String,
    #[schema(example = json!(["round:play"]))]
    pub permissions: Vec<String>,
}

/// The caller's identity. Teams also get their progress record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 17)]
    pub id: i32,
    #[schema(example = "Night Owls")]
    pub name: String,
    #[schema(example = "team")]
    pub role: String,
    #[schema(example = json!(["round:play"]))]
    pub permissions: Vec<String>,
    /// Present for team tokens only.
    pub team: Option<crate::models::team::TeamResponse>,
}
