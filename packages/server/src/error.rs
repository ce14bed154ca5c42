use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `CONFLICT`, `TEAM_NUMBER_TAKEN`, `TEAM_NOT_FOUND`, `ROUND_RECORD_NOT_FOUND`,
    /// `ROUND_NOT_ACCESSIBLE`, `INCORRECT_ANSWER`, `ADVANCEMENT_FAILED`,
    /// `CAPACITY_NOT_CONFIGURED`, `INTERNAL_ERROR`.
    #[schema(example = "ROUND_NOT_ACCESSIBLE")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "This round is not currently open to you")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    TeamNumberTaken,
    TeamNotFound,
    RoundRecordNotFound,
    /// Wrong round, no event access, eliminated, or already submitted.
    RoundNotAccessible,
    IncorrectAnswer,
    /// The atomic advancement decision was rolled back. Safe to retry.
    AdvancementFailed(String),
    /// Rounds that have no capacity configured.
    CapacityNotConfigured(Vec<i32>),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid team number or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::TeamNumberTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "TEAM_NUMBER_TAKEN",
                    message: "A team with this number already exists".into(),
                },
            ),
            AppError::TeamNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "TEAM_NOT_FOUND",
                    message: "Team not found".into(),
                },
            ),
            AppError::RoundRecordNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "ROUND_RECORD_NOT_FOUND",
                    message: "No question is configured for this team and round".into(),
                },
            ),
            AppError::RoundNotAccessible => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "ROUND_NOT_ACCESSIBLE",
                    message: "This round is not currently open to you".into(),
                },
            ),
            AppError::IncorrectAnswer => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    code: "INCORRECT_ANSWER",
                    message: "Incorrect answer".into(),
                },
            ),
            AppError::AdvancementFailed(detail) => {
                tracing::warn!("Advancement decision aborted: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "ADVANCEMENT_FAILED",
                        message: "Your answer could not be recorded. Please retry".into(),
                    },
                )
            }
            AppError::CapacityNotConfigured(rounds) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CAPACITY_NOT_CONFIGURED",
                    message: format!(
                        "No capacity configured for round(s): {}",
                        rounds
                            .iter()
                            .map(|r| r.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<common::round::RoundOutOfRange> for AppError {
    fn from(err: common::round::RoundOutOfRange) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<common::capacity::LimitsError> for AppError {
    fn from(err: common::capacity::LimitsError) -> Self {
        AppError::Validation(err.to_string())
    }
}
