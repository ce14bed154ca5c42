use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::event::EventStatusResponse;
use crate::services::control::EventControl;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/status",
    tag = "Event",
    operation_id = "getEventStatus",
    summary = "Public event status",
    responses(
        (status = 200, description = "Event status", body = EventStatusResponse),
        (status = 500, description = "Internal error (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn event_status(
    State(state): State<AppState>,
) -> Result<Json<EventStatusResponse>, AppError> {
    let status = EventControl::new(&state.db).status().await?;
    Ok(Json(status.into()))
}
