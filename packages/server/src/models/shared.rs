use std::collections::HashSet;

use serde::Serialize;

use crate::error::AppError;
use crate::services::control::BulkReport;

/// Most team numbers accepted by a single bulk request.
pub const MAX_BULK_TEAMS: usize = 1000;

/// A team a bulk operation could not process.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkFailureItem {
    #[schema(example = 17)]
    pub team_number: i32,
    #[schema(example = "team not found")]
    pub reason: String,
}

/// Per-team outcome of a best-effort bulk operation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkOperationResponse {
    #[schema(example = 41)]
    pub success_count: u64,
    #[schema(example = 1)]
    pub error_count: u64,
    pub failed: Vec<BulkFailureItem>,
}

impl From<BulkReport> for BulkOperationResponse {
    fn from(report: BulkReport) -> Self {
        Self {
            success_count: report.success_count,
            error_count: report.error_count,
            failed: report
                .failed
                .into_iter()
                .map(|f| BulkFailureItem {
                    team_number: f.team_number,
                    reason: f.reason,
                })
                .collect(),
        }
    }
}

/// Validate a team number (must be positive).
pub fn validate_team_number(team_number: i32) -> Result<(), AppError> {
    if team_number <= 0 {
        return Err(AppError::Validation("Team number must be positive".into()));
    }
    Ok(())
}

/// Validate a trimmed team name (1-64 Unicode characters).
pub fn validate_team_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation(
            "Team name must be 1-64 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate an ID list for bulk operations (non-empty, no duplicates, max length).
pub fn validate_bulk_ids(ids: &[i32], name: &str, max: usize) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }
    if ids.len() > max {
        return Err(AppError::Validation(format!("Too many {name}: max {max}")));
    }
    let mut seen = HashSet::new();
    for &id in ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!("Duplicate {name} ID: {id}")));
        }
    }
    Ok(())
}
