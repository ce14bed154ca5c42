use common::ParticipantLimits;
use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AdminConfig;
use crate::entity::{admin_user, round_capacity, submission_log};
use crate::services::control::{ensure_event_row, save_capacities};
use crate::utils::hash;

/// Create the event row and default capacities on an empty database.
pub async fn seed_event(db: &DatabaseConnection) -> Result<(), DbErr> {
    ensure_event_row(db).await?;

    let configured = round_capacity::Entity::find().count(db).await?;
    if configured == 0 {
        save_capacities(db, &ParticipantLimits::defaults()).await?;
        info!("Seeded default round capacities");
    }

    Ok(())
}

/// Create the configured admin account if it does not exist yet.
///
/// An existing account keeps its password; change it in the database.
pub async fn seed_admin(db: &DatabaseConnection, config: &AdminConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.username, &config.password) else {
        warn!("No admin credentials configured, skipping admin seed");
        return Ok(());
    };

    let password_hash = hash::hash_password(password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {}", e))?;

    let model = admin_user::ActiveModel {
        username: Set(username.clone()),
        password: Set(password_hash),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = admin_user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(admin_user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {}
        Ok(_) => info!(username = %username, "Seeded admin account"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Leaderboard: WHERE round_number = ? ORDER BY submission_time
    let index = Index::create()
        .if_not_exists()
        .name("idx_submission_log_round_time")
        .table(submission_log::Entity)
        .col(submission_log::Column::RoundNumber)
        .col(submission_log::Column::SubmissionTime)
        .to_owned();

    let stmt = match db.get_database_backend() {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_submission_log_round_time exists"),
        Err(e) => warn!("Failed to create index idx_submission_log_round_time: {}", e),
    }

    Ok(())
}
