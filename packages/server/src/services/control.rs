use chrono::{DateTime, Utc};
use common::ParticipantLimits;
use common::TeamStatus;
use common::ranking::{ScoredTeam, cut_by_score};
use common::round::{FINISHED_ROUND, next_round};
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};

use crate::entity::{event_state, override_log, round_capacity};
use crate::error::AppError;
use crate::services::directory::{
    DirectoryCounts, Guard, TeamDirectory, TeamFilter, TeamUpdate,
};
use crate::services::ledger::{RecordContent, RoundLedger, SubmissionLog};

#[derive(Debug, Clone)]
pub struct BulkFailure {
    pub team_number: i32,
    pub reason: String,
}

/// Per-team tally of a best-effort bulk operation.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub success_count: u64,
    pub error_count: u64,
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    fn succeeded(&mut self) {
        self.success_count += 1;
    }

    fn failed(&mut self, team_number: i32, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(team_number, reason = %reason, "Bulk operation failed for team");
        self.error_count += 1;
        self.failed.push(BulkFailure {
            team_number,
            reason,
        });
    }

    fn record(&mut self, team_number: i32, result: Result<(), String>) {
        match result {
            Ok(()) => self.succeeded(),
            Err(reason) => self.failed(team_number, reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub counts: DirectoryCounts,
}

#[derive(Debug, Clone, Default)]
pub struct AutoEliminateReport {
    pub accepted: Vec<i32>,
    pub eliminated: Vec<i32>,
    pub report: BulkReport,
}

#[derive(Debug, Clone, Copy)]
enum Override {
    Accept,
    Eliminate,
}

/// Create the singleton event row if it is missing.
pub async fn ensure_event_row<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let row = event_state::ActiveModel {
        id: Set(event_state::EVENT_ID),
        running: Set(false),
        started_at: Set(None),
        stopped_at: Set(None),
        updated_at: Set(Utc::now()),
    };
    match event_state::Entity::insert(row)
        .on_conflict(
            OnConflict::column(event_state::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn set_event_state<C: ConnectionTrait>(
    conn: &C,
    running: bool,
    started_at: Option<Option<DateTime<Utc>>>,
    stopped_at: Option<Option<DateTime<Utc>>>,
) -> Result<(), DbErr> {
    ensure_event_row(conn).await?;
    let mut row = event_state::ActiveModel {
        running: Set(running),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(v) = started_at {
        row.started_at = Set(v);
    }
    if let Some(v) = stopped_at {
        row.stopped_at = Set(v);
    }
    event_state::Entity::update_many()
        .set(row)
        .filter(event_state::Column::Id.eq(event_state::EVENT_ID))
        .exec(conn)
        .await?;
    Ok(())
}

/// Drain in-flight decisions and close play before the ledgers are cleared.
///
/// Decisions hold their round's capacity row until they commit. Once every row
/// is held here and access is revoked, no decision from the previous run can
/// land after the clear.
async fn halt_play(txn: &DatabaseTransaction) -> Result<u64, DbErr> {
    let mut rows =
        round_capacity::Entity::find().order_by_asc(round_capacity::Column::RoundNumber);
    if txn.get_database_backend() != DbBackend::Sqlite {
        rows = rows.lock(LockType::Update);
    }
    rows.all(txn).await?;
    TeamDirectory::new(txn).revoke_access().await
}

/// Upsert one capacity row per round in `limits`.
pub async fn save_capacities<C: ConnectionTrait>(
    conn: &C,
    limits: &ParticipantLimits,
) -> Result<(), DbErr> {
    let now = Utc::now();
    for (round, capacity) in limits.iter() {
        let row = round_capacity::ActiveModel {
            round_number: Set(round),
            capacity: Set(capacity),
            updated_at: Set(now),
        };
        round_capacity::Entity::insert(row)
            .on_conflict(
                OnConflict::column(round_capacity::Column::RoundNumber)
                    .update_columns([
                        round_capacity::Column::Capacity,
                        round_capacity::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

pub async fn load_capacities<C: ConnectionTrait>(conn: &C) -> Result<ParticipantLimits, DbErr> {
    let rows: Vec<(i32, i32)> = round_capacity::Entity::find()
        .select_only()
        .column(round_capacity::Column::RoundNumber)
        .column(round_capacity::Column::Capacity)
        .order_by_asc(round_capacity::Column::RoundNumber)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Event lifecycle and admin overrides.
///
/// Ledger clears run in one transaction; per-team updates are independent and
/// reported individually, so a failing team never aborts the rest.
pub struct EventControl<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> EventControl<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    async fn event_row(&self) -> Result<event_state::Model, DbErr> {
        ensure_event_row(self.db).await?;
        event_state::Entity::find_by_id(event_state::EVENT_ID)
            .one(self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("event_state".into()))
    }

    pub async fn status(&self) -> Result<EventStatus, AppError> {
        let row = self.event_row().await?;
        let counts = TeamDirectory::new(self.db).counts().await?;
        Ok(EventStatus {
            running: row.running,
            started_at: row.started_at,
            stopped_at: row.stopped_at,
            counts,
        })
    }

    pub async fn capacities(&self) -> Result<ParticipantLimits, AppError> {
        Ok(load_capacities(self.db).await?)
    }

    /// Replace capacities. Rejected while the event is running.
    pub async fn update_capacities(
        &self,
        limits: &ParticipantLimits,
    ) -> Result<ParticipantLimits, AppError> {
        limits.validate()?;
        if self.event_row().await?.running {
            return Err(AppError::Conflict(
                "Capacities cannot be changed while the event is running".into(),
            ));
        }
        save_capacities(self.db, limits).await?;
        info!(rounds = limits.iter().count(), "Capacities updated");
        self.capacities().await
    }

    #[instrument(skip(self, limits))]
    pub async fn start(&self, limits: Option<ParticipantLimits>) -> Result<BulkReport, AppError> {
        if let Some(limits) = &limits {
            limits.validate()?;
            save_capacities(self.db, limits).await?;
        }

        let config = load_capacities(self.db).await?;
        let missing = config.missing_rounds();
        if !missing.is_empty() {
            return Err(AppError::CapacityNotConfigured(missing));
        }

        let txn = self.db.begin().await?;
        halt_play(&txn).await?;
        let cleared = SubmissionLog::new(&txn).clear().await?;
        RoundLedger::new(&txn).clear_submitted().await?;
        set_event_state(&txn, true, Some(Some(Utc::now())), Some(None)).await?;
        txn.commit().await?;

        let report = self
            .for_each_team(|| TeamUpdate {
                event_access: Some(true),
                participant_limits: Some(Some(config.clone())),
                ..TeamUpdate::reset()
            })
            .await?;

        info!(
            cleared_entries = cleared,
            success_count = report.success_count,
            error_count = report.error_count,
            "Event started"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<BulkReport, AppError> {
        set_event_state(self.db, false, None, Some(Some(Utc::now()))).await?;

        let report = self
            .for_each_team(|| TeamUpdate {
                event_access: Some(false),
                ..Default::default()
            })
            .await?;

        info!(
            success_count = report.success_count,
            error_count = report.error_count,
            "Event stopped"
        );
        Ok(report)
    }

    /// Back to the pre-event state. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<BulkReport, AppError> {
        let txn = self.db.begin().await?;
        halt_play(&txn).await?;
        SubmissionLog::new(&txn).clear().await?;
        RoundLedger::new(&txn).clear_submitted().await?;
        set_event_state(&txn, false, Some(None), Some(None)).await?;
        txn.commit().await?;

        let report = self.for_each_team(TeamUpdate::reset).await?;

        info!(
            success_count = report.success_count,
            error_count = report.error_count,
            "Event reset"
        );
        Ok(report)
    }

    async fn for_each_team(
        &self,
        update: impl Fn() -> TeamUpdate,
    ) -> Result<BulkReport, AppError> {
        let directory = TeamDirectory::new(self.db);
        let mut report = BulkReport::default();
        for team_number in directory.list_team_numbers().await? {
            let result = match directory.update_team(team_number, update()).await {
                Ok(true) => Ok(()),
                Ok(false) => Err("team not found".to_string()),
                Err(e) => Err(e.to_string()),
            };
            report.record(team_number, result);
        }
        Ok(report)
    }

    #[instrument(skip(self, team_numbers), fields(count = team_numbers.len()))]
    pub async fn accept(&self, team_numbers: &[i32], actor: &str) -> BulkReport {
        let mut report = BulkReport::default();
        for &team_number in team_numbers {
            let result = self
                .apply_override(
                    team_number,
                    None,
                    Override::Accept,
                    override_log::MANUAL_ACCEPT,
                    actor,
                )
                .await;
            report.record(team_number, result);
        }
        info!(success_count = report.success_count, "Manual accept applied");
        report
    }

    #[instrument(skip(self, team_numbers), fields(count = team_numbers.len()))]
    pub async fn eliminate(&self, team_numbers: &[i32], actor: &str) -> BulkReport {
        let mut report = BulkReport::default();
        for &team_number in team_numbers {
            let result = self
                .apply_override(
                    team_number,
                    None,
                    Override::Eliminate,
                    override_log::MANUAL_ELIMINATE,
                    actor,
                )
                .await;
            report.record(team_number, result);
        }
        info!(success_count = report.success_count, "Manual eliminate applied");
        report
    }

    /// Keep the top `limit` active teams of `round` by score, cut the rest.
    #[instrument(skip(self))]
    pub async fn auto_eliminate(
        &self,
        round: i32,
        limit: usize,
        actor: &str,
    ) -> Result<AutoEliminateReport, AppError> {
        let filter = TeamFilter {
            status: Some(TeamStatus::Active),
            round: Some(round),
        };
        let candidates = TeamDirectory::new(self.db)
            .list_teams(&filter)
            .await?
            .into_iter()
            .map(|t| ScoredTeam {
                team_number: t.team_number,
                total_score: t.total_score,
            })
            .collect();
        let cut = cut_by_score(candidates, limit);

        let mut report = BulkReport::default();
        for &team_number in &cut.accepted {
            let result = self
                .apply_override(
                    team_number,
                    Some(round),
                    Override::Accept,
                    override_log::AUTO_ACCEPT,
                    actor,
                )
                .await;
            report.record(team_number, result);
        }
        for &team_number in &cut.eliminated {
            let result = self
                .apply_override(
                    team_number,
                    Some(round),
                    Override::Eliminate,
                    override_log::AUTO_ELIMINATE,
                    actor,
                )
                .await;
            report.record(team_number, result);
        }

        info!(
            round,
            accepted = cut.accepted.len(),
            eliminated = cut.eliminated.len(),
            error_count = report.error_count,
            "Auto-eliminate applied"
        );
        Ok(AutoEliminateReport {
            accepted: cut.accepted,
            eliminated: cut.eliminated,
            report,
        })
    }

    /// Apply one override and its audit entry in a single transaction.
    ///
    /// `expected_round` pins the team to a round; the override is refused if
    /// the team has moved on.
    async fn apply_override(
        &self,
        team_number: i32,
        expected_round: Option<i32>,
        action: Override,
        audit_action: &str,
        actor: &str,
    ) -> Result<(), String> {
        self.try_override(team_number, expected_round, action, audit_action, actor)
            .await
            .map_err(|e| match e {
                OverrideError::Refused(reason) => reason,
                OverrideError::Store(e) => e.to_string(),
            })
    }

    async fn try_override(
        &self,
        team_number: i32,
        expected_round: Option<i32>,
        action: Override,
        audit_action: &str,
        actor: &str,
    ) -> Result<(), OverrideError> {
        let txn = self.db.begin().await?;
        let directory = TeamDirectory::new(&txn);

        let Some(team) = directory.get_team(team_number).await? else {
            txn.rollback().await?;
            return Err(OverrideError::Refused("team not found".into()));
        };
        if expected_round.is_some_and(|r| r != team.current_round) {
            txn.rollback().await?;
            return Err(OverrideError::Refused(format!(
                "team is in round {}",
                team.current_round
            )));
        }

        let update = match action {
            Override::Accept => {
                if team.current_round >= FINISHED_ROUND {
                    txn.rollback().await?;
                    return Err(OverrideError::Refused("team already finished".into()));
                }
                TeamUpdate::advance_to(next_round(team.current_round))
            }
            Override::Eliminate => {
                if !team.status.is_active() {
                    txn.rollback().await?;
                    return Err(OverrideError::Refused("team already eliminated".into()));
                }
                TeamUpdate::eliminate_at(team.current_round, Utc::now())
            }
        };

        let guard = Guard {
            current_round: team.current_round,
            status: team.status,
        };
        if !directory
            .update_team_guarded(team_number, guard, update)
            .await?
        {
            txn.rollback().await?;
            return Err(OverrideError::Refused("team changed concurrently".into()));
        }

        let entry = override_log::ActiveModel {
            team_number: Set(team_number),
            round_number: Set(team.current_round),
            action: Set(audit_action.to_string()),
            actor: Set(actor.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        override_log::Entity::insert(entry)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Store question content for `round`. Teams that do not exist are
    /// reported as failures.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn upload_records(
        &self,
        round: i32,
        records: Vec<RecordContent>,
    ) -> Result<BulkReport, AppError> {
        let directory = TeamDirectory::new(self.db);
        let ledger = RoundLedger::new(self.db);
        let mut report = BulkReport::default();

        for record in records {
            let team_number = record.team_number;
            let result = match directory.get_team(team_number).await {
                Ok(None) => Err("team not found".to_string()),
                Ok(Some(_)) => ledger
                    .upsert_record(round, record)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            report.record(team_number, result);
        }

        info!(
            round,
            success_count = report.success_count,
            error_count = report.error_count,
            "Round records uploaded"
        );
        Ok(report)
    }

    pub async fn overrides(
        &self,
        team_number: Option<i32>,
        limit: u64,
    ) -> Result<Vec<override_log::Model>, AppError> {
        let mut query = override_log::Entity::find();
        if let Some(team_number) = team_number {
            query = query.filter(override_log::Column::TeamNumber.eq(team_number));
        }
        Ok(query
            .order_by_desc(override_log::Column::Id)
            .limit(limit)
            .all(self.db)
            .await?)
    }
}

#[derive(Debug)]
enum OverrideError {
    Refused(String),
    Store(DbErr),
}

impl From<DbErr> for OverrideError {
    fn from(e: DbErr) -> Self {
        OverrideError::Store(e)
    }
}
