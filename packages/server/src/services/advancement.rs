use chrono::Utc;
use common::admission::{admit, recorded_outcome};
use common::answer::answers_match;
use common::round::next_round;
use common::{Admission, TeamStatus};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, EntityTrait,
    QuerySelect, TransactionTrait, sea_query::LockType,
};
use tracing::{info, instrument, warn};

use crate::entity::{round_capacity, team};
use crate::error::AppError;
use crate::services::directory::{Guard, TeamDirectory, TeamUpdate};
use crate::services::ledger::{RoundLedger, SubmissionLog};

#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    #[error("team not found")]
    TeamNotFound,
    #[error("round record not found")]
    RoundRecordNotFound,
    #[error("round is not accessible")]
    RoundNotAccessible,
    #[error("incorrect answer")]
    IncorrectAnswer,
    #[error("no capacity configured for round {0}")]
    CapacityNotConfigured(i32),
    /// Store failure before the decision started. Nothing was written.
    #[error("lookup failed: {0}")]
    Lookup(DbErr),
    /// The decision was rolled back. Safe to retry.
    #[error("decision aborted: {0}")]
    Aborted(DbErr),
}

impl From<AdvanceError> for AppError {
    fn from(e: AdvanceError) -> Self {
        match e {
            AdvanceError::TeamNotFound => AppError::TeamNotFound,
            AdvanceError::RoundRecordNotFound => AppError::RoundRecordNotFound,
            AdvanceError::RoundNotAccessible => AppError::RoundNotAccessible,
            AdvanceError::IncorrectAnswer => AppError::IncorrectAnswer,
            AdvanceError::CapacityNotConfigured(round) => {
                AppError::CapacityNotConfigured(vec![round])
            }
            AdvanceError::Lookup(e) => AppError::from(e),
            AdvanceError::Aborted(e) => AppError::AdvancementFailed(e.to_string()),
        }
    }
}

/// What a submission resolved to.
#[derive(Debug, Clone)]
pub struct Decision {
    pub admission: Admission,
    /// Team record after the decision.
    pub team: team::Model,
    /// The round had already been decided; nothing was written.
    pub replayed: bool,
    /// 1-based arrival position in the round. `None` on replay.
    pub arrival_rank: Option<u64>,
}

/// Decides advance-or-eliminate for correct answers.
///
/// A decision is one transaction: serialize on the round's capacity row, claim
/// the round record, append to the submission log, count arrivals, admit or
/// cut, update the team. Either every write lands or none do.
///
/// Locks are taken capacity row first, then round record, then team. Event
/// start and reset take them in the same order.
pub struct AdvancementEngine<'a> {
    db: &'a DatabaseConnection,
    case_sensitive: bool,
}

impl<'a> AdvancementEngine<'a> {
    pub fn new(db: &'a DatabaseConnection, case_sensitive: bool) -> Self {
        Self { db, case_sensitive }
    }

    #[instrument(skip(self, candidate))]
    pub async fn submit_answer(
        &self,
        team_number: i32,
        round: i32,
        candidate: &str,
    ) -> Result<Decision, AdvanceError> {
        let team = TeamDirectory::new(self.db)
            .get_team(team_number)
            .await
            .map_err(AdvanceError::Lookup)?
            .ok_or(AdvanceError::TeamNotFound)?;

        if !team.event_access {
            return Err(AdvanceError::RoundNotAccessible);
        }

        let record = RoundLedger::new(self.db)
            .get_record(team_number, round)
            .await
            .map_err(AdvanceError::Lookup)?;

        if record.as_ref().is_some_and(|r| r.submitted) {
            return replay(team, round);
        }
        if !team.progress().can_play(round) {
            return Err(AdvanceError::RoundNotAccessible);
        }
        let record = record.ok_or(AdvanceError::RoundRecordNotFound)?;

        if !answers_match(candidate, &record.answer, self.case_sensitive) {
            return Err(AdvanceError::IncorrectAnswer);
        }

        self.decide(team_number, round).await
    }

    async fn decide(&self, team_number: i32, round: i32) -> Result<Decision, AdvanceError> {
        let txn = self.db.begin().await.map_err(AdvanceError::Aborted)?;

        if let Err(e) = lock_round(&txn, round).await {
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            return Err(e);
        }

        let claimed = RoundLedger::new(&txn)
            .mark_submitted(team_number, round)
            .await
            .map_err(AdvanceError::Aborted)?;
        if !claimed {
            // Lost the claim to a concurrent submission from the same team.
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            let team = TeamDirectory::new(self.db)
                .get_team(team_number)
                .await
                .map_err(AdvanceError::Lookup)?
                .ok_or(AdvanceError::TeamNotFound)?;
            return replay(team, round);
        }

        let now = Utc::now();

        let directory = TeamDirectory::new(&txn);
        let Some(team) = directory
            .get_team(team_number)
            .await
            .map_err(AdvanceError::Aborted)?
        else {
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            return Err(AdvanceError::TeamNotFound);
        };
        if !team.progress().can_play(round) {
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            return Err(AdvanceError::RoundNotAccessible);
        }
        let Some(capacity) = team.limits().get(round) else {
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            return Err(AdvanceError::CapacityNotConfigured(round));
        };

        let log = SubmissionLog::new(&txn);
        log.append(team_number, round, now)
            .await
            .map_err(AdvanceError::Aborted)?;
        let arrival_rank = log
            .count_for_round(round)
            .await
            .map_err(AdvanceError::Aborted)?;

        let admission = admit(arrival_rank, capacity.max(0) as u64);
        let update = match admission {
            Admission::Advanced => TeamUpdate::advance_to(next_round(round)),
            Admission::Eliminated => TeamUpdate::eliminate_at(round, now),
        };
        let update = TeamUpdate {
            answers_correct: Some(team.answers_correct.saturating_add(1)),
            ..update
        };

        let guard = Guard {
            current_round: round,
            status: TeamStatus::Active,
        };
        let applied = directory
            .update_team_guarded(team_number, guard, update)
            .await
            .map_err(AdvanceError::Aborted)?;
        if !applied {
            warn!(team_number, round, "Team changed during decision, rolling back");
            txn.rollback().await.map_err(AdvanceError::Aborted)?;
            return Err(AdvanceError::Aborted(DbErr::Custom(
                "team record changed during decision".into(),
            )));
        }

        let team = directory
            .get_team(team_number)
            .await
            .map_err(AdvanceError::Aborted)?
            .ok_or(AdvanceError::TeamNotFound)?;

        txn.commit().await.map_err(AdvanceError::Aborted)?;

        info!(
            team_number,
            round,
            arrival_rank,
            capacity,
            advanced = admission.is_advanced(),
            "Round decided"
        );

        Ok(Decision {
            admission,
            team,
            replayed: false,
            arrival_rank: Some(arrival_rank),
        })
    }
}

/// Serialize decisions for one round on its capacity row.
///
/// SQLite has no row locks; there the claim update that follows takes the
/// database write lock for the rest of the transaction.
async fn lock_round(txn: &DatabaseTransaction, round: i32) -> Result<(), AdvanceError> {
    let mut query = round_capacity::Entity::find_by_id(round);
    if txn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock(LockType::Update);
    }
    match query.one(txn).await.map_err(AdvanceError::Aborted)? {
        Some(_) => Ok(()),
        None => Err(AdvanceError::CapacityNotConfigured(round)),
    }
}

fn replay(team: team::Model, round: i32) -> Result<Decision, AdvanceError> {
    match recorded_outcome(&team.progress(), round) {
        Some(admission) => Ok(Decision {
            admission,
            team,
            replayed: true,
            arrival_rank: None,
        }),
        None => Err(AdvanceError::RoundNotAccessible),
    }
}
