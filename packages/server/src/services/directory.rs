use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::round::{FINISHED_ROUND, rounds};
use common::{ParticipantLimits, TeamStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};

use crate::entity::{override_log, round_record, submission_log, team};

/// Field changes applied to a team record. `None` leaves a field untouched.
///
/// Nullable fields use `Option<Option<T>>`: `Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub current_round: Option<i32>,
    pub status: Option<TeamStatus>,
    pub eliminated_round: Option<Option<i32>>,
    pub eliminated_at: Option<Option<DateTime<Utc>>>,
    pub event_access: Option<bool>,
    pub participant_limits: Option<Option<ParticipantLimits>>,
    pub total_score: Option<i32>,
    pub answers_correct: Option<i32>,
}

impl TeamUpdate {
    /// Back to the registration state: round 1, active, no access, no limits, zero scores.
    pub fn reset() -> Self {
        Self {
            current_round: Some(1),
            status: Some(TeamStatus::Active),
            eliminated_round: Some(None),
            eliminated_at: Some(None),
            event_access: Some(false),
            participant_limits: Some(None),
            total_score: Some(0),
            answers_correct: Some(0),
        }
    }

    /// Move to `round`, clearing any elimination.
    pub fn advance_to(round: i32) -> Self {
        Self {
            current_round: Some(round),
            status: Some(TeamStatus::Active),
            eliminated_round: Some(None),
            eliminated_at: Some(None),
            ..Default::default()
        }
    }

    pub fn eliminate_at(round: i32, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(TeamStatus::Eliminated),
            eliminated_round: Some(Some(round)),
            eliminated_at: Some(Some(at)),
            ..Default::default()
        }
    }

    fn into_active_model(self) -> team::ActiveModel {
        let mut active = team::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(v) = self.current_round {
            active.current_round = Set(v);
        }
        if let Some(v) = self.status {
            active.status = Set(v);
        }
        if let Some(v) = self.eliminated_round {
            active.eliminated_round = Set(v);
        }
        if let Some(v) = self.eliminated_at {
            active.eliminated_at = Set(v);
        }
        if let Some(v) = self.event_access {
            active.event_access = Set(v);
        }
        if let Some(v) = self.participant_limits {
            active.participant_limits = Set(v.map(|l| l.to_json()));
        }
        if let Some(v) = self.total_score {
            active.total_score = Set(v);
        }
        if let Some(v) = self.answers_correct {
            active.answers_correct = Set(v);
        }
        active
    }
}

/// Expected state of a team at update time. The update is skipped if it changed.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    pub current_round: i32,
    pub status: TeamStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    pub status: Option<TeamStatus>,
    pub round: Option<i32>,
}

/// Aggregate counts for the admin console.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryCounts {
    pub total: u64,
    pub active: u64,
    pub eliminated: u64,
    pub with_access: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundHeadcount {
    pub active: u64,
    pub eliminated: u64,
}

/// Headcount per playable round plus teams that finished every round.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub rounds: BTreeMap<i32, RoundHeadcount>,
    pub finished: u64,
}

/// New team as submitted at signup or by an admin.
pub struct NewTeam {
    pub team_number: i32,
    pub team_name: String,
    pub password_hash: String,
}

/// Authoritative store of team records, keyed by team number.
///
/// Every write is a single independent statement; callers that need several
/// writes to commit together pass a transaction as the connection.
pub struct TeamDirectory<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TeamDirectory<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_team(&self, team_number: i32) -> Result<Option<team::Model>, DbErr> {
        team::Entity::find_by_id(team_number).one(self.conn).await
    }

    /// Teams ordered by team number.
    pub async fn list_teams(&self, filter: &TeamFilter) -> Result<Vec<team::Model>, DbErr> {
        let mut query = team::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(team::Column::Status.eq(status));
        }
        if let Some(round) = filter.round {
            query = query.filter(team::Column::CurrentRound.eq(round));
        }
        query
            .order_by_asc(team::Column::TeamNumber)
            .all(self.conn)
            .await
    }

    /// Team numbers only, in order. Used to drive bulk operations.
    pub async fn list_team_numbers(&self) -> Result<Vec<i32>, DbErr> {
        team::Entity::find()
            .select_only()
            .column(team::Column::TeamNumber)
            .order_by_asc(team::Column::TeamNumber)
            .into_tuple()
            .all(self.conn)
            .await
    }

    pub async fn create_team(&self, new_team: NewTeam) -> Result<team::Model, DbErr> {
        let now = Utc::now();
        let model = team::ActiveModel {
            team_number: Set(new_team.team_number),
            team_name: Set(new_team.team_name),
            password: Set(new_team.password_hash),
            current_round: Set(1),
            status: Set(TeamStatus::Active),
            eliminated_round: Set(None),
            eliminated_at: Set(None),
            event_access: Set(false),
            participant_limits: Set(None),
            total_score: Set(0),
            answers_correct: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        team::Entity::insert(model)
            .exec_without_returning(self.conn)
            .await?;
        self.get_team(new_team.team_number)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("team {}", new_team.team_number)))
    }

    /// Apply `update`. Returns `false` if the team does not exist.
    pub async fn update_team(&self, team_number: i32, update: TeamUpdate) -> Result<bool, DbErr> {
        let result = team::Entity::update_many()
            .set(update.into_active_model())
            .filter(team::Column::TeamNumber.eq(team_number))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Clear `event_access` on every team at once.
    pub async fn revoke_access(&self) -> Result<u64, DbErr> {
        let update = TeamUpdate {
            event_access: Some(false),
            ..Default::default()
        };
        let result = team::Entity::update_many()
            .set(update.into_active_model())
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Apply `update` only if the team is still in the `guard` state.
    pub async fn update_team_guarded(
        &self,
        team_number: i32,
        guard: Guard,
        update: TeamUpdate,
    ) -> Result<bool, DbErr> {
        let result = team::Entity::update_many()
            .set(update.into_active_model())
            .filter(team::Column::TeamNumber.eq(team_number))
            .filter(team::Column::CurrentRound.eq(guard.current_round))
            .filter(team::Column::Status.eq(guard.status))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn counts(&self) -> Result<DirectoryCounts, DbErr> {
        let total = team::Entity::find().count(self.conn).await?;
        let active = team::Entity::find()
            .filter(team::Column::Status.eq(TeamStatus::Active))
            .count(self.conn)
            .await?;
        let with_access = team::Entity::find()
            .filter(team::Column::EventAccess.eq(true))
            .count(self.conn)
            .await?;

        Ok(DirectoryCounts {
            total,
            active,
            eliminated: total.saturating_sub(active),
            with_access,
        })
    }

    pub async fn progress(&self) -> Result<Progress, DbErr> {
        let rows: Vec<(i32, TeamStatus)> = team::Entity::find()
            .select_only()
            .column(team::Column::CurrentRound)
            .column(team::Column::Status)
            .into_tuple()
            .all(self.conn)
            .await?;

        let mut progress = Progress {
            rounds: rounds().map(|r| (r, RoundHeadcount::default())).collect(),
            finished: 0,
        };
        for (round, status) in rows {
            if round >= FINISHED_ROUND && status.is_active() {
                progress.finished += 1;
                continue;
            }
            if let Some(headcount) = progress.rounds.get_mut(&round) {
                match status {
                    TeamStatus::Active => headcount.active += 1,
                    TeamStatus::Eliminated => headcount.eliminated += 1,
                }
            }
        }
        Ok(progress)
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> TeamDirectory<'a, C> {
    /// Remove a team together with every row that references it.
    /// Returns `false` if the team does not exist.
    pub async fn delete_team(&self, team_number: i32) -> Result<bool, DbErr> {
        let txn = self.conn.begin().await?;

        round_record::Entity::delete_many()
            .filter(round_record::Column::TeamNumber.eq(team_number))
            .exec(&txn)
            .await?;
        submission_log::Entity::delete_many()
            .filter(submission_log::Column::TeamNumber.eq(team_number))
            .exec(&txn)
            .await?;
        override_log::Entity::delete_many()
            .filter(override_log::Column::TeamNumber.eq(team_number))
            .exec(&txn)
            .await?;
        let result = team::Entity::delete_by_id(team_number).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

/// Score-only edit used by the admin console.
pub async fn set_scores<C: ConnectionTrait>(
    conn: &C,
    team_number: i32,
    total_score: Option<i32>,
    answers_correct: Option<i32>,
) -> Result<Option<team::Model>, DbErr> {
    let directory = TeamDirectory::new(conn);
    let updated = directory
        .update_team(
            team_number,
            TeamUpdate {
                total_score,
                answers_correct,
                ..Default::default()
            },
        )
        .await?;
    if !updated {
        return Ok(None);
    }
    directory.get_team(team_number).await
}
