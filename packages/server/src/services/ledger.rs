use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::{round_record, submission_log};

/// Question content for one team in one round, as uploaded by an admin.
#[derive(Debug, Clone)]
pub struct RecordContent {
    pub team_number: i32,
    pub question: String,
    pub answer: String,
    pub clue: Option<String>,
}

/// Per-team round records: question, expected answer and the submitted flag.
pub struct RoundLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RoundLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_record(
        &self,
        team_number: i32,
        round: i32,
    ) -> Result<Option<round_record::Model>, DbErr> {
        round_record::Entity::find_by_id((team_number, round))
            .one(self.conn)
            .await
    }

    pub async fn records_for_team(
        &self,
        team_number: i32,
    ) -> Result<Vec<round_record::Model>, DbErr> {
        round_record::Entity::find()
            .filter(round_record::Column::TeamNumber.eq(team_number))
            .order_by_asc(round_record::Column::RoundNumber)
            .all(self.conn)
            .await
    }

    /// Insert or replace question content. Never touches the submitted flag.
    pub async fn upsert_record(&self, round: i32, content: RecordContent) -> Result<(), DbErr> {
        let model = round_record::ActiveModel {
            team_number: Set(content.team_number),
            round_number: Set(round),
            question: Set(content.question),
            answer: Set(content.answer),
            clue: Set(content.clue),
            submitted: Set(false),
            updated_at: Set(Utc::now()),
        };

        round_record::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    round_record::Column::TeamNumber,
                    round_record::Column::RoundNumber,
                ])
                .update_columns([
                    round_record::Column::Question,
                    round_record::Column::Answer,
                    round_record::Column::Clue,
                    round_record::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    /// Flip the submitted flag from false to true.
    ///
    /// Returns `false` when the flag was already set (or the record is gone),
    /// which makes this the claim step of an advancement decision.
    pub async fn mark_submitted(&self, team_number: i32, round: i32) -> Result<bool, DbErr> {
        let result = round_record::Entity::update_many()
            .col_expr(round_record::Column::Submitted, Expr::value(true))
            .col_expr(round_record::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(round_record::Column::TeamNumber.eq(team_number))
            .filter(round_record::Column::RoundNumber.eq(round))
            .filter(round_record::Column::Submitted.eq(false))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn clear_submitted(&self) -> Result<u64, DbErr> {
        let result = round_record::Entity::update_many()
            .col_expr(round_record::Column::Submitted, Expr::value(false))
            .col_expr(round_record::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(round_record::Column::Submitted.eq(true))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Append-only record of completed rounds. Arrival order is admission order.
pub struct SubmissionLog<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SubmissionLog<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Fails with a unique-constraint error if the team already has an entry
    /// for `round`.
    pub async fn append(
        &self,
        team_number: i32,
        round: i32,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let entry = submission_log::ActiveModel {
            round_number: Set(round),
            team_number: Set(team_number),
            submission_time: Set(at),
        };
        submission_log::Entity::insert(entry)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    pub async fn count_for_round(&self, round: i32) -> Result<u64, DbErr> {
        submission_log::Entity::find()
            .filter(submission_log::Column::RoundNumber.eq(round))
            .count(self.conn)
            .await
    }

    /// Earliest arrivals first; same-instant ties go to the lower team number.
    pub async fn arrivals(
        &self,
        round: i32,
        limit: u64,
    ) -> Result<Vec<submission_log::Model>, DbErr> {
        submission_log::Entity::find()
            .filter(submission_log::Column::RoundNumber.eq(round))
            .order_by_asc(submission_log::Column::SubmissionTime)
            .order_by_asc(submission_log::Column::TeamNumber)
            .limit(limit)
            .all(self.conn)
            .await
    }

    pub async fn clear(&self) -> Result<u64, DbErr> {
        let result = submission_log::Entity::delete_many()
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
