use common::TeamStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_number: i32,

    pub team_name: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,

    /// 1..=8 while playing, 9 once every round is cleared.
    #[sea_orm(default_value = 1, indexed)]
    pub current_round: i32,
    #[sea_orm(indexed)]
    pub status: TeamStatus,
    pub eliminated_round: Option<i32>,
    pub eliminated_at: Option<DateTimeUtc>,

    #[sea_orm(default_value = false)]
    pub event_access: bool,
    /// Capacity snapshot taken at event start, `{"1": 30, ...}`.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub participant_limits: Option<Json>,

    #[sea_orm(default_value = 0)]
    pub total_score: i32,
    #[sea_orm(default_value = 0)]
    pub answers_correct: i32,

    #[sea_orm(has_many)]
    pub round_records: HasMany<super::round_record::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission_log::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn progress(&self) -> common::TeamProgress {
        common::TeamProgress {
            current_round: self.current_round,
            status: self.status,
            eliminated_round: self.eliminated_round,
            event_access: self.event_access,
        }
    }

    /// The capacity snapshot, or an empty map when the event never started.
    pub fn limits(&self) -> common::ParticipantLimits {
        read_limits(self.team_number, self.participant_limits.as_ref())
    }
}

/// An unreadable snapshot is logged and read as empty, so every round
/// reports `CAPACITY_NOT_CONFIGURED` until the event is restarted.
fn read_limits(team_number: i32, snapshot: Option<&Json>) -> common::ParticipantLimits {
    let Some(value) = snapshot else {
        return common::ParticipantLimits::default();
    };
    match common::ParticipantLimits::from_json(value) {
        Ok(limits) => limits,
        Err(e) => {
            tracing::warn!(team_number, error = %e, "Unreadable capacity snapshot");
            common::ParticipantLimits::default()
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
