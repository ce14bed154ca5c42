use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record that a team completed a round.
///
/// The composite primary key is the store-level guard against counting a team
/// twice in the same round.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub round_number: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_number: i32,
    #[sea_orm(belongs_to, from = "team_number", to = "team_number")]
    pub team: HasOne<super::team::Entity>,

    pub submission_time: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
