use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin-configured capacity for one round.
///
/// Rows double as the per-round lock taken by the advancement decision.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "round_capacity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub round_number: i32,

    pub capacity: i32,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
