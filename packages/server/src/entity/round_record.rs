use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Question content and submission flag for one team in one round.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "round_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_number: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub round_number: i32,
    #[sea_orm(belongs_to, from = "team_number", to = "team_number")]
    pub team: HasOne<super::team::Entity>,

    #[sea_orm(column_type = "Text")]
    pub question: String,
    #[sea_orm(column_type = "Text")]
    pub answer: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub clue: Option<String>,

    /// Flips false -> true exactly once per event run.
    #[sea_orm(default_value = false)]
    pub submitted: bool,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
