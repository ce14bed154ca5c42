use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MANUAL_ACCEPT: &str = "manual_accept";
pub const MANUAL_ELIMINATE: &str = "manual_eliminate";
pub const AUTO_ACCEPT: &str = "auto_accept";
pub const AUTO_ELIMINATE: &str = "auto_eliminate";

/// Audit trail for admin decisions that bypass the submission log.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "override_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub team_number: i32,
    /// Round the team was in when the override was applied.
    pub round_number: i32,
    /// One of `manual_accept`, `manual_eliminate`, `auto_accept`, `auto_eliminate`.
    pub action: String,
    /// Username of the admin that issued the override.
    pub actor: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
