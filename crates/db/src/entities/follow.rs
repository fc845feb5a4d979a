//! Follow entity (subscription of a user to an author).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the check constraint forbidding self-follows.
pub const NO_SELF_FOLLOW_CONSTRAINT: &str = "user__neq__author";

/// Name of the unique index over (`user_id`, `author_id`).
pub const UNIQUE_PAIR_INDEX: &str = "idx_follow_user_author";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The subscriber
    pub user_id: String,

    /// The followed author
    #[sea_orm(indexed)]
    pub author_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}
