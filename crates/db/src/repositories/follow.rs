//! Follow repository.

use std::sync::Arc;

use crate::entities::{Follow, follow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, SqlErr,
};
use yatube_common::{AppError, AppResult};

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the follow row for a (user, author) pair.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        author_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user follows an author.
    pub async fn is_following(&self, user_id: &str, author_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(user_id, author_id).await?.is_some())
    }

    /// Create a new follow row.
    ///
    /// Rows rejected by the pair uniqueness index or the self-follow check
    /// constraint come back as [`AppError::Conflict`].
    pub async fn create(&self, model: follow::ActiveModel) -> AppResult<follow::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_insert_error)
    }

    /// Delete the follow row for a pair, if any.
    ///
    /// Returns whether a row was removed.
    pub async fn delete_by_pair(&self, user_id: &str, author_id: &str) -> AppResult<bool> {
        let result = Follow::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Count the authors a user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn map_insert_error(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
        return AppError::Conflict(msg);
    }
    let message = err.to_string();
    if message.contains(follow::NO_SELF_FOLLOW_CONSTRAINT)
        || message.contains(follow::UNIQUE_PAIR_INDEX)
    {
        return AppError::Conflict(message);
    }
    AppError::Database(message)
}
