//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, follow, post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Query,
};
use yatube_common::{AppError, AppResult};

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post.
    All,
    /// Posts in the group with this ID.
    Group(String),
    /// Posts written by the user with this ID.
    Author(String),
    /// Posts written by anyone the user with this ID follows.
    FollowedBy(String),
}

impl PostFilter {
    fn condition(&self) -> Condition {
        match self {
            Self::All => Condition::all(),
            Self::Group(group_id) => Condition::all().add(post::Column::GroupId.eq(group_id)),
            Self::Author(author_id) => {
                Condition::all().add(post::Column::AuthorId.eq(author_id))
            }
            Self::FollowedBy(user_id) => Condition::all().add(
                post::Column::AuthorId.in_subquery(
                    Query::select()
                        .column(follow::Column::AuthorId)
                        .from(follow::Entity)
                        .and_where(follow::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            ),
        }
    }
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Its comments go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count posts matching a filter.
    pub async fn count(&self, filter: &PostFilter) -> AppResult<u64> {
        Post::find()
            .filter(filter.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a slice of posts matching a filter, newest first.
    pub async fn find_slice(
        &self,
        filter: &PostFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(filter.condition())
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts written by a user.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        self.count(&PostFilter::Author(author_id.to_string())).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    fn create_test_post(id: &str, author_id: &str, group_id: Option<&str>) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: "Test text".to_string(),
            pub_date: Utc::now().into(),
            author_id: author_id.to_string(),
            group_id: group_id.map(ToString::to_string),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_count_returns_correct_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(13))
                }]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let count = repo.count(&PostFilter::All).await.unwrap();

        assert_eq!(count, 13);
    }

    #[tokio::test]
    async fn test_find_slice() {
        let p1 = create_test_post("p2", "u1", Some("g1"));
        let p2 = create_test_post("p1", "u1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let posts = repo
            .find_slice(&PostFilter::Author("u1".to_string()), 10, 0)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "p2");
    }

    #[test]
    fn test_followed_by_filter_uses_follow_subquery() {
        let sql = Post::find()
            .filter(PostFilter::FollowedBy("u1".to_string()).condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""post"."author_id" IN (SELECT "author_id" FROM "follow""#));
        assert!(sql.contains(r#""user_id" = 'u1'"#));
    }

    #[test]
    fn test_group_filter() {
        let sql = Post::find()
            .filter(PostFilter::Group("g1".to_string()).condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""post"."group_id" = 'g1'"#));
    }

    #[test]
    fn test_display_truncates_to_fifteen_chars() {
        let mut post = create_test_post("p1", "u1", None);
        post.text = "Тестовый пост Тестовый пост ".to_string();
        assert_eq!(post.to_string(), "Тестовый пост Т");
    }
}
