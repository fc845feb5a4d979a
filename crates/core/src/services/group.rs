//! Group service.

use std::sync::LazyLock;

use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{entities::group, repositories::GroupRepository};

#[allow(clippy::expect_used)]
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern compiles"));

/// Input for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(
        length(min = 1, max = 50),
        regex(
            path = *SLUG_RE,
            message = "Enter a valid slug consisting of letters, numbers, underscores or hyphens."
        )
    )]
    pub slug: String,

    #[serde(default)]
    pub description: String,
}

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(group_repo: GroupRepository) -> Self {
        Self {
            group_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a group by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_slug(slug).await
    }

    /// List every group, ordered by title.
    pub async fn list(&self) -> AppResult<Vec<group::Model>> {
        self.group_repo.find_all().await
    }

    /// Create a group. Slugs are unique.
    pub async fn create(&self, input: CreateGroupInput) -> AppResult<group::Model> {
        input.validate()?;

        if self.group_repo.find_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Group with slug {} already exists",
                input.slug
            )));
        }

        let model = group::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            slug: Set(input.slug),
            description: Set(input.description),
        };

        let group = self.group_repo.create(model).await?;
        tracing::info!(group_id = %group.id, slug = %group.slug, "Created group");
        Ok(group)
    }

    /// Delete a group by slug. Its posts stay, without a group.
    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_slug(slug).await?;
        self.group_repo.delete(&group.id).await?;
        tracing::info!(group_id = %group.id, slug = %slug, "Deleted group");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use yatube_db::test_utils;

    fn service(db: MockDatabase) -> GroupService {
        GroupService::new(GroupRepository::new(Arc::new(db.into_connection())))
    }

    fn input(slug: &str) -> CreateGroupInput {
        CreateGroupInput {
            title: "Cats".to_string(),
            slug: slug.to_string(),
            description: "All about cats".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_group() {
        let created = test_utils::group("g1", "cats");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<group::Model>::new()])
                .append_query_results([[created]]),
        );

        let group = service.create(input("cats")).await.unwrap();
        assert_eq!(group.slug, "cats");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_slug() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.create(input("no spaces allowed")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::group("g1", "cats")]]),
        );

        let result = service.create(input("cats")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_group() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<group::Model>::new()]),
        );

        let result = service.delete("ghost").await;
        assert!(matches!(result, Err(AppError::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_group() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::group("g1", "cats")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        service.delete("cats").await.unwrap();
    }
}
