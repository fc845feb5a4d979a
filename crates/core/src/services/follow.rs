//! Follow service.

use chrono::Utc;
use sea_orm::Set;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};

/// What a follow request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new follow row was created.
    Followed,
    /// The pair was already followed, possibly by a concurrent request.
    AlreadyFollowing,
    /// Users cannot follow themselves; nothing was stored.
    SelfFollow,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow the author named `username`.
    ///
    /// Following yourself or an author you already follow is a no-op. A
    /// duplicate rejected by the database (two requests racing) counts as
    /// already following.
    pub async fn follow(&self, user: &user::Model, username: &str) -> AppResult<FollowOutcome> {
        let author = self.user_repo.get_by_username(username).await?;

        if author.id == user.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follow_repo.is_following(&user.id, &author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        match self.follow_repo.create(model).await {
            Ok(_) => {
                tracing::info!(user_id = %user.id, author_id = %author.id, "Followed author");
                Ok(FollowOutcome::Followed)
            }
            Err(AppError::Conflict(msg)) => {
                tracing::debug!(user_id = %user.id, author_id = %author.id, reason = %msg, "Follow already present");
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(e) => Err(e),
        }
    }

    /// Stop following the author named `username`. Returns whether a follow
    /// existed.
    pub async fn unfollow(&self, user: &user::Model, username: &str) -> AppResult<bool> {
        let author = self.user_repo.get_by_username(username).await?;
        let removed = self.follow_repo.delete_by_pair(&user.id, &author.id).await?;

        if removed {
            tracing::info!(user_id = %user.id, author_id = %author.id, "Unfollowed author");
        }
        Ok(removed)
    }
}
