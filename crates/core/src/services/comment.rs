//! Comment service.

use chrono::Utc;
use sea_orm::Set;
use yatube_common::{AppResult, IdGenerator};
use yatube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository},
};

use crate::forms::{FormErrors, Submission};

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(comment_repo: CommentRepository, post_repo: PostRepository) -> Self {
        Self {
            comment_repo,
            post_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a post. Fails only when the post does not exist; blank
    /// text comes back as [`Submission::Invalid`] without touching the
    /// database.
    pub async fn add_comment(
        &self,
        post_id: &str,
        author: &user::Model,
        text: &str,
    ) -> AppResult<Submission<comment::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let text = text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::new();
            errors.add("text", "This field is required.");
            tracing::debug!(post_id = %post.id, user_id = %author.id, "Dropped blank comment");
            return Ok(Submission::Invalid(errors));
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author.id.clone()),
            text: Set(text.to_string()),
            created: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "Added comment");
        Ok(Submission::Saved(comment))
    }
}
