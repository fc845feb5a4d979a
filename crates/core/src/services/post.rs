//! Post service: feeds, post pages and the post form.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{
    entities::{comment, group, post, truncate_chars, user},
    repositories::{
        CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
        UserRepository,
    },
};

use crate::forms::{FormErrors, Submission};
use crate::pagination::{Page, Paginator};
use crate::services::media::{ImageUpload, MediaService, ValidatedImage, validate_image};

/// Characters of post text shown in the detail page title.
const TITLE_CHARS: usize = 30;

const REQUIRED_MESSAGE: &str = "This field is required.";
const TOO_LARGE_MESSAGE: &str = "The uploaded file is too large.";
const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// A post with its author and group resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: post::Model,
    pub author: user::Model,
    pub group: Option<group::Model>,
    pub image_url: Option<String>,
}

/// A comment with its author resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub author: user::Model,
}

/// Home feed.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub title: String,
    pub page_obj: Page<PostView>,
}

/// Feed of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPage {
    pub title: String,
    pub group: group::Model,
    pub page_obj: Page<PostView>,
}

/// Feed of one author.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub title: String,
    pub author: user::Model,
    /// Whether the viewer follows this author.
    pub following: bool,
    pub page_obj: Page<PostView>,
}

/// Feed of everyone the viewer follows.
#[derive(Debug, Clone, Serialize)]
pub struct FollowPage {
    pub title: String,
    pub page_obj: Page<PostView>,
}

/// Empty comment form shown under a post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentForm {
    pub text: String,
}

/// A single post with its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetailPage {
    pub title: String,
    pub post: PostView,
    /// Number of posts by the same author.
    pub post_count: u64,
    /// Newest first.
    pub comments: Vec<CommentView>,
    pub form: CommentForm,
}

/// Values shown in the post form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostForm {
    pub text: String,
    /// Selected group ID.
    pub group: Option<String>,
    /// URL of the image currently attached, when editing.
    pub image_url: Option<String>,
}

/// The create/edit post page.
#[derive(Debug, Clone, Serialize)]
pub struct PostFormPage {
    pub form: PostForm,
    pub errors: FormErrors,
    /// Group choices.
    pub groups: Vec<group::Model>,
    pub is_edit: bool,
    pub post_id: Option<String>,
}

impl PostFormPage {
    /// The form page around `form`, for a new post or for editing `post_id`.
    #[must_use]
    pub const fn new(
        form: PostForm,
        errors: FormErrors,
        groups: Vec<group::Model>,
        post_id: Option<String>,
    ) -> Self {
        Self {
            form,
            errors,
            groups,
            is_edit: post_id.is_some(),
            post_id,
        }
    }
}

/// A submitted post form.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    /// Group ID; blank means none.
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    /// The upload was cut off at the request body limit.
    pub image_too_large: bool,
}

impl PostInput {
    /// The values to show when the form is re-rendered.
    #[must_use]
    pub fn to_form(&self) -> PostForm {
        PostForm {
            text: self.text.clone(),
            group: self.group.clone().filter(|g| !g.trim().is_empty()),
            image_url: None,
        }
    }
}

/// A post form that passed validation.
struct CleanPost {
    text: String,
    group_id: Option<String>,
    image: Option<ValidatedImage>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    comment_repo: CommentRepository,
    follow_repo: FollowRepository,
    media: MediaService,
    paginator: Paginator,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        comment_repo: CommentRepository,
        follow_repo: FollowRepository,
        media: MediaService,
        paginator: Paginator,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            comment_repo,
            follow_repo,
            media,
            paginator,
            id_gen: IdGenerator::new(),
        }
    }

    /// Every post, newest first.
    pub async fn index(&self, page: Option<&str>) -> AppResult<IndexPage> {
        Ok(IndexPage {
            title: "Latest updates on the site".to_string(),
            page_obj: self.feed(&PostFilter::All, page).await?,
        })
    }

    /// Posts in a group.
    pub async fn group_posts(&self, slug: &str, page: Option<&str>) -> AppResult<GroupPage> {
        let group = self.group_repo.get_by_slug(slug).await?;
        let page_obj = self
            .feed(&PostFilter::Group(group.id.clone()), page)
            .await?;

        Ok(GroupPage {
            title: format!("Posts of community {group}"),
            group,
            page_obj,
        })
    }

    /// Posts by an author, with whether `viewer` follows them.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&user::Model>,
        page: Option<&str>,
    ) -> AppResult<ProfilePage> {
        let author = self.user_repo.get_by_username(username).await?;
        let following = match viewer {
            Some(viewer) => self.follow_repo.is_following(&viewer.id, &author.id).await?,
            None => false,
        };
        let page_obj = self
            .feed(&PostFilter::Author(author.id.clone()), page)
            .await?;

        Ok(ProfilePage {
            title: format!("Profile of user {}", author.username),
            author,
            following,
            page_obj,
        })
    }

    /// Posts by every author `user` follows.
    pub async fn follow_index(
        &self,
        user: &user::Model,
        page: Option<&str>,
    ) -> AppResult<FollowPage> {
        let page_obj = self
            .feed(&PostFilter::FollowedBy(user.id.clone()), page)
            .await?;

        Ok(FollowPage {
            title: format!("Subscriptions of user {}", user.username),
            page_obj,
        })
    }

    /// A post with its comments and the author's post count.
    pub async fn post_detail(&self, post_id: &str) -> AppResult<PostDetailPage> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let post_count = self.post_repo.count_by_author(&post.author_id).await?;

        let comments = self.comment_repo.find_by_post(&post.id).await?;
        let mut user_ids: BTreeSet<String> =
            comments.iter().map(|c| c.author_id.clone()).collect();
        user_ids.insert(post.author_id.clone());
        let users = self.users_by_id(user_ids).await?;

        let groups = match &post.group_id {
            Some(group_id) => self.groups_by_id([group_id.clone()].into()).await?,
            None => HashMap::new(),
        };

        let comments = comments
            .into_iter()
            .filter_map(|comment| {
                let author = users.get(&comment.author_id)?.clone();
                Some(CommentView { comment, author })
            })
            .collect();

        let title = format!("Post {}", truncate_chars(&post.text, TITLE_CHARS));
        let author_id = post.author_id.clone();
        let post = self
            .hydrate(post, &users, &groups)
            .ok_or(AppError::UserNotFound(author_id))?;

        Ok(PostDetailPage {
            title,
            post,
            post_count,
            comments,
            form: CommentForm::default(),
        })
    }

    /// Current values of a post for its edit form, or `None` when `editor`
    /// is not its author.
    pub async fn edit_form(
        &self,
        post_id: &str,
        editor: &user::Model,
    ) -> AppResult<Option<PostForm>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != editor.id {
            return Ok(None);
        }

        Ok(Some(PostForm {
            text: post.text,
            group: post.group_id,
            image_url: post.image.as_deref().map(|key| self.media.public_url(key)),
        }))
    }

    /// Create a post authored by `author`.
    pub async fn create(
        &self,
        author: &user::Model,
        input: PostInput,
    ) -> AppResult<Submission<post::Model>> {
        let clean = match self.clean(input).await? {
            Ok(clean) => clean,
            Err(errors) => return Ok(Submission::Invalid(errors)),
        };

        let image = match &clean.image {
            Some(image) => Some(self.media.store(image).await?),
            None => None,
        };

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            text: Set(clean.text),
            pub_date: Set(Utc::now().into()),
            author_id: Set(author.id.clone()),
            group_id: Set(clean.group_id),
            image: Set(image),
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, author_id = %author.id, "Created post");
        Ok(Submission::Saved(post))
    }

    /// Edit a post. Anyone but the author gets [`Submission::Denied`] and the
    /// post is left untouched. Without a new upload the current image stays.
    pub async fn edit(
        &self,
        post_id: &str,
        editor: &user::Model,
        input: PostInput,
    ) -> AppResult<Submission<post::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != editor.id {
            tracing::debug!(post_id = %post_id, user_id = %editor.id, "Ignored edit by non-author");
            return Ok(Submission::Denied);
        }

        let clean = match self.clean(input).await? {
            Ok(clean) => clean,
            Err(errors) => return Ok(Submission::Invalid(errors)),
        };

        let image = match &clean.image {
            Some(image) => Some(self.media.store(image).await?),
            None => post.image.clone(),
        };

        let mut active: post::ActiveModel = post.into();
        active.text = Set(clean.text);
        active.group_id = Set(clean.group_id);
        active.image = Set(image);

        let post = self.post_repo.update(active).await?;
        tracing::info!(post_id = %post.id, "Edited post");
        Ok(Submission::Saved(post))
    }

    /// Delete a post. Returns `false`, deleting nothing, when `user` is not
    /// the author.
    pub async fn delete(&self, post_id: &str, user: &user::Model) -> AppResult<bool> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != user.id {
            tracing::debug!(post_id = %post_id, user_id = %user.id, "Ignored delete by non-author");
            return Ok(false);
        }

        self.post_repo.delete(&post.id).await?;
        if let Some(key) = &post.image
            && let Err(e) = self.media.remove(key).await
        {
            tracing::warn!(error = %e, key = %key, "Failed to remove post image");
        }

        tracing::info!(post_id = %post.id, "Deleted post");
        Ok(true)
    }

    /// Validate a submitted form. The outer error is a failed lookup, the
    /// inner one a rejected field.
    async fn clean(&self, input: PostInput) -> AppResult<Result<CleanPost, FormErrors>> {
        let mut errors = FormErrors::new();

        let text = input.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED_MESSAGE);
        }

        let group_id = match input.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => {
                if self.group_repo.find_by_id(id).await?.is_none() {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                }
                Some(id.to_string())
            }
        };

        let image = match input.image {
            Some(upload) => match validate_image(upload).await {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => None,
        };
        if input.image_too_large {
            errors.add("image", TOO_LARGE_MESSAGE);
        }

        Ok(errors.into_result().map(|()| CleanPost {
            text,
            group_id,
            image,
        }))
    }

    async fn feed(&self, filter: &PostFilter, page: Option<&str>) -> AppResult<Page<PostView>> {
        let count = self.post_repo.count(filter).await?;
        let window = self.paginator.window(count, page);

        let posts = if count == 0 {
            Vec::new()
        } else {
            self.post_repo
                .find_slice(filter, window.limit, window.offset)
                .await?
        };

        let users = self
            .users_by_id(posts.iter().map(|p| p.author_id.clone()).collect())
            .await?;
        let groups = self
            .groups_by_id(posts.iter().filter_map(|p| p.group_id.clone()).collect())
            .await?;

        let items = posts
            .into_iter()
            .filter_map(|post| self.hydrate(post, &users, &groups))
            .collect();

        Ok(Page::new(items, window))
    }

    fn hydrate(
        &self,
        post: post::Model,
        users: &HashMap<String, user::Model>,
        groups: &HashMap<String, group::Model>,
    ) -> Option<PostView> {
        let Some(author) = users.get(&post.author_id).cloned() else {
            tracing::warn!(post_id = %post.id, author_id = %post.author_id, "Post author missing");
            return None;
        };
        let group = post
            .group_id
            .as_ref()
            .and_then(|id| groups.get(id))
            .cloned();
        let image_url = post.image.as_deref().map(|key| self.media.public_url(key));

        Some(PostView {
            post,
            author,
            group,
            image_url,
        })
    }

    async fn users_by_id(&self, ids: BTreeSet<String>) -> AppResult<HashMap<String, user::Model>> {
        let ids: Vec<String> = ids.into_iter().collect();
        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    async fn groups_by_id(
        &self,
        ids: BTreeSet<String>,
    ) -> AppResult<HashMap<String, group::Model>> {
        let ids: Vec<String> = ids.into_iter().collect();
        Ok(self
            .group_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect())
    }
}
