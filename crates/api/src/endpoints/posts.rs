//! Post endpoints: feeds, the detail page and the post form.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use yatube_common::AppResult;
use yatube_core::{FormErrors, PostForm, PostFormPage, Submission};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PostFormData},
    middleware::AppState,
    response::{Rendered, post_detail_url, profile_url, redirect},
};

const INDEX_TEMPLATE: &str = "posts/index.html";
const GROUP_TEMPLATE: &str = "posts/group_list.html";
const PROFILE_TEMPLATE: &str = "posts/profile.html";
const DETAIL_TEMPLATE: &str = "posts/post_detail.html";
const FORM_TEMPLATE: &str = "posts/create_post.html";
const FOLLOW_TEMPLATE: &str = "posts/follow.html";

/// `?page=` query. Kept as text: anything unparsable means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Home feed. Cached as a whole page, see [`crate::page_cache`].
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<yatube_core::IndexPage>> {
    let page = state.post_service.index(query.page.as_deref()).await?;
    Ok(Rendered::new(INDEX_TEMPLATE, page))
}

async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<yatube_core::GroupPage>> {
    let page = state
        .post_service
        .group_posts(&slug, query.page.as_deref())
        .await?;
    Ok(Rendered::new(GROUP_TEMPLATE, page))
}

async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<yatube_core::ProfilePage>> {
    let page = state
        .post_service
        .profile(&username, viewer.as_ref(), query.page.as_deref())
        .await?;
    Ok(Rendered::new(PROFILE_TEMPLATE, page))
}

async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Rendered<yatube_core::PostDetailPage>> {
    let page = state.post_service.post_detail(&post_id).await?;
    Ok(Rendered::new(DETAIL_TEMPLATE, page))
}

/// Feed of followed authors.
async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<yatube_core::FollowPage>> {
    let page = state
        .post_service
        .follow_index(&user, query.page.as_deref())
        .await?;
    Ok(Rendered::new(FOLLOW_TEMPLATE, page))
}

/// The post form page, with every group as a choice.
async fn form_page(
    state: &AppState,
    form: PostForm,
    errors: FormErrors,
    post_id: Option<String>,
) -> AppResult<Rendered<PostFormPage>> {
    let groups = state.group_service.list().await?;
    Ok(Rendered::new(
        FORM_TEMPLATE,
        PostFormPage::new(form, errors, groups, post_id),
    ))
}

async fn create_form(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Rendered<PostFormPage>> {
    form_page(&state, PostForm::default(), FormErrors::new(), None).await
}

/// Create a post, then go to the author's profile. Invalid input re-renders
/// the form with its errors.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    PostFormData(input): PostFormData,
) -> AppResult<Response> {
    let form = input.to_form();

    match state.post_service.create(&user, input).await? {
        Submission::Invalid(errors) => Ok(form_page(&state, form, errors, None)
            .await?
            .into_response()),
        Submission::Saved(_) | Submission::Denied => Ok(redirect(&profile_url(&user.username))),
    }
}

/// The edit form. Anyone but the author is sent back to the post.
async fn edit_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    match state.post_service.edit_form(&post_id, &user).await? {
        Some(form) => Ok(form_page(&state, form, FormErrors::new(), Some(post_id))
            .await?
            .into_response()),
        None => Ok(redirect(&post_detail_url(&post_id))),
    }
}

async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    PostFormData(input): PostFormData,
) -> AppResult<Response> {
    let form = input.to_form();

    match state.post_service.edit(&post_id, &user, input).await? {
        Submission::Invalid(errors) => Ok(form_page(&state, form, errors, Some(post_id))
            .await?
            .into_response()),
        Submission::Saved(_) | Submission::Denied => Ok(redirect(&post_detail_url(&post_id))),
    }
}

/// Delete a post. The author lands on their profile, anyone else back on
/// the untouched post.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    if state.post_service.delete(&post_id, &user).await? {
        Ok(redirect(&profile_url(&user.username)))
    } else {
        Ok(redirect(&post_detail_url(&post_id)))
    }
}

/// Routes except the home feed, which is mounted with its cache layer.
/// The post forms accept bodies up to `upload_limit` bytes.
pub fn router(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{post_id}/", get(post_detail))
        .route(
            "/create/",
            get(create_form)
                .post(create)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(edit_form)
                .post(edit)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/posts/{post_id}/delete/", get(delete).post(delete))
        .route("/follow/", get(follow_index))
}
