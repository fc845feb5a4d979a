//! User service.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{entities::user, repositories::UserRepository};

const USERNAME_TAKEN_MESSAGE: &str = "A user with that username already exists.";

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"));

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(
        length(min = 1, max = 150),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

impl SignupInput {
    /// A blank email field means no email.
    fn normalized(mut self) -> Self {
        self.email = self.email.filter(|e| !e.trim().is_empty());
        self
    }
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user. The returned model carries a fresh access token.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        let input = input.normalized();
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(USERNAME_TAKEN_MESSAGE.to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email.unwrap_or_default()),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            created_at: Set(Utc::now().into()),
        };

        // Two signups can both pass the lookup above; the unique index decides.
        let user = self.user_repo.create(model).await.map_err(|e| match e {
            AppError::Conflict(detail) => {
                tracing::debug!(detail = %detail, "Username taken during signup");
                AppError::Conflict(USERNAME_TAKEN_MESSAGE.to_string())
            }
            other => other,
        })?;
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Check a username and password. Issues a token if the user has none.
    pub async fn signin(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(username = %username, "Rejected sign-in");
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(self.id_gen.generate_token()));
        self.user_repo.update(active).await
    }

    /// Resolve an access token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, RuntimeErr};
    use std::sync::Arc;
    use yatube_db::test_utils;

    fn signup_input(username: &str, password: &str) -> SignupInput {
        SignupInput {
            username: username.to_string(),
            password: password.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: Some(String::new()),
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_username_pattern() {
        assert!(USERNAME_RE.is_match("user.name+tag@host_x-1"));
        assert!(USERNAME_RE.is_match("Пользователь"));
        assert!(!USERNAME_RE.is_match("with space"));
        assert!(!USERNAME_RE.is_match("slash/"));
    }

    #[tokio::test]
    async fn test_signup_creates_user_with_token() {
        let mut created = test_utils::user("u1", "Leo");
        created.password_hash = hash_password("longenough").unwrap();

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created.clone()]]),
        );

        let user = service
            .signup(signup_input("Leo", "longenough"))
            .await
            .unwrap();
        assert_eq!(user.username, "Leo");
        assert!(user.token.is_some());
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let existing = test_utils::user("u1", "leo");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service.signup(signup_input("LEO", "longenough")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_signup_race_on_username_is_conflict() {
        // The lookup finds nobody, then the insert loses to a concurrent signup.
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                    "duplicate key value violates unique constraint \"idx_user_username_lower\""
                        .to_string(),
                ))]),
        );

        let result = service.signup(signup_input("Leo", "longenough")).await;
        assert!(matches!(
            result,
            Err(AppError::Conflict(msg)) if msg == USERNAME_TAKEN_MESSAGE
        ));
    }

    #[tokio::test]
    async fn test_signup_validates_before_querying() {
        // No results appended: reaching the database would fail differently.
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let short = service.signup(signup_input("leo", "short")).await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let bad_name = service.signup(signup_input("le o", "longenough")).await;
        assert!(matches!(bad_name, Err(AppError::Validation(_))));

        let mut bad_email = signup_input("leo", "longenough");
        bad_email.email = Some("not-an-email".to_string());
        assert!(matches!(
            service.signup(bad_email).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_signin() {
        let mut user = test_utils::user("u1", "leo");
        user.password_hash = hash_password("longenough").unwrap();

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .append_query_results([[user.clone()]]),
        );

        let signed_in = service.signin("leo", "longenough").await.unwrap();
        assert_eq!(signed_in.token.as_deref(), Some("token-leo"));

        let rejected = service.signin("leo", "wrong-password").await;
        assert!(matches!(rejected, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_signin_issues_missing_token() {
        let mut user = test_utils::user("u1", "leo");
        user.password_hash = hash_password("longenough").unwrap();
        user.token = None;
        let mut updated = user.clone();
        updated.token = Some("fresh".to_string());

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[updated]]),
        );

        let signed_in = service.signin("leo", "longenough").await.unwrap();
        assert_eq!(signed_in.token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service.authenticate_by_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
