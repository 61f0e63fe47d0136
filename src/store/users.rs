//! User table operations. Updates use the same optimistic-concurrency
//! discipline as the manga store.

use std::collections::HashMap;

use chrono::Utc;

use super::Db;
use crate::error::{AppError, AppResult};
use crate::models::{TokenScope, User, hash_token};

#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    pub(super) fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a new user. A duplicate email surfaces as a validation
    /// failure rather than a server error.
    pub async fn insert(&self, user: &User) -> AppResult<User> {
        let result = self
            .db
            .bounded(
                sqlx::query_as::<_, User>(
                    "INSERT INTO users (created_at, name, email, password_hash, activated)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id, created_at, name, email, password_hash, activated, version",
                )
                .bind(Utc::now())
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .fetch_one(self.db.pool()),
            )
            .await;

        match result {
            Ok(inserted) => Ok(inserted),
            Err(err) if is_duplicate_email(&err) => {
                let mut errors = HashMap::new();
                errors.insert(
                    "email".to_string(),
                    "a user with this email address already exists".to_string(),
                );
                Err(AppError::ValidationFailed(errors))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<User> {
        self.db
            .bounded(
                sqlx::query_as::<_, User>(
                    "SELECT id, created_at, name, email, password_hash, activated, version
                     FROM users WHERE email = ?1",
                )
                .bind(email)
                .fetch_optional(self.db.pool()),
            )
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Resolve a token plaintext to its owner, requiring the given scope and
    /// an unexpired token. Unknown hashes and expired tokens are
    /// indistinguishable to the caller.
    pub async fn get_for_token(&self, scope: TokenScope, plaintext: &str) -> AppResult<User> {
        let hash = hash_token(plaintext);

        self.db
            .bounded(
                sqlx::query_as::<_, User>(
                    "SELECT u.id, u.created_at, u.name, u.email, u.password_hash,
                            u.activated, u.version
                     FROM users u
                     INNER JOIN tokens t ON t.user_id = u.id
                     WHERE t.hash = ?1 AND t.scope = ?2 AND t.expiry > ?3",
                )
                .bind(hash)
                .bind(scope.as_str())
                .bind(Utc::now())
                .fetch_optional(self.db.pool()),
            )
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Conditional update guarded by the observed version; zero matched
    /// rows means a concurrent writer got there first.
    pub async fn update(&self, user: &User) -> AppResult<i32> {
        let version: Option<i32> = self
            .db
            .bounded(
                sqlx::query_scalar(
                    "UPDATE users
                     SET name = ?1, email = ?2, password_hash = ?3, activated = ?4,
                         version = version + 1
                     WHERE id = ?5 AND version = ?6
                     RETURNING version",
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .bind(user.id)
                .bind(user.version)
                .fetch_optional(self.db.pool()),
            )
            .await?;

        version.ok_or(AppError::EditConflict)
    }
}

fn is_duplicate_email(err: &AppError) -> bool {
    matches!(err, AppError::Persistence(msg) if msg.contains("users.email"))
}
