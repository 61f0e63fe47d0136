//! Token table operations. Only token hashes are stored.

use super::Db;
use crate::error::AppResult;
use crate::models::{Token, TokenScope};

#[derive(Clone)]
pub struct TokenStore {
    db: Db,
}

impl TokenStore {
    pub(super) fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn insert(&self, token: &Token) -> AppResult<()> {
        self.db
            .bounded(
                sqlx::query(
                    "INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&token.hash)
                .bind(token.user_id)
                .bind(token.expiry)
                .bind(token.scope.as_str())
                .execute(self.db.pool()),
            )
            .await?;
        Ok(())
    }

    /// Invalidate every token a user holds for one scope, e.g. after the
    /// activation token has been consumed.
    pub async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> AppResult<()> {
        self.db
            .bounded(
                sqlx::query("DELETE FROM tokens WHERE scope = ?1 AND user_id = ?2")
                    .bind(scope.as_str())
                    .bind(user_id)
                    .execute(self.db.pool()),
            )
            .await?;
        Ok(())
    }
}
