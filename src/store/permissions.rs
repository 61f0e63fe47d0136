//! Permission codes and their assignment to users.

use std::collections::HashSet;

use super::Db;
use crate::error::AppResult;

#[derive(Clone)]
pub struct PermissionStore {
    db: Db,
}

impl PermissionStore {
    pub(super) fn new(db: Db) -> Self {
        Self { db }
    }

    /// The set of permission codes held by a user.
    pub async fn get_all_for_user(&self, user_id: i64) -> AppResult<HashSet<String>> {
        let codes: Vec<String> = self
            .db
            .bounded(
                sqlx::query_scalar(
                    "SELECT p.code
                     FROM permissions p
                     INNER JOIN users_permissions up ON up.permission_id = p.id
                     WHERE up.user_id = ?1",
                )
                .bind(user_id)
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(codes.into_iter().collect())
    }

    /// Grant permission codes to a user. Unknown codes are ignored; a code
    /// already held is a no-op.
    pub async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> AppResult<()> {
        for code in codes {
            self.db
                .bounded(
                    sqlx::query(
                        "INSERT OR IGNORE INTO users_permissions (user_id, permission_id)
                         SELECT ?1, id FROM permissions WHERE code = ?2",
                    )
                    .bind(user_id)
                    .bind(code)
                    .execute(self.db.pool()),
                )
                .await?;
        }
        Ok(())
    }
}
