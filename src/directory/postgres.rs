//! PostgreSQL account directory over the platform's `users` table.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{AccountDirectory, AccountId, DirectoryError, RoleFilter};

/// Directory backed by the platform's `users` table.
///
/// Expects the columns `id` and `role` where `role` is `'admin'` or `'user'`.
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_value(role: RoleFilter) -> &'static str {
    match role {
        RoleFilter::Admin => "admin",
        RoleFilter::User => "user",
    }
}

#[async_trait]
impl AccountDirectory for PostgresDirectory {
    async fn list_accounts(
        &self,
        role: Option<RoleFilter>,
    ) -> Result<Vec<AccountId>, DirectoryError> {
        let rows: Vec<(String,)> = match role {
            Some(role) => {
                sqlx::query_as("SELECT id::text FROM users WHERE role = $1 ORDER BY id")
                    .bind(role_value(role))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT id::text FROM users ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_values_match_platform_schema() {
        assert_eq!(role_value(RoleFilter::Admin), "admin");
        assert_eq!(role_value(RoleFilter::User), "user");
    }
}
