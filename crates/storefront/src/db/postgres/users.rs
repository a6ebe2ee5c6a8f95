//! Local account queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dvd_shop_core::UserId;

use super::{PgStore, conflict_or_database};
use crate::db::{AccountRepository, RepositoryError};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, created_at
            ",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_or_database(e, "username"))?;

        Ok(row.into())
    }

    async fn password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT id, username, created_at, password_hash
            FROM shop.users
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }
}
