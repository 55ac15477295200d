//! Database repository for users.

use crate::types::UserId;
use crate::{
    api::models::users::Role,
    db::{
        errors::Result,
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

const USER_COLUMNS: &str = "id, google_id, email, name, avatar_url, role, created_at, updated_at";

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            google_id: user.google_id,
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Return the user with this identity-provider subject, creating it on first sight.
    ///
    /// A single upsert, so concurrent first logins resolve to the same row. Profile fields of an
    /// existing user are left untouched. Returns `None` when the subject belongs to a soft-deleted
    /// account: the conflicting row is not updated, so nothing is returned.
    #[instrument(skip(self, request), fields(email = %request.email), err)]
    pub async fn find_or_create(&mut self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>> {
        let query = format!(
            r#"
            INSERT INTO users (google_id, email, name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (google_id) DO UPDATE SET google_id = EXCLUDED.google_id
            WHERE users.deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&request.google_id)
            .bind(&request.email)
            .bind(&request.name)
            .bind(&request.avatar_url)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&query).bind(id).fetch_optional(&mut *self.db).await?;

        Ok(user.map(UserDBResponse::from))
    }

    /// Mark a user deleted. Returns false if there was no active user with this id.
    #[instrument(skip(self), err)]
    pub async fn soft_delete(&mut self, id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
