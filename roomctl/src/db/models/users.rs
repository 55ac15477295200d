//! Database models for users.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for finding or creating a user from an identity-provider profile
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDBResponse {
    pub id: UserId,
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
