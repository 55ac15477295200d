//! PostgreSQL storage, delegating to the repositories in [`crate::db::handlers`].

use async_trait::async_trait;
use sqlx::PgPool;

use super::Storage;
use crate::conflict::TimeRange;
use crate::db::errors::Result;
use crate::db::handlers::{Reservations, Users};
use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationUpdateDBRequest, ReservationWithOwnerDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{ReservationId, UserId};

#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn find_or_create_user(&self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).find_or_create(request).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn soft_delete_user(&self, id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).soft_delete(id).await
    }

    async fn find_conflict(&self, range: &TimeRange, exclude: Option<ReservationId>) -> Result<Option<ReservationId>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).find_overlapping(range, exclude).await
    }

    async fn create_reservation(&self, request: &ReservationCreateDBRequest) -> Result<ReservationDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).create(request).await
    }

    async fn update_reservation(
        &self,
        owner: UserId,
        id: ReservationId,
        request: &ReservationUpdateDBRequest,
    ) -> Result<Option<ReservationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).update(owner, id, request).await
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).get_by_id(id).await
    }

    async fn latest_reservation(&self, owner: UserId) -> Result<Option<ReservationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).get_latest_by_user(owner).await
    }

    async fn cancel_reservation(&self, owner: UserId, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).cancel(owner, id).await
    }

    async fn delete_reservation(&self, owner: UserId, id: ReservationId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).delete(owner, id).await
    }

    async fn list_user_reservations(&self, owner: UserId) -> Result<Vec<ReservationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).list_by_user(owner).await
    }

    async fn list_reservations_in(&self, window: &TimeRange) -> Result<Vec<ReservationWithOwnerDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Reservations::new(&mut conn).list_in_range(window).await
    }
}
