//! The persistence seam between HTTP handlers and the database.
//!
//! Handlers hold an `Arc<dyn Storage>`. [`postgres::PostgresStorage`] backs the running service;
//! [`in_memory::InMemoryStorage`] implements the same contract without a database and is what the
//! HTTP tests run against. Both are exercised by the shared suite in `tests.rs`.

use async_trait::async_trait;

use crate::conflict::TimeRange;
use crate::db::errors::Result;
use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationUpdateDBRequest, ReservationWithOwnerDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{ReservationId, UserId};

pub mod in_memory;
pub mod postgres;


/// Storage operations for users and reservations.
///
/// Every reservation mutation is scoped by `(owner, id)`. A reservation that does not exist and
/// one owned by somebody else look the same to the caller: `None` or `false`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Idempotent find-or-create keyed by the identity-provider subject.
    ///
    /// Returns `None` if the subject belongs to a soft-deleted account.
    async fn find_or_create_user(&self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>>;

    /// Active (not soft-deleted) user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// Soft-delete a user. Returns false if there was no active user with this id.
    async fn soft_delete_user(&self, id: UserId) -> Result<bool>;

    /// Id of a confirmed reservation overlapping `range`, ignoring `exclude`.
    async fn find_conflict(&self, range: &TimeRange, exclude: Option<ReservationId>) -> Result<Option<ReservationId>>;

    /// Atomically check for overlaps and insert a confirmed reservation.
    ///
    /// # Errors
    /// - `DbError::Overlap` if a confirmed reservation overlaps the requested range
    async fn create_reservation(&self, request: &ReservationCreateDBRequest) -> Result<ReservationDBResponse>;

    /// Atomically check for overlaps (ignoring the reservation itself) and update title and range
    /// of a confirmed reservation owned by `owner`.
    ///
    /// # Errors
    /// - `DbError::Overlap` if the new range overlaps another confirmed reservation
    async fn update_reservation(
        &self,
        owner: UserId,
        id: ReservationId,
        request: &ReservationUpdateDBRequest,
    ) -> Result<Option<ReservationDBResponse>>;

    /// Any reservation by id, whatever its owner or status.
    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDBResponse>>;

    /// The reservation most recently created by `owner`.
    async fn latest_reservation(&self, owner: UserId) -> Result<Option<ReservationDBResponse>>;

    /// Set status to canceled. Idempotent for the owner.
    async fn cancel_reservation(&self, owner: UserId, id: ReservationId) -> Result<Option<ReservationDBResponse>>;

    /// Hard delete. Returns false if the owner has no such reservation.
    async fn delete_reservation(&self, owner: UserId, id: ReservationId) -> Result<bool>;

    /// Confirmed reservations of `owner`, earliest first.
    async fn list_user_reservations(&self, owner: UserId) -> Result<Vec<ReservationDBResponse>>;

    /// Confirmed reservations overlapping `window`, earliest first, with owner names. Reservations
    /// of soft-deleted users are excluded.
    async fn list_reservations_in(&self, window: &TimeRange) -> Result<Vec<ReservationWithOwnerDBResponse>>;
}
