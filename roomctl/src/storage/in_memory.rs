//! In-memory storage implementation.
//!
//! Everything lives behind a single `RwLock`, so the overlap check and the write that follows it
//! happen under one write guard. Data is lost on restart; this backs the HTTP tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::Storage;
use crate::api::models::{reservations::ReservationStatus, users::Role};
use crate::calendar;
use crate::conflict::{Booking, TimeRange, find_conflict};
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationUpdateDBRequest, ReservationWithOwnerDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{ReservationId, UserId};

#[derive(Clone)]
struct StoredUser {
    user: UserDBResponse,
    deleted_at: Option<DateTime<Utc>>,
}

impl StoredUser {
    fn active(&self) -> Option<&UserDBResponse> {
        self.deleted_at.is_none().then_some(&self.user)
    }
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, StoredUser>,
    reservations: BTreeMap<ReservationId, ReservationDBResponse>,
    last_user_id: UserId,
    last_reservation_id: ReservationId,
}

impl State {
    fn conflict(&self, range: &TimeRange, exclude: Option<ReservationId>) -> Option<ReservationId> {
        find_conflict(range, self.reservations.values(), exclude).map(|r| r.id())
    }

    fn owned_mut(&mut self, owner: UserId, id: ReservationId) -> Option<&mut ReservationDBResponse> {
        self.reservations.get_mut(&id).filter(|r| r.user_id == owner)
    }
}

/// In-memory implementation of the [`Storage`] trait.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<State>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn find_or_create_user(&self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>> {
        let mut state = self.state.write();

        if let Some(existing) = state.users.values().find(|u| u.user.google_id == request.google_id) {
            return Ok(existing.active().cloned());
        }

        state.last_user_id += 1;
        let now = Utc::now();
        let user = UserDBResponse {
            id: state.last_user_id,
            google_id: request.google_id.clone(),
            email: request.email.clone(),
            name: request.name.clone(),
            avatar_url: request.avatar_url.clone(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                deleted_at: None,
            },
        );
        Ok(Some(user))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let state = self.state.read();
        Ok(state.users.get(&id).and_then(StoredUser::active).cloned())
    }

    async fn soft_delete_user(&self, id: UserId) -> Result<bool> {
        let mut state = self.state.write();
        match state.users.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() => {
                let now = Utc::now();
                stored.deleted_at = Some(now);
                stored.user.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_conflict(&self, range: &TimeRange, exclude: Option<ReservationId>) -> Result<Option<ReservationId>> {
        Ok(self.state.read().conflict(range, exclude))
    }

    async fn create_reservation(&self, request: &ReservationCreateDBRequest) -> Result<ReservationDBResponse> {
        let mut state = self.state.write();

        if !state.users.contains_key(&request.user_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("reservations_user_id_fkey".to_string()),
                table: Some("reservations".to_string()),
                message: format!("user {} does not exist", request.user_id),
            });
        }
        if let Some(conflicting_id) = state.conflict(&request.range, None) {
            return Err(DbError::Overlap {
                conflicting_id: Some(conflicting_id),
            });
        }

        state.last_reservation_id += 1;
        let now = Utc::now();
        let reservation = ReservationDBResponse {
            id: state.last_reservation_id,
            user_id: request.user_id,
            title: request.title.clone(),
            start_time: request.range.start(),
            end_time: request.range.end(),
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        owner: UserId,
        id: ReservationId,
        request: &ReservationUpdateDBRequest,
    ) -> Result<Option<ReservationDBResponse>> {
        let mut state = self.state.write();

        let editable = state
            .reservations
            .get(&id)
            .is_some_and(|r| r.user_id == owner && r.status == ReservationStatus::Confirmed);
        if !editable {
            return Ok(None);
        }
        if let Some(conflicting_id) = state.conflict(&request.range, Some(id)) {
            return Err(DbError::Overlap {
                conflicting_id: Some(conflicting_id),
            });
        }

        Ok(state.owned_mut(owner, id).map(|reservation| {
            reservation.title = request.title.clone();
            reservation.start_time = request.range.start();
            reservation.end_time = request.range.end();
            reservation.updated_at = Utc::now();
            reservation.clone()
        }))
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        Ok(self.state.read().reservations.get(&id).cloned())
    }

    async fn latest_reservation(&self, owner: UserId) -> Result<Option<ReservationDBResponse>> {
        let state = self.state.read();
        Ok(state
            .reservations
            .values()
            .filter(|r| r.user_id == owner)
            .max_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn cancel_reservation(&self, owner: UserId, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let mut state = self.state.write();
        Ok(state.owned_mut(owner, id).map(|reservation| {
            if reservation.status != ReservationStatus::Canceled {
                reservation.status = ReservationStatus::Canceled;
                reservation.updated_at = Utc::now();
            }
            reservation.clone()
        }))
    }

    async fn delete_reservation(&self, owner: UserId, id: ReservationId) -> Result<bool> {
        let mut state = self.state.write();
        if state.owned_mut(owner, id).is_none() {
            return Ok(false);
        }
        Ok(state.reservations.remove(&id).is_some())
    }

    async fn list_user_reservations(&self, owner: UserId) -> Result<Vec<ReservationDBResponse>> {
        let state = self.state.read();
        let mut reservations: Vec<_> = state
            .reservations
            .values()
            .filter(|r| r.user_id == owner && r.is_blocking())
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.start_time, r.id));
        Ok(reservations)
    }

    async fn list_reservations_in(&self, window: &TimeRange) -> Result<Vec<ReservationWithOwnerDBResponse>> {
        let state = self.state.read();
        let mut rows: Vec<_> = state
            .reservations
            .values()
            .filter(|r| r.is_blocking() && calendar::lists(window, r.start_time, r.end_time))
            .filter_map(|r| {
                let owner = state.users.get(&r.user_id)?.active()?;
                Some(ReservationWithOwnerDBResponse {
                    reservation: r.clone(),
                    user_name: owner.name.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|row| (row.reservation.start_time, row.reservation.id));
        Ok(rows)
    }
}
