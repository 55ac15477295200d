//! Database models for reservations.

use crate::api::models::reservations::ReservationStatus;
use crate::conflict::{Booking, TimeRange};
use crate::types::{ReservationId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a reservation owned by `user_id`
#[derive(Debug, Clone)]
pub struct ReservationCreateDBRequest {
    pub user_id: UserId,
    pub title: String,
    pub range: TimeRange,
}

/// Database request for editing a reservation's title and time range
#[derive(Debug, Clone)]
pub struct ReservationUpdateDBRequest {
    pub title: String,
    pub range: TimeRange,
}

/// Database response for a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDBResponse {
    pub id: ReservationId,
    pub user_id: UserId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking for ReservationDBResponse {
    type Id = ReservationId;

    fn id(&self) -> ReservationId {
        self.id
    }

    fn start(&self) -> DateTime<Utc> {
        self.start_time
    }

    fn end(&self) -> DateTime<Utc> {
        self.end_time
    }

    fn is_blocking(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }
}

/// A reservation joined with its owner's display name, for calendar listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationWithOwnerDBResponse {
    pub reservation: ReservationDBResponse,
    pub user_name: String,
}
