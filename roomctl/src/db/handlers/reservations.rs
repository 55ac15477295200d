//! Database repository for reservations.
//!
//! Writes that can create an overlap (`create`, `update`) run in their own transaction: they take
//! a transaction-scoped advisory lock, look for an overlapping confirmed reservation, and only then
//! write. Concurrent writers therefore serialise on the lock, and the `reservations_no_overlap`
//! exclusion constraint rejects anything that slips past (surfacing as [`DbError::Overlap`]).

use crate::{
    api::models::reservations::ReservationStatus,
    conflict::TimeRange,
    db::{
        errors::{DbError, Result},
        models::reservations::{
            ReservationCreateDBRequest, ReservationDBResponse, ReservationUpdateDBRequest, ReservationWithOwnerDBResponse,
        },
    },
    types::{ReservationId, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;

/// Advisory lock key guarding the check-then-write sequence ("room" in ASCII).
const SCHEDULE_LOCK_KEY: i64 = 0x726f_6f6d;

const RESERVATION_COLUMNS: &str = "r.id, r.user_id, r.title, r.start_time, r.end_time, r.status, r.created_at, r.updated_at";

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct CalendarRow {
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub user_name: String,
}

impl From<Reservation> for ReservationDBResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<CalendarRow> for ReservationWithOwnerDBResponse {
    fn from(row: CalendarRow) -> Self {
        Self {
            reservation: row.reservation.into(),
            user_name: row.user_name,
        }
    }
}

pub struct Reservations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reservations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Id of a confirmed reservation overlapping `range`, if any, ignoring `exclude`.
    #[instrument(skip(self), err)]
    pub async fn find_overlapping(&mut self, range: &TimeRange, exclude: Option<ReservationId>) -> Result<Option<ReservationId>> {
        find_overlapping(&mut *self.db, range, exclude).await
    }

    /// Insert a confirmed reservation unless it overlaps an existing one.
    #[instrument(skip(self, request), fields(user_id = request.user_id), err)]
    pub async fn create(&mut self, request: &ReservationCreateDBRequest) -> Result<ReservationDBResponse> {
        let mut tx = self.db.begin().await?;
        lock_schedule(&mut tx).await?;

        if let Some(conflicting_id) = find_overlapping(&mut tx, &request.range, None).await? {
            return Err(DbError::Overlap {
                conflicting_id: Some(conflicting_id),
            });
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations AS r (user_id, title, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING r.id, r.user_id, r.title, r.start_time, r.end_time, r.status, r.created_at, r.updated_at
            "#,
        )
        .bind(request.user_id)
        .bind(&request.title)
        .bind(request.range.start())
        .bind(request.range.end())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation.into())
    }

    /// Change title and time of a confirmed reservation owned by `owner`.
    ///
    /// Returns `None` if no such reservation exists for this owner (including canceled ones).
    #[instrument(skip(self, request), err)]
    pub async fn update(
        &mut self,
        owner: UserId,
        id: ReservationId,
        request: &ReservationUpdateDBRequest,
    ) -> Result<Option<ReservationDBResponse>> {
        let mut tx = self.db.begin().await?;
        lock_schedule(&mut tx).await?;

        if let Some(conflicting_id) = find_overlapping(&mut tx, &request.range, Some(id)).await? {
            // Only report the overlap to the owner; anyone else gets the same answer as for a
            // missing reservation.
            let owned = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM reservations WHERE id = $1 AND user_id = $2 AND status = 'confirmed')",
            )
            .bind(id)
            .bind(owner)
            .fetch_one(&mut *tx)
            .await?;

            if !owned {
                return Ok(None);
            }
            return Err(DbError::Overlap {
                conflicting_id: Some(conflicting_id),
            });
        }

        let query = format!(
            r#"
            UPDATE reservations AS r
            SET title = $3, start_time = $4, end_time = $5, updated_at = NOW()
            WHERE r.id = $1 AND r.user_id = $2 AND r.status = 'confirmed'
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(owner)
            .bind(&request.title)
            .bind(request.range.start())
            .bind(request.range.end())
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reservation.map(Into::into))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let query = format!("SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = $1");
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(reservation.map(Into::into))
    }

    /// The reservation `owner` created most recently, whatever its status.
    #[instrument(skip(self), err)]
    pub async fn get_latest_by_user(&mut self, owner: UserId) -> Result<Option<ReservationDBResponse>> {
        let query = format!("SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC LIMIT 1");
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(reservation.map(Into::into))
    }

    /// Mark a reservation owned by `owner` as canceled. Canceling twice is a no-op that still
    /// returns the row.
    #[instrument(skip(self), err)]
    pub async fn cancel(&mut self, owner: UserId, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let query = format!(
            r#"
            UPDATE reservations AS r
            SET status = 'canceled',
                updated_at = CASE WHEN r.status = 'canceled' THEN r.updated_at ELSE NOW() END
            WHERE r.id = $1 AND r.user_id = $2
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(reservation.map(Into::into))
    }

    /// Permanently remove a reservation owned by `owner`. Returns false if there was none.
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, owner: UserId, id: ReservationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Confirmed reservations owned by `owner`, earliest first.
    #[instrument(skip(self), err)]
    pub async fn list_by_user(&mut self, owner: UserId) -> Result<Vec<ReservationDBResponse>> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.user_id = $1 AND r.status = 'confirmed' ORDER BY r.start_time, r.id"
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(reservations.into_iter().map(Into::into).collect())
    }

    /// Confirmed reservations listed in `window` (see [`crate::calendar::lists`]), with owner names,
    /// earliest first.
    /// Reservations of soft-deleted users are left out.
    #[instrument(skip(self), err)]
    pub async fn list_in_range(&mut self, window: &TimeRange) -> Result<Vec<ReservationWithOwnerDBResponse>> {
        let query = format!(
            r#"
            SELECT {RESERVATION_COLUMNS}, u.name AS user_name
            FROM reservations r
            JOIN users u ON u.id = r.user_id AND u.deleted_at IS NULL
            WHERE r.status = 'confirmed' AND r.start_time < $2 AND r.end_time >= $1
            ORDER BY r.start_time, r.id
            "#
        );
        let rows = sqlx::query_as::<_, CalendarRow>(&query)
            .bind(window.start())
            .bind(window.end())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

async fn lock_schedule(conn: &mut PgConnection) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEDULE_LOCK_KEY)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn find_overlapping(conn: &mut PgConnection, range: &TimeRange, exclude: Option<ReservationId>) -> Result<Option<ReservationId>> {
    let id = sqlx::query_scalar::<_, ReservationId>(
        r#"
        SELECT id FROM reservations
        WHERE status = 'confirmed'
          AND start_time < $2
          AND end_time > $1
          AND ($3::BIGINT IS NULL OR id <> $3)
        ORDER BY start_time
        LIMIT 1
        "#,
    )
    .bind(range.start())
    .bind(range.end())
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}
