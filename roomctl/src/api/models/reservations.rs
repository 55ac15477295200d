//! API request/response models for reservations.

use crate::calendar::Window;
use crate::conflict::TimeRange;
use crate::db::models::reservations::{ReservationDBResponse, ReservationWithOwnerDBResponse};
use crate::errors::Error;
use crate::types::{ReservationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Longest accepted title, in characters
pub const MAX_TITLE_LENGTH: usize = 200;

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Canceled,
}

/// Body of create and edit requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationRequest {
    pub title: String,
    /// RFC 3339 timestamp, inclusive
    pub start_time: DateTime<Utc>,
    /// RFC 3339 timestamp, exclusive
    pub end_time: DateTime<Utc>,
}

impl ReservationRequest {
    /// Trimmed title and validated range, or a 400 describing what is wrong.
    pub fn validate(&self) -> Result<(String, TimeRange), Error> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::BadRequest {
                message: "title must not be empty".to_string(),
            });
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::BadRequest {
                message: format!("title must be at most {MAX_TITLE_LENGTH} characters"),
            });
        }
        let range = TimeRange::new(self.start_time, self.end_time).map_err(|e| Error::BadRequest { message: e.to_string() })?;
        Ok((title.to_string(), range))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub user_id: UserId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservationDBResponse> for ReservationResponse {
    fn from(db: ReservationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            title: db.title,
            start_time: db.start_time,
            end_time: db.end_time,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A calendar entry: the reservation plus its owner's display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CalendarReservationResponse {
    #[serde(flatten)]
    pub reservation: ReservationResponse,
    pub user_name: String,
}

impl From<ReservationWithOwnerDBResponse> for CalendarReservationResponse {
    fn from(db: ReservationWithOwnerDBResponse) -> Self {
        Self {
            reservation: db.reservation.into(),
            user_name: db.user_name,
        }
    }
}

/// `{"status": "success", "data": ...}` envelope used by every reservation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// `{"status": "success"}` for operations with nothing to return
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// `?id=` selector used by edit, cancel and delete.
///
/// Kept as a string so a missing or non-numeric id gets the same JSON 400 as any other bad input.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReservationIdQuery {
    /// Reservation ID
    pub id: Option<String>,
}

impl ReservationIdQuery {
    pub fn id(&self) -> Result<ReservationId, Error> {
        let raw = self.id.as_deref().ok_or_else(|| Error::BadRequest {
            message: "missing reservation id".to_string(),
        })?;
        raw.trim().parse().map_err(|_| Error::BadRequest {
            message: format!("invalid reservation id '{raw}'"),
        })
    }
}

/// Window selection for calendar listings.
///
/// Exactly one of the three shapes is used, checked in this order: `month`, then `start` + `end`,
/// then `date`. Empty values such as `month=` count as absent.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListReservationsQuery {
    /// Calendar month, `YYYY-MM`
    pub month: Option<String>,
    /// First day of a range, `YYYY-MM-DD`
    pub start: Option<String>,
    /// Last day of a range (inclusive), `YYYY-MM-DD`
    pub end: Option<String>,
    /// A single day, `YYYY-MM-DD`
    pub date: Option<String>,
}

impl ListReservationsQuery {
    pub fn window(&self) -> Result<Window, Error> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }
        let window = match (present(&self.month), present(&self.start), present(&self.end), present(&self.date)) {
            (Some(month), _, _, _) => Window::month(month),
            (None, Some(start), Some(end), _) => Window::days(start, end),
            (None, _, _, Some(date)) => Window::day(date),
            _ => {
                return Err(Error::BadRequest {
                    message: "one of month, start and end, or date is required".to_string(),
                });
            }
        };
        window.map_err(|e| Error::BadRequest { message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(pairs: &[(&str, &str)]) -> ListReservationsQuery {
        let encoded = serde_urlencoded::to_string(pairs).unwrap();
        serde_urlencoded::from_str(&encoded).unwrap()
    }

    #[test]
    fn test_window_precedence() {
        let both = query(&[("date", "2025-07-14"), ("month", "2025-07")]);
        assert!(matches!(both.window().unwrap(), Window::Month { .. }));

        let week = query(&[("start", "2025-07-14"), ("end", "2025-07-20"), ("date", "2025-07-01")]);
        assert!(matches!(week.window().unwrap(), Window::Days { .. }));

        // A lone start falls through to date
        let lone_start = query(&[("start", "2025-07-14"), ("date", "2025-07-01")]);
        assert!(matches!(lone_start.window().unwrap(), Window::Day(_)));
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let blank_month = query(&[("month", ""), ("date", "2025-07-01")]);
        assert!(matches!(blank_month.window().unwrap(), Window::Day(_)));

        let blank_end = query(&[("start", "2025-07-14"), ("end", ""), ("date", "2025-07-01")]);
        assert!(matches!(blank_end.window().unwrap(), Window::Day(_)));

        let all_blank = query(&[("month", ""), ("date", "")]);
        assert!(matches!(all_blank.window(), Err(Error::BadRequest { .. })));
    }

    #[test]
    fn test_window_requires_a_parameter_set() {
        assert!(matches!(query(&[]).window(), Err(Error::BadRequest { .. })));
        assert!(matches!(query(&[("end", "2025-07-20")]).window(), Err(Error::BadRequest { .. })));
        assert!(matches!(query(&[("month", "July")]).window(), Err(Error::BadRequest { .. })));
    }

    #[test]
    fn test_id_query() {
        let ok = ReservationIdQuery { id: Some("42".to_string()) };
        assert_eq!(ok.id().unwrap(), 42);

        assert!(ReservationIdQuery::default().id().is_err());
        assert!(ReservationIdQuery { id: Some("abc".to_string()) }.id().is_err());
    }

    #[test]
    fn test_request_validation() {
        let start = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 7, 1, 11, 0, 0).unwrap();

        let request = ReservationRequest {
            title: "  Standup  ".to_string(),
            start_time: start,
            end_time: end,
        };
        let (title, range) = request.validate().unwrap();
        assert_eq!(title, "Standup");
        assert_eq!(range.start(), start);

        let blank = ReservationRequest {
            title: "   ".to_string(),
            ..request.clone()
        };
        assert!(blank.validate().is_err());

        let inverted = ReservationRequest {
            start_time: end,
            end_time: start,
            ..request.clone()
        };
        assert!(inverted.validate().is_err());

        let long = ReservationRequest {
            title: "x".repeat(MAX_TITLE_LENGTH + 1),
            ..request
        };
        assert!(long.validate().is_err());
    }
}
