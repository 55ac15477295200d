//! Common type definitions.
//!
//! Entity IDs are Postgres `BIGSERIAL` values wrapped in type aliases so signatures say which
//! entity they refer to:
//!
//! - [`UserId`]: User account identifier
//! - [`ReservationId`]: Reservation identifier

// Type aliases for IDs
pub type UserId = i64;
pub type ReservationId = i64;
