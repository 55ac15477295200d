//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction),
//! binds parameters, and returns the models from [`crate::db::models`].
//!
//! - [`Users`]: accounts created from identity-provider profiles
//! - [`Reservations`]: bookings, the overlap check, and calendar listings
//!
//! ```ignore
//! use roomctl::db::handlers::Reservations;
//!
//! let mut conn = pool.acquire().await?;
//! let mine = Reservations::new(&mut conn).list_by_user(user_id).await?;
//! ```

pub mod reservations;
pub mod users;

pub use reservations::Reservations;
pub use users::Users;
