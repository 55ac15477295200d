//! API request and response data models.
//!
//! These are kept separate from the database models in [`crate::db::models`] so the JSON contract
//! and the schema can change independently. All are annotated with `utoipa` for the OpenAPI
//! document.
//!
//! - [`auth`]: Callback parameters and the redirect/logout responses that carry cookies
//! - [`reservations`]: Reservation bodies, listings, query selectors and the response envelope
//! - [`users`]: The authenticated user

pub mod auth;
pub mod reservations;
pub mod users;
