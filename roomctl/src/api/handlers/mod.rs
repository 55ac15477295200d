//! HTTP request handlers.
//!
//! - [`auth`]: Login redirect, OAuth callback, current user and logout
//! - [`reservations`]: Reservation CRUD and windowed listings
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching HTTP status and a
//! `{"status": "error", "message": ...}` body.

pub mod auth;
pub mod reservations;
