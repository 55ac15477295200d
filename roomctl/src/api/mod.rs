//! HTTP API: route handlers and the JSON models they exchange.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # Routes
//!
//! - **Login** (`/login`, `/callback`): the OAuth round-trip, public
//! - **Session** (`/api/me`, `/api/logout`)
//! - **Reservations** (`/api/reservations*`): booking, editing, canceling and calendar listings
//!
//! Every `/api` route except logout needs a session cookie. The OpenAPI document is served at
//! `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
