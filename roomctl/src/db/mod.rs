//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Storage    │  (crate::storage - the seam handlers talk to)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded by [`crate::migrator`]:
//!
//! ```ignore
//! roomctl::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
