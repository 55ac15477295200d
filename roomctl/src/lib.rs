//! # roomctl: meeting room reservations
//!
//! `roomctl` is the backend for a single shared meeting room. People log in with their
//! organisation's Google account, and only addresses in the configured email domain are let in.
//! They can then book the room, move or rename their bookings, cancel them, and browse everyone's
//! bookings a day, a week or a month at a time. Two confirmed bookings never overlap.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); persistence is PostgreSQL via sqlx.
//!
//! - The **API layer** ([`api`]) holds the route handlers and the JSON request/response models.
//! - The **authentication layer** ([`auth`]) runs the OAuth login round-trip, issues a signed JWT
//!   session cookie, and provides the [`CurrentUser`](api::models::users::CurrentUser) extractor
//!   that guards every `/api` route.
//! - The **storage layer** ([`storage`]) is the [`Storage`](storage::Storage) trait that handlers
//!   talk to. The service uses the Postgres implementation, built on the repositories in [`db`];
//!   tests use the in-memory one.
//! - [`conflict`] is the overlap rule and [`calendar`] turns `?date=`, `?start=&end=` and `?month=`
//!   into UTC time windows.
//!
//! ## Double-booking
//!
//! Create and edit take a transaction-scoped advisory lock, look for an overlapping confirmed
//! reservation, and only then write. An `EXCLUDE USING gist` constraint on the table rejects any
//! overlap that might still slip through, and both paths surface as `409 Conflict`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use roomctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = roomctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     roomctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod db;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::handlers::{auth as auth_handlers, reservations},
    auth::identity::{IdentityProvider, create_provider},
    openapi::ApiDoc,
    storage::{Storage, postgres::PostgresStorage},
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{get, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, Level};
use utoipa::OpenApi;

pub use types::{ReservationId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(Arc::new(PostgresStorage::new(pool)))
///     .identity(create_provider(&config.oauth)?)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Get the roomctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to Postgres with the configured pool settings and run pending migrations
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("database.url is required"))?;
    let settings = &config.database.pool;

    let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(optional(settings.idle_timeout_secs))
        .max_lifetime(optional(settings.max_lifetime_secs))
        .connect(url)
        .await?;

    info!("Running database migrations");
    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration.
///
/// With no explicit origins, only the front end's own origin is allowed.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    if config.cors.allowed_origins.is_empty() {
        if let Some(frontend) = &config.frontend_url {
            origins.push(frontend.origin().ascii_serialization().parse::<HeaderValue>()?);
        }
    } else {
        for origin in &config.cors.allowed_origins {
            origins.push(origin.origin().ascii_serialization().parse::<HeaderValue>()?);
        }
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: login flow, `/api` routes, health check, OpenAPI document,
/// CORS and request tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let api_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .route("/logout", post(auth_handlers::logout))
        .route(
            "/reservations",
            get(reservations::list_reservations)
                .post(reservations::create_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/reservations/me", get(reservations::list_my_reservations))
        .route("/reservations/cancel", put(reservations::cancel_reservation))
        .route("/reservations/{id}", get(reservations::get_reservation));

    let router = Router::new()
        .route("/login", get(auth_handlers::login))
        .route("/callback", get(auth_handlers::callback))
        .nest("/api", api_routes)
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The running service: a router over Postgres-backed state.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations, and builds the
///    identity provider client and router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests until
///    the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting roomctl with configuration: {:#?}", config.redacted());

        let pool = setup_database(&config).await?;
        let identity = create_provider(&config.oauth)?;

        let app_state = AppState::builder()
            .config(config.clone())
            .storage(Arc::new(PostgresStorage::new(pool.clone())))
            .identity(identity)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "roomctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
