//! OpenAPI document for the HTTP API, served at `/api-docs/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api::{
    self,
    models::{
        reservations::{CalendarReservationResponse, ReservationRequest, ReservationResponse, ReservationStatus, StatusResponse},
        users::CurrentUser,
    },
};

/// Documents the session cookie set by `/callback`.
struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "SessionCookie".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "roomctl_session",
                    "Signed session token, set by `GET /callback` after a successful login.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "roomctl", description = "Meeting room reservations"),
    modifiers(&SessionCookieAddon),
    security(("SessionCookie" = [])),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::callback,
        api::handlers::auth::me,
        api::handlers::auth::logout,
        api::handlers::reservations::create_reservation,
        api::handlers::reservations::update_reservation,
        api::handlers::reservations::cancel_reservation,
        api::handlers::reservations::delete_reservation,
        api::handlers::reservations::get_reservation,
        api::handlers::reservations::list_my_reservations,
        api::handlers::reservations::list_reservations,
    ),
    components(
        schemas(
            CurrentUser,
            ReservationRequest,
            ReservationResponse,
            ReservationStatus,
            CalendarReservationResponse,
            StatusResponse,
            api::models::auth::LogoutBody,
        )
    ),
    tags(
        (name = "authentication", description = "Login through the identity provider and session management"),
        (name = "reservations", description = "Booking, editing, canceling and listing reservations"),
    )
)]
pub struct ApiDoc;
