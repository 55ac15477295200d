//! API request/response models for the login flow.

use axum::{
    Json,
    http::{HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

/// Query string the identity provider sends back to `/callback`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Echo of the state nonce sent with the authorize redirect
    pub state: Option<String>,
    /// Authorization code to exchange for a token
    pub code: Option<String>,
    /// Set by the provider instead of `code` when the user declines
    pub error: Option<String>,
}

/// Body of `POST /api/logout`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutBody {
    pub message: String,
}

/// 200 with a body and the cookie that clears the session
#[derive(Debug)]
pub struct LogoutResponse {
    pub body: LogoutBody,
    pub cookie: String,
}

/// 303 redirect that also sets or clears cookies
#[derive(Debug)]
pub struct AuthRedirect {
    pub location: String,
    pub cookies: Vec<String>,
}

fn append_cookies(response: &mut Response, cookies: impl IntoIterator<Item = String>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Dropping unencodable Set-Cookie header: {e}"),
        }
    }
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        append_cookies(&mut response, [self.cookie]);
        response
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let mut response = Redirect::to(&self.location).into_response();
        append_cookies(&mut response, self.cookies);
        response
    }
}
