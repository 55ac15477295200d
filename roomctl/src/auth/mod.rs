//! Authentication.
//!
//! Users log in through an OAuth 2.0 identity provider (Google by default) and are admitted only
//! if their email belongs to the configured domain. A successful login sets a signed JWT session
//! cookie; handlers get the caller by taking [`CurrentUser`](crate::api::models::users::CurrentUser)
//! as an argument.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor that turns the session cookie into the authenticated user
//! - [`identity`]: Identity provider trait and the Google implementation
//! - [`login_state`]: The OAuth `state` nonce and its cookie
//! - [`session`]: Session token creation, verification and cookies

use axum::http::{HeaderMap, header};

pub mod current_user;
pub mod identity;
pub mod login_state;
pub mod session;

/// Value of the first cookie called `name` in the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
