//! OAuth `state` handling for the login round-trip.
//!
//! `/login` generates a random nonce, sends it to the provider as `state`, and stores it in a
//! short-lived signed cookie. `/callback` accepts the provider's answer only if the returned
//! `state` matches that cookie. The cookie is cleared on every callback, so a nonce is good for one
//! attempt.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use rand::prelude::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};

use super::session::{cookie, sign, verify};
use crate::{config::Config, errors::Error};

/// Claims of the state cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateClaims {
    pub nonce: String,
    pub exp: i64,
    pub iat: i64,
}

/// Generate an unguessable nonce for the OAuth `state` parameter
pub fn generate_state_nonce() -> String {
    let mut bytes = [0u8; 32];
    rng().fill(&mut bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Sign a nonce into a cookie value that expires after `session.state_timeout`
pub fn create_state_token(nonce: &str, config: &Config) -> Result<String, Error> {
    let now = Utc::now();
    let claims = StateClaims {
        nonce: nonce.to_string(),
        exp: (now + config.session.state_timeout).timestamp(),
        iat: now.timestamp(),
    };
    sign(&claims, config)
}

/// Check the `state` returned by the provider against the state cookie.
///
/// Fails with `Unauthenticated` when the cookie is missing, forged, expired, or holds a different
/// nonce.
pub fn verify_state(returned: &str, cookie_value: Option<&str>, config: &Config) -> Result<(), Error> {
    let mismatch = || Error::Unauthenticated {
        message: Some("OAuth state mismatch".to_string()),
    };

    let claims = verify::<StateClaims>(cookie_value.ok_or_else(mismatch)?, config)?;
    if returned.is_empty() || claims.nonce != returned {
        return Err(mismatch());
    }
    Ok(())
}

/// `Set-Cookie` value carrying the state token.
///
/// Always `SameSite=Lax`: the provider's redirect back to `/callback` is a cross-site top-level
/// navigation and a strict cookie would not be sent with it.
pub fn state_cookie(token: &str, config: &Config) -> String {
    let session = &config.session;
    cookie(
        &session.state_cookie_name,
        token,
        "Lax",
        session.state_timeout.as_secs(),
        session.cookie_secure,
    )
}

/// `Set-Cookie` value that removes the state cookie
pub fn expired_state_cookie(config: &Config) -> String {
    let session = &config.session;
    cookie(&session.state_cookie_name, "", "Lax", 0, session.cookie_secure)
}
