//! JWT session token creation and verification.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{api::models::users::CurrentUser, config::Config, errors::Error, types::UserId};

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,     // Subject (user ID)
    pub email: String,   // User email
    pub name: String,    // Display name
    pub picture: String, // Avatar URL, empty if none
    pub exp: i64,        // Expiration time
    pub iat: i64,        // Issued at
}

impl SessionClaims {
    /// Create new session claims for a user
    pub fn new(user: &CurrentUser, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.session.timeout;

        Self {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        }
    }
}

fn secret_key(config: &Config) -> Result<&[u8], Error> {
    config
        .secret_key
        .as_ref()
        .map(|key| key.as_bytes())
        .ok_or_else(|| Error::Internal {
            operation: "JWT sessions: secret_key is required".to_string(),
        })
}

/// Sign any claims set with the configured secret.
pub(crate) fn sign<T: Serialize>(claims: &T, config: &Config) -> Result<String, Error> {
    let key = EncodingKey::from_secret(secret_key(config)?);
    encode(&Header::default(), claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Verify a token signed by [`sign`]. Bad, expired or foreign tokens are `Unauthenticated`.
pub(crate) fn verify<T: DeserializeOwned>(token: &str, config: &Config) -> Result<T, Error> {
    let key = DecodingKey::from_secret(secret_key(config)?);
    let validation = Validation::default();

    let token_data = decode::<T>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        // A well-signed token whose claims don't fit (e.g. a state token offered as a session)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        // Catch-all for any future error variants (default to server error for safety)
        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    })?;

    Ok(token_data.claims)
}

/// Create a JWT token for a user session
pub fn create_session_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    sign(&SessionClaims::new(user, config), config)
}

/// Verify and decode a JWT session token
pub fn verify_session_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    verify::<SessionClaims>(token, config).map(CurrentUser::from)
}

/// `Set-Cookie` value carrying a fresh session token
pub fn session_cookie(token: &str, config: &Config) -> String {
    let session = &config.session;
    cookie(&session.cookie_name, token, &session.cookie_same_site, session.timeout.as_secs(), session.cookie_secure)
}

/// `Set-Cookie` value that removes the session cookie
pub fn expired_session_cookie(config: &Config) -> String {
    let session = &config.session;
    cookie(&session.cookie_name, "", &session.cookie_same_site, 0, session.cookie_secure)
}

pub(crate) fn cookie(name: &str, value: &str, same_site: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={value}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age}{secure}")
}
