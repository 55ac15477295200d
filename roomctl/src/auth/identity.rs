//! Identity provider abstraction.
//!
//! Login is the OAuth 2.0 authorization-code flow: send the browser to [`IdentityProvider::authorize_url`],
//! trade the returned code for an access token, then read the user's profile with it. The trait lets
//! tests swap the real Google client for an in-process fake.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::config::OAuthConfig;

/// Create the identity provider from configuration
pub fn create_provider(config: &OAuthConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    Ok(Arc::new(GoogleProvider::from_config(config)?))
}

/// Result type for identity provider operations
pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the authorization code
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The provider would not return a usable profile
    #[error("profile fetch failed: {0}")]
    Profile(String),

    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What the provider tells us about the person logging in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    /// Provider's stable subject id
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to send the browser to, carrying `state` through the round-trip
    fn authorize_url(&self, state: &str) -> Url;

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String>;

    /// Fetch the profile that an access token belongs to
    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile>;
}

/// Google OAuth 2.0 client
pub struct GoogleProvider {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: Url,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
    scopes: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    id: String,
    email: String,
    #[serde(default)]
    verified_email: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl GoogleProvider {
    pub fn from_config(config: &OAuthConfig) -> anyhow::Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("oauth.client_id is required"))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| anyhow::anyhow!("oauth.client_secret is required"))?;
        let redirect_url = config
            .redirect_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("oauth.redirect_url is required"))?;

        let http_client = reqwest::Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            redirect_url,
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
            scopes: config.scopes.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_url.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        url
    }

    #[instrument(skip_all, err)]
    async fn exchange_code(&self, code: &str) -> Result<String> {
        let response = self
            .http_client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::TokenExchange(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    #[instrument(skip_all, err)]
    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile> {
        let response = self
            .http_client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Profile(format!("userinfo returned {status}")));
        }

        let info: UserInfo = response.json().await?;
        if info.verified_email == Some(false) {
            return Err(IdentityError::Profile(format!("email {} is not verified", info.email)));
        }

        Ok(IdentityProfile {
            name: info.name.filter(|n| !n.is_empty()).unwrap_or_else(|| info.email.clone()),
            id: info.id,
            email: info.email,
            picture: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

/// Whether `email` belongs to `domain`: the part after the last `@` must equal it, ignoring case.
pub fn email_in_domain(email: &str, domain: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, host)) => !local.is_empty() && !domain.is_empty() && host.eq_ignore_ascii_case(domain),
        None => false,
    }
}
