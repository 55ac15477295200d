//! Shared fixtures for unit and HTTP tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use url::Url;

use crate::{
    AppState, build_router,
    api::models::users::CurrentUser,
    auth::{
        identity::{IdentityError, IdentityProfile, IdentityProvider},
        session,
    },
    config::Config,
    db::models::users::UserCreateDBRequest,
    storage::in_memory::InMemoryStorage,
};

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: Some(Url::parse("http://localhost:3000").unwrap()),
        secret_key: Some("test-secret-key-for-jwt".to_string()),
        ..Default::default()
    };
    config.database.url = Some("postgres://localhost/roomctl_test".to_string());
    config.oauth.client_id = Some("test-client".to_string());
    config.oauth.client_secret = Some("test-secret".to_string());
    config.oauth.redirect_url = Some(Url::parse("http://localhost:8080/callback").unwrap());
    config.oauth.allowed_email_domain = Some("example.org".to_string());
    config
}

/// Identity provider that hands out one fixed profile for the code `good-code`.
pub struct FakeIdentityProvider {
    profile: IdentityProfile,
    fail_exchange: bool,
}

impl FakeIdentityProvider {
    pub fn new(profile: IdentityProfile) -> Self {
        Self {
            profile,
            fail_exchange: false,
        }
    }

    /// Profile named after the email's local part, e.g. `alice@...` is "Alice"
    pub fn with_profile(id: &str, email: &str) -> Self {
        Self::new(IdentityProfile {
            id: id.to_string(),
            email: email.to_string(),
            name: display_name(email),
            picture: None,
        })
    }

    /// A provider that rejects every authorization code
    pub fn failing_exchange() -> Self {
        Self {
            fail_exchange: true,
            ..Self::with_profile("g-0", "nobody@example.org")
        }
    }
}

fn display_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self, state: &str) -> Url {
        let mut url = Url::parse("https://idp.test/authorize").unwrap();
        url.query_pairs_mut().append_pair("state", state);
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        if self.fail_exchange || code != "good-code" {
            return Err(IdentityError::TokenExchange("invalid_grant".to_string()));
        }
        Ok("fake-access-token".to_string())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
        if access_token != "fake-access-token" {
            return Err(IdentityError::Profile("unknown token".to_string()));
        }
        Ok(self.profile.clone())
    }
}

/// App state over fresh in-memory storage
pub fn create_test_state_with(identity: FakeIdentityProvider) -> AppState {
    AppState::builder()
        .config(create_test_config())
        .storage(Arc::new(InMemoryStorage::new()))
        .identity(Arc::new(identity))
        .build()
}

pub fn create_test_state() -> AppState {
    create_test_state_with(FakeIdentityProvider::with_profile("g-1", "alice@example.org"))
}

/// Full router over in-memory storage, plus its state for direct storage access
pub fn create_test_app(identity: FakeIdentityProvider) -> (TestServer, AppState) {
    let state = create_test_state_with(identity);
    let router = build_router(state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, state)
}

/// `Cookie` header value carrying a session for `user`
pub fn session_cookie_for(user: &CurrentUser, config: &Config) -> String {
    let token = session::create_session_token(user, config).expect("Failed to create session token");
    format!("{}={token}", config.session.cookie_name)
}

/// Find or create a user and return it with a session cookie, skipping the OAuth round-trip
pub async fn login_as(state: &AppState, google_id: &str, email: &str) -> (CurrentUser, String) {
    let request = UserCreateDBRequest {
        google_id: google_id.to_string(),
        email: email.to_string(),
        name: display_name(email),
        avatar_url: None,
    };
    let user = state
        .storage
        .find_or_create_user(&request)
        .await
        .expect("Failed to create test user")
        .expect("Test user is deleted");
    let user = CurrentUser::from(user);
    let cookie = session_cookie_for(&user, &state.config);
    (user, cookie)
}
