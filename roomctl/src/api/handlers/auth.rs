use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use tracing::{info, warn};

use crate::{
    AppState,
    api::models::{
        auth::{AuthRedirect, CallbackQuery, LogoutBody, LogoutResponse},
        users::CurrentUser,
    },
    auth::{
        identity::{IdentityError, email_in_domain},
        login_state, read_cookie, session,
    },
    config::Config,
    db::{errors::DbError, models::users::UserCreateDBRequest},
    errors::Error,
};

/// Why a login did not produce a session
#[derive(Debug)]
enum LoginFailure {
    /// Missing, expired or mismatched `state`
    State(Error),
    /// The provider declined, or code exchange or profile fetch failed
    Provider(String),
    /// Authenticated, but from outside the allowed domain
    Domain(String),
    /// User lookup failed or the account is deleted
    Create(Option<DbError>),
    /// The session token could not be signed
    Session(Error),
}

impl LoginFailure {
    /// Value of the `error` query parameter on the front end's login page
    fn reason(&self) -> &'static str {
        match self {
            LoginFailure::State(_) | LoginFailure::Provider(_) | LoginFailure::Session(_) => "true",
            LoginFailure::Domain(_) => "domain",
            LoginFailure::Create(_) => "create",
        }
    }
}

impl From<IdentityError> for LoginFailure {
    fn from(e: IdentityError) -> Self {
        LoginFailure::Provider(e.to_string())
    }
}

fn frontend_base(config: &Config) -> String {
    config
        .frontend_url
        .as_ref()
        .map(|url| url.as_str().trim_end_matches('/').to_string())
        .unwrap_or_default()
}

fn frontend_home(config: &Config) -> String {
    config.frontend_url.as_ref().map(|url| url.to_string()).unwrap_or_else(|| "/".to_string())
}

fn login_error_url(config: &Config, reason: &str) -> String {
    format!("{}/login?error={reason}", frontend_base(config))
}

/// Start a login: redirect to the identity provider
#[utoipa::path(
    get,
    path = "/login",
    tag = "authentication",
    responses(
        (status = 303, description = "Redirect to the identity provider; sets the state cookie"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>) -> Result<AuthRedirect, Error> {
    let nonce = login_state::generate_state_nonce();
    let token = login_state::create_state_token(&nonce, &state.config)?;

    Ok(AuthRedirect {
        location: state.identity.authorize_url(&nonce).to_string(),
        cookies: vec![login_state::state_cookie(&token, &state.config)],
    })
}

/// Finish a login started by [`login`]
#[utoipa::path(
    get,
    path = "/callback",
    tag = "authentication",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the front end with a session cookie, or to its login page with `?error=true|domain|create`"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn callback(State(state): State<AppState>, headers: HeaderMap, Query(params): Query<CallbackQuery>) -> AuthRedirect {
    let config = &state.config;
    // The nonce is single-use whatever the outcome
    let mut cookies = vec![login_state::expired_state_cookie(config)];

    match complete_login(&state, &headers, &params).await {
        Ok(user) => {
            info!("User {} logged in", user.id);
            match session::create_session_token(&user, config) {
                Ok(token) => {
                    cookies.push(session::session_cookie(&token, config));
                    AuthRedirect {
                        location: frontend_home(config),
                        cookies,
                    }
                }
                Err(e) => failed_login(config, LoginFailure::Session(e), cookies),
            }
        }
        Err(failure) => failed_login(config, failure, cookies),
    }
}

fn failed_login(config: &Config, failure: LoginFailure, cookies: Vec<String>) -> AuthRedirect {
    warn!("Login failed: {failure:?}");
    AuthRedirect {
        location: login_error_url(config, failure.reason()),
        cookies,
    }
}

async fn complete_login(state: &AppState, headers: &HeaderMap, params: &CallbackQuery) -> Result<CurrentUser, LoginFailure> {
    let config = &state.config;

    let returned_state = params.state.as_deref().unwrap_or_default();
    login_state::verify_state(returned_state, read_cookie(headers, &config.session.state_cookie_name), config)
        .map_err(LoginFailure::State)?;

    if let Some(error) = &params.error {
        return Err(LoginFailure::Provider(format!("provider returned error '{error}'")));
    }
    let code = params
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| LoginFailure::Provider("callback carried no code".to_string()))?;

    let access_token = state.identity.exchange_code(code).await?;
    let profile = state.identity.fetch_profile(&access_token).await?;

    if !email_in_domain(&profile.email, &config.allowed_email_domain()) {
        return Err(LoginFailure::Domain(profile.email));
    }

    let request = UserCreateDBRequest {
        google_id: profile.id,
        email: profile.email,
        name: profile.name,
        avatar_url: profile.picture,
    };
    match state.storage.find_or_create_user(&request).await {
        Ok(Some(user)) => Ok(CurrentUser::from(user)),
        Ok(None) => Err(LoginFailure::Create(None)),
        Err(e) => Err(LoginFailure::Create(Some(e))),
    }
}

/// Get the logged-in user
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "No valid session"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<CurrentUser> {
    Json(current_user)
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = LogoutBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        body: LogoutBody {
            message: "logged out".to_string(),
        },
        cookie: session::expired_session_cookie(&state.config),
    }
}
