use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{read_cookie, session},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    /// Authenticate from the session cookie.
    ///
    /// The token must verify, and the user it names must still be active: a soft-deleted account
    /// loses access even while its cookie is unexpired.
    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = read_cookie(&parts.headers, &state.config.session.cookie_name) else {
            trace!("No session cookie present");
            return Err(Error::Unauthenticated { message: None });
        };

        let claimed = session::verify_session_token(token, &state.config)?;

        match state.storage.get_user(claimed.id).await? {
            Some(user) => {
                debug!("Found session authenticated user: {}", user.id);
                Ok(CurrentUser::from(user))
            }
            None => {
                debug!("Session names user {} which no longer exists", claimed.id);
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}
