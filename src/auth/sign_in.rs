//! Sign-in and sign-out handlers.
//!
//! The application sits behind an identity-aware proxy that authenticates the
//! user and forwards a stable identifier plus profile fields as request
//! headers. Sign-in copies that identity into a local user row (creating it
//! on first sight) and into the private session cookie.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{remove_session_cookie, set_session_cookie},
    endpoints,
    html::error_view,
    user::{UserProfile, ensure_user},
};

/// The stable user identifier forwarded by the identity-aware proxy.
pub const HEADER_EXTERNAL_ID: &str = "x-auth-request-user";
/// The email address forwarded by the identity-aware proxy.
pub const HEADER_EMAIL: &str = "x-auth-request-email";
/// The display name forwarded by the identity-aware proxy.
pub const HEADER_NAME: &str = "x-auth-request-preferred-username";
/// The optional avatar URL forwarded by the identity-aware proxy.
pub const HEADER_PICTURE: &str = "x-auth-request-picture";

/// The state needed for the sign-in and sign-out handlers.
#[derive(Clone)]
pub struct SignInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which session cookies are valid.
    pub cookie_duration: Duration,
    /// The database connection for creating and loading users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SignInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SignInState> for Key {
    fn from_ref(state: &SignInState) -> Self {
        state.cookie_key.clone()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn profile_from_headers(headers: &HeaderMap) -> Option<UserProfile> {
    let external_id = header_value(headers, HEADER_EXTERNAL_ID)?;
    let email = header_value(headers, HEADER_EMAIL)?;
    let name = header_value(headers, HEADER_NAME).unwrap_or_else(|| email.clone());
    let picture = header_value(headers, HEADER_PICTURE);

    Some(UserProfile {
        external_id,
        name,
        email,
        picture,
    })
}

fn missing_identity_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        error_view(
            "Sign-in required",
            "401",
            "No identity was supplied with this request.",
            "Access this application through its authentication proxy so that \
            your identity headers are set.",
        ),
    )
        .into_response()
}

/// Completes sign-in from the identity-aware proxy: ensures the local user
/// row exists, stores the identity in the session cookie, and redirects to
/// the dashboard.
pub async fn sign_in(
    State(state): State<SignInState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
) -> Response {
    let profile = match profile_from_headers(&headers) {
        Some(profile) => profile,
        None => {
            tracing::warn!("sign-in request without identity headers");
            return missing_identity_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let user = match ensure_user(&profile, &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("could not ensure user for sign-in: {error}");
            return error.into_response();
        }
    };

    tracing::info!("signed in user {}", user.id);

    let jar = set_session_cookie(jar, &user.external_id, state.cookie_duration);

    (jar, Redirect::to(endpoints::DASHBOARD_VIEW)).into_response()
}

/// Clears the session cookie and sends the client back to sign-in.
pub async fn sign_out(State(_state): State<SignInState>, jar: PrivateCookieJar) -> Response {
    let jar = remove_session_cookie(jar);

    (jar, Redirect::to(endpoints::SIGN_IN)).into_response()
}
