//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{auth::DEFAULT_COOKIE_DURATION, rate_limit::RateLimiter, receipt::ReceiptScanner};

/// How many transactions a user may create per rate-limit window.
const TRANSACTION_RATE_LIMIT: u32 = 10;
/// The rate-limit window for transaction creation.
const TRANSACTION_RATE_WINDOW: Duration = Duration::hours(1);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The per-user limiter consulted before transaction creation.
    pub rate_limiter: Arc<RateLimiter>,

    /// The client for the receipt extraction service.
    pub receipt_scanner: ReceiptScanner,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g.
    /// "Pacific/Auckland".
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        cookie_secret: &str,
        local_timezone: &str,
        receipt_scanner: ReceiptScanner,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
            rate_limiter: Arc::new(RateLimiter::new(
                TRANSACTION_RATE_LIMIT,
                TRANSACTION_RATE_WINDOW,
            )),
            receipt_scanner,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
