//! A fixed-window rate limiter consulted before transaction creation.

use std::{collections::HashMap, sync::Mutex};

use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserId};

/// Counts requests per user inside a fixed time window.
///
/// When a user exceeds the limit within the current window, further requests
/// are denied until the window rolls over.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Mutex<HashMap<UserId, (OffsetDateTime, u32)>>,
}

impl RateLimiter {
    /// Create a limiter that allows `max_requests` per `window` per user.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `user_id` at `now`.
    ///
    /// # Errors
    /// Returns [Error::RateLimited] if the user has exhausted the current
    /// window's allowance.
    pub fn check(&self, user_id: UserId, now: OffsetDateTime) -> Result<(), Error> {
        let mut hits = self
            .hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = hits.entry(user_id).or_insert((now, 0));
        if now - entry.0 >= self.window {
            *entry = (now, 0);
        }

        if entry.1 >= self.max_requests {
            return Err(Error::RateLimited);
        }

        entry.1 += 1;

        Ok(())
    }
}
