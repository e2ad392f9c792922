//! The private session cookie that carries the signed-in identity.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::Error;

pub(crate) const COOKIE_EXTERNAL_ID: &str = "external_id";

/// How long a session cookie stays valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::hours(24);

/// Store the identity provider's stable user identifier in the private
/// (encrypted) cookie jar.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    external_id: &str,
    duration: Duration,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_EXTERNAL_ID, external_id.to_owned()))
            .expires(OffsetDateTime::now_utc() + duration)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true)
            .path("/"),
    )
}

/// Read the external user identifier from the session cookie.
///
/// # Errors
/// Returns [Error::Unauthenticated] if the cookie is missing.
pub(crate) fn get_external_id_from_cookie(jar: &PrivateCookieJar) -> Result<String, Error> {
    jar.get(COOKIE_EXTERNAL_ID)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .ok_or(Error::Unauthenticated)
}

/// Remove the session cookie, signing the client out.
pub(crate) fn remove_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build((COOKIE_EXTERNAL_ID, "")).path("/"))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};

    use crate::Error;

    use super::{
        DEFAULT_COOKIE_DURATION, get_external_id_from_cookie, remove_session_cookie,
        set_session_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn set_then_get_round_trips() {
        let jar = set_session_cookie(get_jar(), "idp|12345", DEFAULT_COOKIE_DURATION);

        let external_id = get_external_id_from_cookie(&jar).unwrap();

        assert_eq!(external_id, "idp|12345");
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        let jar = get_jar();

        assert_eq!(
            get_external_id_from_cookie(&jar),
            Err(Error::Unauthenticated)
        );
    }

    #[test]
    fn remove_clears_the_session() {
        let jar = set_session_cookie(get_jar(), "idp|12345", DEFAULT_COOKIE_DURATION);

        let jar = remove_session_cookie(jar);

        assert_eq!(
            get_external_id_from_cookie(&jar),
            Err(Error::Unauthenticated)
        );
    }
}
