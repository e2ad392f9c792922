//! Session handling for the external identity provider: the private session
//! cookie, the guard middleware, and the sign-in/sign-out handlers.

pub(crate) mod cookie;
mod middleware;
mod sign_in;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use sign_in::{
    HEADER_EMAIL, HEADER_EXTERNAL_ID, HEADER_NAME, HEADER_PICTURE, SignInState, sign_in, sign_out,
};
