//! Defines the endpoint for marking an account as the user's default.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::core::{AccountId, set_default_account},
    endpoints,
    user::UserId,
};

/// The state needed to change the default account.
#[derive(Debug, Clone)]
pub struct DefaultAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DefaultAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for making `account_id` the caller's default account,
/// redirects to the dashboard on success.
///
/// The target account must belong to the caller; foreign ids change nothing.
pub async fn set_default_account_endpoint(
    State(state): State<DefaultAccountState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match set_default_account(account_id, user_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not set default account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod set_default_account_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::{
        account::core::{AccountKind, create_account, find_default_account},
        endpoints,
        test_utils::{assert_hx_redirect, get_test_connection, insert_test_account, insert_test_user},
        user::UserId,
    };

    use super::{DefaultAccountState, set_default_account_endpoint};

    #[tokio::test]
    async fn switches_the_default_account() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        insert_test_account(&conn, user_id, dec!(100.00));
        let second = create_account(
            user_id,
            "Second",
            AccountKind::Savings,
            dec!(0.00),
            false,
            datetime!(2025-01-02 00:00 UTC),
            &conn,
        )
        .unwrap();
        let state = DefaultAccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            set_default_account_endpoint(State(state.clone()), Extension(user_id), Path(second.id))
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let default = find_default_account(user_id, &connection).unwrap().unwrap();
        assert_eq!(default.id, second.id);
    }

    #[tokio::test]
    async fn foreign_account_is_rejected() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(100.00));
        let state = DefaultAccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = set_default_account_endpoint(
            State(state.clone()),
            Extension(UserId::new(999)),
            Path(account.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let connection = state.db_connection.lock().unwrap();
        let default = find_default_account(user_id, &connection).unwrap().unwrap();
        assert_eq!(default.id, account.id);
    }
}
