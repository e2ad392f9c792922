//! Defines the endpoint for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{AccountKind, create_account},
    endpoints,
    timezone::local_now,
    user::UserId,
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating an account.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    /// The account name.
    pub name: String,
    /// Whether this is a savings or current account.
    pub kind: AccountKind,
    /// The opening balance in dollars.
    pub balance: String,
    /// Whether to make this the default account.
    #[serde(default)]
    pub is_default: bool,
}

/// A route handler for creating a new account, redirects to the dashboard on
/// success.
///
/// The user's first account becomes the default regardless of the checkbox.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<AccountForm>,
) -> Response {
    let balance = match parse_balance(&form.balance) {
        Ok(balance) => balance,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_account(
        user_id,
        &form.name,
        form.kind,
        balance,
        form.is_default,
        local_now(&state.local_timezone),
        &connection,
    ) {
        Ok(_) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not create account {:?}: {error}", form.name);
            error.into_alert_response()
        }
    }
}

/// Unlike transaction amounts, an opening balance may be negative, e.g. for a
/// credit card that is already carrying debt.
fn parse_balance(text: &str) -> Result<rust_decimal::Decimal, Error> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(text.to_owned()))
}

#[cfg(test)]
mod create_account_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};
    use rust_decimal_macros::dec;

    use crate::{
        account::core::{AccountKind, list_accounts},
        endpoints,
        test_utils::{assert_hx_redirect, get_test_connection, insert_test_user},
    };

    use super::{AccountForm, CreateAccountState, create_account_endpoint};

    fn get_test_state() -> (CreateAccountState, crate::user::UserId) {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = CreateAccountState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Pacific/Auckland".to_owned(),
        };

        (state, user_id)
    }

    #[tokio::test]
    async fn creates_account_and_redirects_to_dashboard() {
        let (state, user_id) = get_test_state();

        let response = create_account_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(AccountForm {
                name: "Everyday".to_owned(),
                kind: AccountKind::Current,
                balance: "1000.00".to_owned(),
                is_default: false,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let accounts = list_accounts(user_id, &connection).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account.balance, dec!(1000.00));
        // The first account is always the default.
        assert!(accounts[0].account.is_default);
    }

    #[tokio::test]
    async fn rejects_unparseable_balance() {
        let (state, user_id) = get_test_state();

        let response = create_account_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(AccountForm {
                name: "Everyday".to_owned(),
                kind: AccountKind::Current,
                balance: "about a grand".to_owned(),
                is_default: false,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        assert!(list_accounts(user_id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_opening_balance_is_allowed() {
        let (state, user_id) = get_test_state();

        let response = create_account_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(AccountForm {
                name: "Credit card".to_owned(),
                kind: AccountKind::Current,
                balance: "-250.00".to_owned(),
                is_default: false,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let connection = state.db_connection.lock().unwrap();
        let accounts = list_accounts(user_id, &connection).unwrap();
        assert_eq!(accounts[0].account.balance, dec!(-250.00));
    }
}
