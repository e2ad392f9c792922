//! Defines the endpoint for setting the monthly budget.

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
    AppState, Error, budget::core::upsert_budget, endpoints, transaction::parse_amount,
    user::UserId,
};

/// The state needed to set the budget.
#[derive(Debug, Clone)]
pub struct SetBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SetBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for setting the monthly budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The monthly spending limit in dollars.
    pub amount: String,
}

/// A route handler that creates or updates the caller's single budget row,
/// redirects to the dashboard on success.
pub async fn set_budget_endpoint(
    State(state): State<SetBudgetState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let amount = match parse_amount(&form.amount) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match upsert_budget(user_id, amount, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not set budget for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod set_budget_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};
    use rust_decimal_macros::dec;

    use crate::{
        budget::core::get_budget,
        endpoints,
        test_utils::{assert_hx_redirect, get_test_connection, insert_test_user},
    };

    use super::{BudgetForm, SetBudgetState, set_budget_endpoint};

    #[tokio::test]
    async fn sets_and_updates_budget() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = SetBudgetState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = set_budget_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(BudgetForm {
                amount: "500.00".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let response = set_budget_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(BudgetForm {
                amount: "750.00".to_owned(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let connection = state.db_connection.lock().unwrap();
        let budget = get_budget(user_id, &connection).unwrap().unwrap();
        assert_eq!(budget.amount, dec!(750.00));
    }

    #[tokio::test]
    async fn rejects_negative_amount() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = SetBudgetState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = set_budget_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(BudgetForm {
                amount: "-5.00".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_budget(user_id, &connection), Ok(None));
    }
}
