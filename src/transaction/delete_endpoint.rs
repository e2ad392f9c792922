//! Defines the endpoint for bulk-deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::AccountId,
    endpoints::{self, format_endpoint},
    transaction::core::{TransactionId, delete_transactions},
    user::UserId,
};

/// The state needed to delete transactions.
#[derive(Debug, Clone)]
pub struct DeleteTransactionsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for bulk-deleting transactions.
#[derive(Debug, Deserialize)]
pub struct DeleteTransactionsForm {
    /// The account page to return to afterwards.
    pub account_id: AccountId,
    /// The IDs of the transactions to delete.
    #[serde(default)]
    pub ids: Vec<TransactionId>,
}

/// A route handler for deleting the selected transactions and reversing their
/// effect on account balances, redirects back to the account page on success.
pub async fn delete_transactions_endpoint(
    State(state): State<DeleteTransactionsState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<DeleteTransactionsForm>,
) -> Response {
    if form.ids.is_empty() {
        return crate::alert::Alert::error(
            StatusCode::BAD_REQUEST,
            "Nothing selected",
            "Tick at least one transaction to delete.",
        )
        .into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_transactions(&form.ids, user_id, &connection) {
        Ok(deleted) => {
            tracing::info!("Deleted {deleted} transactions for user {user_id}");
            (
                HxRedirect(format_endpoint(
                    endpoints::ACCOUNT_DETAIL_VIEW,
                    form.account_id,
                )),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not delete transactions {:?}: {error}", form.ids);
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_transactions_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use rust_decimal_macros::dec;
    use time::macros::{date, datetime};

    use crate::{
        account::get_account,
        test_utils::{get_test_connection, insert_test_account, insert_test_user},
        transaction::core::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{DeleteTransactionsForm, DeleteTransactionsState, delete_transactions_endpoint};

    #[tokio::test]
    async fn deletes_selected_transactions_and_restores_balance() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let transaction = create_transaction(
            NewTransaction {
                user_id,
                account_id: account.id,
                kind: TransactionKind::Expense,
                amount: dec!(150.00),
                date: date!(2025 - 06 - 10),
                category: "groceries".to_owned(),
                description: "Weekly shop".to_owned(),
                receipt_url: None,
                is_recurring: false,
                recurring_interval: None,
                created_at: datetime!(2025-06-10 12:00 UTC),
            },
            &conn,
        )
        .unwrap();
        let state = DeleteTransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = delete_transactions_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(DeleteTransactionsForm {
                account_id: account.id,
                ids: vec![transaction.id],
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let connection = state.db_connection.lock().unwrap();
        let account = get_account(account.id, user_id, &connection).unwrap();
        assert_eq!(account.balance, dec!(1000.00));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let state = DeleteTransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = delete_transactions_endpoint(
            State(state),
            Extension(user_id),
            Form(DeleteTransactionsForm {
                account_id: account.id,
                ids: vec![],
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
