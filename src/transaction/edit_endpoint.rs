//! Defines the endpoint for updating a transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    transaction::{
        core::{TransactionId, TransactionKind, TransactionUpdate, update_transaction},
        form::{parse_amount, parse_interval},
    },
    user::UserId,
};

/// The state needed to update a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for editing a transaction.
///
/// The form always submits the full field set, so the recurring schedule
/// reflects what the user chose rather than being dropped by a partial edit.
#[derive(Debug, Deserialize)]
pub struct EditTransactionForm {
    pub kind: TransactionKind,
    pub amount: String,
    pub date: Date,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_interval: String,
}

/// A route handler for updating a transaction, redirects to the owning
/// account's page on success.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<EditTransactionForm>,
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

    let update = TransactionUpdate {
        kind: form.kind,
        amount,
        date: form.date,
        category: form.category,
        description: form.description,
        is_recurring: form.is_recurring,
        recurring_interval: parse_interval(&form.recurring_interval),
    };

    match update_transaction(transaction_id, user_id, update, &connection) {
        Ok(transaction) => (
            HxRedirect(format_endpoint(
                endpoints::ACCOUNT_DETAIL_VIEW,
                transaction.account_id,
            )),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not update transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}
