//! Defines the endpoint for creating a new transaction.

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
use time::Date;

use crate::{
    AppState, Error,
    account::AccountId,
    endpoints::{self, format_endpoint},
    rate_limit::RateLimiter,
    timezone::local_now,
    transaction::{
        core::{NewTransaction, TransactionKind, create_transaction},
        form::{parse_amount, parse_interval},
    },
    user::UserId,
};

/// The state needed to create a transaction.
#[derive(Clone)]
pub struct CreateTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rate_limiter: state.rate_limiter.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The account the transaction applies to.
    pub account_id: AccountId,
    /// Whether money was spent or earned.
    pub kind: TransactionKind,
    /// The unsigned amount in dollars.
    pub amount: String,
    /// The date when the transaction occurred.
    pub date: Date,
    /// The category the transaction is filed under.
    pub category: String,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: String,
    /// Whether the transaction repeats on a schedule.
    #[serde(default)]
    pub is_recurring: bool,
    /// The schedule interval; empty means not recurring.
    #[serde(default)]
    pub recurring_interval: String,
}

/// A route handler for creating a new transaction, redirects to the owning
/// account's page on success.
///
/// Creation is checked against the per-user rate limiter before any database
/// work happens.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let now = local_now(&state.local_timezone);

    if let Err(error) = state.rate_limiter.check(user_id, now) {
        tracing::warn!("rate limited transaction creation for user {user_id}");
        return error.into_alert_response();
    }

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

    let new_transaction = NewTransaction {
        user_id,
        account_id: form.account_id,
        kind: form.kind,
        amount,
        date: form.date,
        category: form.category,
        description: form.description,
        receipt_url: None,
        is_recurring: form.is_recurring,
        recurring_interval: parse_interval(&form.recurring_interval),
        created_at: now,
    };

    match create_transaction(new_transaction, &connection) {
        Ok(transaction) => (
            HxRedirect(format_endpoint(
                endpoints::ACCOUNT_DETAIL_VIEW,
                transaction.account_id,
            )),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not create transaction: {error}");
            error.into_alert_response()
        }
    }
}
