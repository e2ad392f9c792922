//! Spendwise is a web app for tracking accounts, transactions, and a monthly
//! budget.
//!
//! This library provides a REST API that directly serves HTML pages, plus the
//! background jobs that materialize recurring transactions and send budget
//! alert emails.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod alert;
mod app_state;
mod auth;
mod budget;
mod dashboard;
mod database_id;
mod db;
mod email;
mod endpoints;
mod html;
mod internal_server_error;
mod jobs;
mod logging;
mod money;
mod navigation;
mod not_found;
mod rate_limit;
mod receipt;
mod routing;
#[cfg(test)]
mod test_utils;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use email::{Email, HttpMailer, Mailer};
pub use jobs::{
    RecurringEvent, run_budget_alert_job, run_recurring_processor, run_recurring_trigger_job,
};
pub use logging::logging_middleware;
pub use rate_limit::RateLimiter;
pub use receipt::{ReceiptDetails, ReceiptScanner};
pub use routing::build_router;

use crate::{
    alert::Alert,
    internal_server_error::get_internal_server_error_response,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request does not carry a valid signed-in identity.
    #[error("the request is not authenticated")]
    Unauthenticated,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct, that the resource has been created, and that it
    /// belongs to the signed-in user.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A balance or amount string could not be parsed as a decimal number.
    #[error("\"{0}\" is not a valid amount of money")]
    InvalidAmount(String),

    /// A transaction was marked recurring without a recurring interval.
    #[error("a recurring transaction requires a recurring interval")]
    MissingRecurringInterval,

    /// The caller created transactions faster than the rate limit allows.
    #[error("too many requests, try again later")]
    RateLimited,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete transactions that do not exist
    #[error("tried to delete transactions that are not in the database")]
    DeleteMissingTransactions,

    /// Tried to update an account that does not exist or is not owned by the
    /// caller
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// The email delivery service rejected or failed to accept a message.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not deliver email: {0}")]
    EmailDelivery(String),

    /// The receipt extraction service could not be reached or returned a
    /// non-success status.
    #[error("receipt scan failed: {0}")]
    ReceiptScan(String),

    /// The receipt extraction service replied with text that could not be
    /// parsed into transaction fields.
    #[error("invalid response from the receipt extraction service: {0}")]
    InvalidReceiptResponse(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Unauthenticated => Redirect::to(endpoints::SIGN_IN).into_response(),
            Error::NotFound => get_404_not_found_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                get_internal_server_error_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::InvalidAmount(text) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid amount",
                &format!("\"{text}\" is not a valid amount of money. Enter a number such as 42.50."),
            )
            .into_response(),
            Error::MissingRecurringInterval => Alert::error(
                StatusCode::BAD_REQUEST,
                "Missing recurring interval",
                "Choose how often the transaction repeats, or untick 'recurring'.",
            )
            .into_response(),
            Error::RateLimited => Alert::error(
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests",
                "You are creating transactions too quickly. Please try again later.",
            )
            .into_response(),
            Error::NotFound => Alert::error(
                StatusCode::NOT_FOUND,
                "Not found",
                "The requested item could not be found.",
            )
            .into_response(),
            Error::UpdateMissingTransaction => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not update transaction",
                "The transaction could not be found.",
            )
            .into_response(),
            Error::DeleteMissingTransactions => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not delete transactions",
                "The selected transactions could not be found. \
                Try refreshing the page to see if they have already been deleted.",
            )
            .into_response(),
            Error::UpdateMissingAccount => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not update account",
                "The account could not be found.",
            )
            .into_response(),
            Error::InvalidReceiptResponse(_) => Alert::error(
                StatusCode::BAD_GATEWAY,
                "Could not read the receipt",
                "The receipt scanner returned an unusable answer. \
                Try a clearer photo, or fill in the form by hand.",
            )
            .into_response(),
            Error::ReceiptScan(_) => Alert::error(
                StatusCode::BAD_GATEWAY,
                "Receipt scan failed",
                "The receipt scanner could not be reached. \
                Try again later, or fill in the form by hand.",
            )
            .into_response(),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                Alert::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                )
                .into_response()
            }
        }
    }
}
