//! The page for recording a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner,
    },
    navigation::NavBar,
    timezone::local_date,
    transaction::form::{TransactionFormAction, TransactionFormValues, transaction_form},
    user::UserId,
};

/// The state needed for the new-transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The receipt scanner widget: uploads an image and swaps in a pre-filled
/// transaction form.
fn receipt_scanner_view() -> Markup {
    html!(
        form
            id="indicator"
            class="space-y-2 w-full max-w-md mb-6 pb-6 border-b border-gray-200 dark:border-gray-700"
            hx-post=(endpoints::RECEIPT_SCAN_API)
            hx-encoding="multipart/form-data"
            hx-target="#transaction-form"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
        {
            label for="receipt" class=(FORM_LABEL_STYLE) { "Scan a receipt" }

            input
                type="file"
                name="receipt"
                id="receipt"
                accept="image/*"
                class=(FORM_TEXT_INPUT_STYLE)
                required;

            button type="submit" class=(BUTTON_SECONDARY_STYLE)
            {
                span class="htmx-indicator" { (loading_spinner()) }
                "Scan Receipt"
            }
        }
    )
}

fn new_transaction_view(form: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-md"
            {
                h1 class="text-xl font-bold mb-4" { "New Transaction" }

                (receipt_scanner_view())

                (form)
            }
        }
    );

    base("New Transaction", &[dollar_input_styles()], &content)
}

fn no_accounts_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-md text-center"
            {
                h1 class="text-xl font-bold mb-4" { "New Transaction" }

                p
                {
                    "You need an account before you can record transactions. Create one "
                    a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "here" }
                    "."
                }
            }
        }
    );

    base("New Transaction", &[], &content)
}

/// Renders the page for recording a new transaction.
pub async fn get_create_transaction_page(
    State(state): State<NewTransactionPageState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts: Vec<_> = crate::account::list_accounts(user_id, &connection)?
        .into_iter()
        .map(|entry| entry.account)
        .collect();

    if accounts.is_empty() {
        return Ok(no_accounts_view().into_response());
    }

    let selected_account = accounts
        .iter()
        .find(|account| account.is_default)
        .map(|account| account.id);
    let today = local_date(&state.local_timezone);

    let form = transaction_form(
        TransactionFormAction::Create,
        &TransactionFormValues::empty(today),
        &accounts,
        selected_account,
    );

    Ok(new_transaction_view(form).into_response())
}

#[cfg(test)]
mod create_transaction_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rust_decimal_macros::dec;
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{
            assert_valid_html, get_test_connection, insert_test_account, insert_test_user,
            parse_html_document,
        },
    };

    use super::{NewTransactionPageState, get_create_transaction_page};

    #[tokio::test]
    async fn renders_scanner_and_form() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        insert_test_account(&conn, user_id, dec!(100.00));
        let state = NewTransactionPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Pacific/Auckland".to_owned(),
        };

        let response = get_create_transaction_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let scan_form = Selector::parse(&format!(
            "form[hx-post='{}']",
            endpoints::RECEIPT_SCAN_API
        ))
        .unwrap();
        assert_eq!(html.select(&scan_form).count(), 1);

        let transaction_form = Selector::parse("form#transaction-form").unwrap();
        assert_eq!(html.select(&transaction_form).count(), 1);
    }

    #[tokio::test]
    async fn prompts_for_account_when_user_has_none() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = NewTransactionPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Pacific/Auckland".to_owned(),
        };

        let response = get_create_transaction_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let link = Selector::parse(&format!("a[href='{}']", endpoints::NEW_ACCOUNT_VIEW)).unwrap();
        assert!(html.select(&link).next().is_some());
    }
}
