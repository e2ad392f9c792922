//! The page for editing an existing transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{PAGE_CONTAINER_STYLE, base, dollar_input_styles},
    navigation::NavBar,
    transaction::{
        core::{Transaction, TransactionId, get_transaction},
        form::{TransactionFormAction, TransactionFormValues, transaction_form},
    },
    user::UserId,
};

/// The state needed for the edit-transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn edit_transaction_view(transaction: &Transaction) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_TRANSACTION_VIEW).into_html();

    let values = TransactionFormValues {
        kind: transaction.kind,
        amount: transaction.amount.to_string(),
        date: transaction.date,
        category: transaction.category.clone(),
        description: transaction.description.clone(),
        is_recurring: transaction.is_recurring,
        recurring_interval: transaction.recurring_interval,
    };
    let form = transaction_form(
        TransactionFormAction::Update(transaction.id),
        &values,
        &[],
        None,
    );

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-md"
            {
                h1 class="text-xl font-bold mb-4" { "Edit Transaction" }

                (form)
            }
        }
    );

    base("Edit Transaction", &[dollar_input_styles()], &content)
}

/// Renders the page for editing one transaction.
pub async fn get_edit_transaction_page(
    State(state): State<EditTransactionPageState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, user_id, &connection)?;

    Ok(edit_transaction_view(&transaction).into_response())
}

#[cfg(test)]
mod edit_transaction_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rust_decimal_macros::dec;
    use scraper::Selector;
    use time::macros::{date, datetime};

    use crate::{
        Error,
        test_utils::{
            assert_valid_html, get_test_connection, insert_test_account, insert_test_user,
            parse_html_document,
        },
        transaction::core::{NewTransaction, TransactionKind, create_transaction},
        user::UserId,
    };

    use super::{EditTransactionPageState, get_edit_transaction_page};

    #[tokio::test]
    async fn renders_form_with_existing_values() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let transaction = create_transaction(
            NewTransaction {
                user_id,
                account_id: account.id,
                kind: TransactionKind::Expense,
                amount: dec!(19.99),
                date: date!(2025 - 06 - 10),
                category: "entertainment".to_owned(),
                description: "Movie night".to_owned(),
                receipt_url: None,
                is_recurring: false,
                recurring_interval: None,
                created_at: datetime!(2025-06-10 12:00 UTC),
            },
            &conn,
        )
        .unwrap();
        let state = EditTransactionPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_edit_transaction_page(
            State(state),
            Extension(user_id),
            Path(transaction.id),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let amount_input = Selector::parse("input[name='amount']").unwrap();
        let amount = html.select(&amount_input).next().expect("no amount input");
        assert_eq!(amount.attr("value"), Some("19.99"));

        let description_input = Selector::parse("input[name='description']").unwrap();
        let description = html
            .select(&description_input)
            .next()
            .expect("no description input");
        assert_eq!(description.attr("value"), Some("Movie night"));
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = EditTransactionPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let result =
            get_edit_transaction_page(State(state), Extension(user_id), Path(42)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn foreign_transaction_is_not_found() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let transaction = create_transaction(
            NewTransaction {
                user_id,
                account_id: account.id,
                kind: TransactionKind::Expense,
                amount: dec!(5.00),
                date: date!(2025 - 06 - 10),
                category: "food".to_owned(),
                description: String::new(),
                receipt_url: None,
                is_recurring: false,
                recurring_interval: None,
                created_at: datetime!(2025-06-10 12:00 UTC),
            },
            &conn,
        )
        .unwrap();
        let state = EditTransactionPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let result = get_edit_transaction_page(
            State(state),
            Extension(UserId::new(999)),
            Path(transaction.id),
        )
        .await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}
