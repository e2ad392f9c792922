//! The page showing one account and its transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::core::{Account, AccountId, get_account},
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BUTTON_DELETE_STYLE, FORM_RADIO_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    money::to_float,
    navigation::NavBar,
    transaction::{Transaction, TransactionKind, query_transactions_for_account},
    user::UserId,
};

/// The state needed for the account detail page.
#[derive(Debug, Clone)]
pub struct AccountDetailState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountDetailState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn signed_amount_cell(transaction: &Transaction) -> Markup {
    let amount = format_currency(to_float(transaction.amount));

    match transaction.kind {
        TransactionKind::Expense => html!(
            span class="text-red-600 dark:text-red-400 tabular-nums" { "-" (amount) }
        ),
        TransactionKind::Income => html!(
            span class="text-green-600 dark:text-green-400 tabular-nums" { "+" (amount) }
        ),
    }
}

fn transaction_table_row(transaction: &Transaction) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE)
            {
                input
                    type="checkbox"
                    name="ids"
                    value=(transaction.id)
                    class=(FORM_RADIO_INPUT_STYLE)
                    aria-label=(format!("Select transaction {}", transaction.id));
            }

            td class=(TABLE_CELL_STYLE) { (transaction.date) }

            td class=(TABLE_CELL_STYLE) { (transaction.category) }

            td class=(TABLE_CELL_STYLE)
            {
                (transaction.description)

                @if transaction.is_recurring {
                    " "
                    span class=(BADGE_STYLE)
                    {
                        @match transaction.recurring_interval {
                            Some(interval) => (interval.label()),
                            None => "Recurring",
                        }
                    }
                }
            }

            td class="px-6 py-4 text-right" { (signed_amount_cell(transaction)) }

            td class=(TABLE_CELL_STYLE)
            {
                a href=(edit_url) class=(LINK_STYLE) { "Edit" }
            }
        }
    )
}

fn account_detail_view(account: &Account, transactions: &[Transaction]) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full lg:max-w-5xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    div
                    {
                        h1 class="text-xl font-bold"
                        {
                            (account.name)

                            @if account.is_default {
                                " "
                                span class=(BADGE_STYLE) { "Default" }
                            }
                        }

                        p class="text-sm text-gray-500 dark:text-gray-400"
                        {
                            (account.kind.as_str())
                            " · "
                            (transactions.len())
                            " transactions"
                        }
                    }

                    div class="text-right"
                    {
                        p class="text-2xl font-bold tabular-nums"
                        {
                            (format_currency(to_float(account.balance)))
                        }

                        a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                        {
                            "Add Transaction"
                        }
                    }
                }

                form
                    hx-delete=(endpoints::TRANSACTIONS_API)
                    hx-confirm="Delete the selected transactions? This cannot be undone."
                    hx-target-error="#alert-container"
                {
                    input type="hidden" name="account_id" value=(account.id);

                    div class="flex justify-end mb-2"
                    {
                        button type="submit" class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete Selected"
                        }
                    }

                    div class="w-full overflow-x-auto dark:bg-gray-800"
                    {
                        table class="w-full text-sm text-left rtl:text-right
                            text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                    th scope="col" class="px-6 py-3 text-right" { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                                }
                            }

                            tbody
                            {
                                @for transaction in transactions {
                                    (transaction_table_row(transaction))
                                }

                                @if transactions.is_empty() {
                                    tr
                                    {
                                        td
                                            colspan="6"
                                            class="px-6 py-4 text-center
                                                text-gray-500 dark:text-gray-400"
                                        {
                                            "No transactions yet. Record one "
                                            a
                                                href=(endpoints::NEW_TRANSACTION_VIEW)
                                                class=(LINK_STYLE)
                                            {
                                                "here"
                                            }
                                            "."
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base(&account.name, &[], &content)
}

/// Renders the page for one account and its transactions, newest first.
pub async fn get_account_detail_page(
    State(state): State<AccountDetailState>,
    Extension(user_id): Extension<UserId>,
    Path(account_id): Path<AccountId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let account = get_account(account_id, user_id, &connection)?;
    let transactions = query_transactions_for_account(account_id, user_id, &connection)?;

    Ok(account_detail_view(&account, &transactions).into_response())
}

#[cfg(test)]
mod account_detail_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rust_decimal_macros::dec;
    use scraper::{Html, Selector};
    use time::macros::{date, datetime};

    use crate::{
        Error,
        test_utils::{
            assert_content_type, assert_valid_html, get_test_connection, insert_test_account,
            insert_test_user, parse_html_document,
        },
        transaction::{NewTransaction, TransactionKind, create_transaction},
        user::UserId,
    };

    use super::{AccountDetailState, get_account_detail_page};

    fn insert_expense(
        conn: &rusqlite::Connection,
        user_id: UserId,
        account_id: i64,
        amount: rust_decimal::Decimal,
        date: time::Date,
    ) {
        create_transaction(
            NewTransaction {
                user_id,
                account_id,
                kind: TransactionKind::Expense,
                amount,
                date,
                category: "groceries".to_owned(),
                description: "Shop".to_owned(),
                receipt_url: None,
                is_recurring: false,
                recurring_interval: None,
                created_at: datetime!(2025-06-01 00:00 UTC),
            },
            conn,
        )
        .unwrap();
    }

    #[track_caller]
    fn table_dates(html: &Html) -> Vec<String> {
        let row_selector = Selector::parse("tbody tr td:nth-child(2)").unwrap();
        html.select(&row_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect()
    }

    #[tokio::test]
    async fn shows_transactions_newest_first() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        insert_expense(&conn, user_id, account.id, dec!(10.00), date!(2025 - 06 - 01));
        insert_expense(&conn, user_id, account.id, dec!(20.00), date!(2025 - 06 - 20));
        let state = AccountDetailState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_account_detail_page(State(state), Extension(user_id), Path(account.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(table_dates(&html), vec!["2025-06-20", "2025-06-01"]);

        // Balance reflects both expenses.
        let text: String = html.root_element().text().collect();
        assert!(text.contains("$970.00"), "want balance $970.00 in page");
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let state = AccountDetailState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let result = get_account_detail_page(State(state), Extension(user_id), Path(42)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn foreign_account_is_not_found() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let state = AccountDetailState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let result = get_account_detail_page(
            State(state),
            Extension(UserId::new(999)),
            Path(account.id),
        )
        .await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}
