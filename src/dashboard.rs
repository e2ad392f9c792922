//! This file defines the dashboard route and its handlers.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, AccountWithCount, find_default_account, list_accounts},
    budget::{BudgetStatus, get_current_budget},
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, base, currency_rounded_with_tooltip, dollar_input_styles,
        format_currency,
    },
    money::to_float,
    navigation::NavBar,
    timezone::local_date,
    user::UserId,
};

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn account_card(entry: &AccountWithCount) -> Markup {
    let account = &entry.account;
    let detail_url = format_endpoint(endpoints::ACCOUNT_DETAIL_VIEW, account.id);
    let default_url = format_endpoint(endpoints::DEFAULT_ACCOUNT_API, account.id);

    html!(
        li class=(CARD_STYLE)
        {
            div class="flex items-start justify-between gap-3"
            {
                div
                {
                    a href=(detail_url) class="text-sm font-semibold text-gray-900 dark:text-white hover:underline"
                    {
                        (account.name)
                    }

                    p class="text-xs text-gray-500 dark:text-gray-400"
                    {
                        (account.kind.as_str())
                        " · "
                        (entry.transaction_count)
                        " transactions"
                    }
                }

                div class="text-sm tabular-nums text-right text-gray-900 dark:text-white"
                {
                    (currency_rounded_with_tooltip(to_float(account.balance)))
                }
            }

            div class="mt-2 flex items-center gap-4 text-sm"
            {
                @if account.is_default {
                    span class=(BADGE_STYLE) { "Default" }
                } @else {
                    button
                        class=(LINK_STYLE)
                        hx-put=(default_url)
                        hx-target-error="#alert-container"
                    {
                        "Make default"
                    }
                }
            }
        }
    )
}

fn budget_section(default_account: Option<&Account>, status: Option<&BudgetStatus>) -> Markup {
    html!(
        section class=(CARD_STYLE)
        {
            h2 class="text-lg font-bold mb-2" { "Monthly Budget" }

            @match (default_account, status) {
                (Some(account), Some(status)) => {
                    @if let Some(budget) = &status.budget {
                        @let percent = status
                            .percent_used()
                            .map(to_float)
                            .unwrap_or_default();

                        p class="text-sm text-gray-700 dark:text-gray-300"
                        {
                            (format_currency(to_float(status.current_expenses)))
                            " of "
                            (format_currency(to_float(budget.amount)))
                            " spent this month on "
                            (account.name)
                            (format!(" ({percent:.1}% used)"))
                        }

                        div class="w-full bg-gray-200 rounded-full h-2.5 my-3 dark:bg-gray-700"
                        {
                            div
                                class="bg-blue-600 h-2.5 rounded-full dark:bg-blue-500"
                                style=(format!("width: {}%", percent.clamp(0.0, 100.0)))
                            {}
                        }
                    } @else {
                        p class="text-sm text-gray-700 dark:text-gray-300 mb-3"
                        {
                            "No budget set yet. Spent so far this month on "
                            (account.name)
                            ": "
                            (format_currency(to_float(status.current_expenses)))
                        }
                    }

                    form
                        class="flex items-end gap-2"
                        hx-post=(endpoints::BUDGET_API)
                        hx-target-error="#alert-container"
                    {
                        div class="grow"
                        {
                            label for="amount" class=(FORM_LABEL_STYLE) { "Budget amount" }

                            div class="input-wrapper w-full"
                            {
                                input
                                    type="number"
                                    name="amount"
                                    id="amount"
                                    step="0.01"
                                    min="0"
                                    class=(FORM_TEXT_INPUT_STYLE)
                                    required;
                            }
                        }

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Budget" }
                    }
                }
                _ => {
                    p class="text-sm text-gray-700 dark:text-gray-300"
                    {
                        "Create an account to start tracking a budget."
                    }
                }
            }
        }
    )
}

fn dashboard_view(accounts: &[AccountWithCount], budget: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full lg:max-w-5xl space-y-6"
            {
                (budget)

                section class="space-y-4"
                {
                    header class="flex justify-between flex-wrap items-end"
                    {
                        h2 class="text-lg font-bold" { "Accounts" }

                        a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE)
                        {
                            "Add Account"
                        }
                    }

                    ul class="grid gap-4 sm:grid-cols-2 lg:grid-cols-3"
                    {
                        @for entry in accounts {
                            (account_card(entry))
                        }

                        @if accounts.is_empty() {
                            li class="rounded border border-dashed border-gray-300 bg-white px-4 py-6 text-center text-sm text-gray-500 dark:border-gray-700 dark:bg-gray-800 dark:text-gray-400"
                            {
                                "No accounts found. Create an account "
                                a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE)
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
    );

    base("Dashboard", &[dollar_input_styles()], &content)
}

/// Display a page with the user's accounts and budget progress.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts = list_accounts(user_id, &connection)?;
    let default_account = find_default_account(user_id, &connection)?;
    let today = local_date(&state.local_timezone);

    let status = match &default_account {
        Some(account) => Some(get_current_budget(user_id, account.id, today, &connection)?),
        None => None,
    };

    let budget = budget_section(default_account.as_ref(), status.as_ref());

    Ok(dashboard_view(&accounts, budget).into_response())
}
