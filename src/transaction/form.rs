//! The shared transaction form partial.
//!
//! The same fragment backs the new-transaction page, the edit page, and the
//! receipt scanner, which replaces the form with a pre-filled copy via htmx.

use maud::{Markup, html};
use time::Date;

use crate::{
    account::Account,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE,
        FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
    },
    transaction::{
        categories::categories_for,
        core::{RecurringInterval, TransactionId, TransactionKind},
    },
};

/// Parse an amount entered in a form into a non-negative decimal.
///
/// # Errors
/// Returns [Error](crate::Error::InvalidAmount) if the text is not a number
/// or is negative. The sign of a transaction comes from its kind, never from
/// the amount.
pub fn parse_amount(text: &str) -> Result<rust_decimal::Decimal, crate::Error> {
    let amount: rust_decimal::Decimal = text
        .trim()
        .parse()
        .map_err(|_| crate::Error::InvalidAmount(text.to_owned()))?;

    if amount.is_sign_negative() {
        return Err(crate::Error::InvalidAmount(text.to_owned()));
    }

    Ok(amount)
}

/// Parse the recurring interval select value, where the empty string means
/// "not recurring".
pub fn parse_interval(text: &str) -> Option<RecurringInterval> {
    RecurringInterval::from_str(text)
}

/// Where the transaction form submits to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionFormAction {
    /// POST a new transaction.
    Create,
    /// PUT an update to an existing transaction.
    Update(TransactionId),
}

/// The values the transaction form is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFormValues {
    pub kind: TransactionKind,
    /// The amount as entered or extracted, kept as text for re-display.
    pub amount: String,
    pub date: Date,
    pub category: String,
    pub description: String,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
}

impl TransactionFormValues {
    /// An empty expense dated `today`.
    pub fn empty(today: Date) -> Self {
        Self {
            kind: TransactionKind::Expense,
            amount: String::new(),
            date: today,
            category: String::new(),
            description: String::new(),
            is_recurring: false,
            recurring_interval: None,
        }
    }
}

fn kind_radio(kind: TransactionKind, checked: bool) -> Markup {
    let id = format!("kind-{}", kind.as_str().to_lowercase());
    let label = match kind {
        TransactionKind::Expense => "Expense",
        TransactionKind::Income => "Income",
    };

    html!(
        div class="flex items-center gap-2"
        {
            input
                type="radio"
                name="kind"
                id=(id)
                value=(kind.as_str())
                class=(FORM_RADIO_INPUT_STYLE)
                checked[checked];

            label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (label) }
        }
    )
}

fn category_options(selected: &str) -> Markup {
    html!(
        optgroup label="Expenses"
        {
            @for category in categories_for(TransactionKind::Expense) {
                option value=(category.id) selected[category.id == selected] { (category.name) }
            }
        }

        optgroup label="Income"
        {
            @for category in categories_for(TransactionKind::Income) {
                option value=(category.id) selected[category.id == selected] { (category.name) }
            }
        }
    )
}

/// Render the transaction form.
///
/// On create, `accounts` fills the account selector and `selected_account`
/// pre-selects one. On update the owning account cannot change, so the
/// selector is omitted.
pub fn transaction_form(
    action: TransactionFormAction,
    values: &TransactionFormValues,
    accounts: &[Account],
    selected_account: Option<i64>,
) -> Markup {
    let submit_label = match action {
        TransactionFormAction::Create => "Add Transaction",
        TransactionFormAction::Update(_) => "Save Transaction",
    };

    let fields = html!(
            @if let TransactionFormAction::Create = action {
                div
                {
                    label for="account_id" class=(FORM_LABEL_STYLE) { "Account" }

                    select name="account_id" id="account_id" class=(FORM_TEXT_INPUT_STYLE) required
                    {
                        @for account in accounts {
                            option
                                value=(account.id)
                                selected[selected_account == Some(account.id)]
                            {
                                (account.name)
                            }
                        }
                    }
                }
            }

            fieldset class=(FORM_RADIO_GROUP_STYLE)
            {
                legend class=(FORM_LABEL_STYLE) { "Type" }

                (kind_radio(TransactionKind::Expense, values.kind == TransactionKind::Expense))
                (kind_radio(TransactionKind::Income, values.kind == TransactionKind::Income))
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                div class="input-wrapper w-full"
                {
                    input
                        type="number"
                        name="amount"
                        id="amount"
                        step="0.01"
                        min="0"
                        value=(values.amount)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    type="date"
                    name="date"
                    id="date"
                    value=(values.date)
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    @if values.category.is_empty() {
                        option value="" selected disabled { "Choose a category" }
                    }

                    (category_options(&values.category))
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    type="text"
                    name="description"
                    id="description"
                    value=(values.description)
                    placeholder="What was this for?"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex items-center gap-2"
            {
                input
                    type="checkbox"
                    name="is_recurring"
                    id="is_recurring"
                    value="true"
                    class=(FORM_RADIO_INPUT_STYLE)
                    checked[values.is_recurring];

                label for="is_recurring" class=(FORM_LABEL_STYLE) { "Recurring transaction" }
            }

            div
            {
                label for="recurring_interval" class=(FORM_LABEL_STYLE) { "Repeats" }

                select name="recurring_interval" id="recurring_interval" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[values.recurring_interval.is_none()] { "Not recurring" }

                    @for interval in RecurringInterval::ALL {
                        option
                            value=(interval.as_str())
                            selected[values.recurring_interval == Some(interval)]
                        {
                            (interval.label())
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_label) }
    );

    match action {
        TransactionFormAction::Create => html!(
            form
                id="transaction-form"
                class="space-y-4 w-full max-w-md"
                hx-target-error="#alert-container"
                hx-post=(endpoints::TRANSACTIONS_API)
            {
                (fields)
            }
        ),
        TransactionFormAction::Update(transaction_id) => html!(
            form
                id="transaction-form"
                class="space-y-4 w-full max-w-md"
                hx-target-error="#alert-container"
                hx-put=(format_endpoint(endpoints::TRANSACTION_API, transaction_id))
            {
                (fields)
            }
        ),
    }
}
