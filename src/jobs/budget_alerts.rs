//! The periodic job that emails users approaching their monthly budget.

use std::sync::{Arc, Mutex};

use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error,
    account::find_default_account,
    budget::{list_budgets, mark_alert_sent, percent_used, sum_month_expenses},
    email::{Email, Mailer},
    html::format_currency,
    money::to_float,
    timezone::local_now,
    user::get_user_by_id,
};

/// The budget usage percentage at which an alert email is sent.
const ALERT_THRESHOLD_PERCENT: u32 = 80;

/// A budget that crossed the alert threshold and is due an email.
#[derive(Debug, Clone, PartialEq)]
struct AlertCandidate {
    budget_id: i64,
    email: String,
    username: String,
    account_name: String,
    percent_used: Decimal,
    budget_amount: Decimal,
    total_expenses: Decimal,
}

/// Whether `now` falls in a different calendar month than `last`.
fn is_new_month(last: OffsetDateTime, now: OffsetDateTime) -> bool {
    last.month() != now.month() || last.year() != now.year()
}

fn budget_alert_email_body(candidate: &AlertCandidate) -> Markup {
    html!(
        div
        {
            p { "Hi " (candidate.username) "," }

            p
            {
                "You have used "
                strong { (format!("{:.1}%", to_float(candidate.percent_used))) }
                " of the "
                (format_currency(to_float(candidate.budget_amount)))
                " monthly budget for your account "
                strong { (candidate.account_name) }
                "."
            }

            p
            {
                "Total spent so far this month: "
                (format_currency(to_float(candidate.total_expenses)))
                "."
            }

            p { "Consider reviewing your spending for the rest of the month." }
        }
    )
}

fn collect_alert_candidates(
    connection: &Connection,
    now: OffsetDateTime,
) -> Result<Vec<AlertCandidate>, Error> {
    let mut candidates = Vec::new();

    for budget in list_budgets(connection)? {
        let Some(account) = find_default_account(budget.user_id, connection)? else {
            continue;
        };

        let total_expenses =
            sum_month_expenses(budget.user_id, account.id, now.date(), connection)?;
        let Some(percent) = percent_used(total_expenses, budget.amount) else {
            continue;
        };

        let already_alerted_this_month = budget
            .last_alert_sent
            .is_some_and(|last| !is_new_month(last, now));

        if percent >= Decimal::from(ALERT_THRESHOLD_PERCENT) && !already_alerted_this_month {
            let user = get_user_by_id(budget.user_id, connection)?;

            candidates.push(AlertCandidate {
                budget_id: budget.id,
                email: user.email,
                username: user.name,
                account_name: account.name,
                percent_used: percent,
                budget_amount: budget.amount,
                total_expenses,
            });
        }
    }

    Ok(candidates)
}

/// Check every budget once and email the users whose monthly spend has
/// crossed the alert threshold.
///
/// At most one alert is sent per user per calendar month: the alert marker is
/// stamped after a successful send, and budgets whose marker is from the
/// current month are skipped. Delivery failures are logged, not retried, and
/// leave the marker untouched so the next run tries again.
///
/// Returns the number of alerts sent.
///
/// # Errors
/// Returns an error if the database cannot be read. Per-budget email
/// failures do not abort the sweep.
pub async fn check_budget_alerts<M: Mailer>(
    db_connection: &Arc<Mutex<Connection>>,
    mailer: &M,
    now: OffsetDateTime,
) -> Result<usize, Error> {
    // Collect with the lock held, then send without it so slow deliveries do
    // not block request handlers.
    let candidates = {
        let connection = db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        collect_alert_candidates(&connection, now)?
    };

    let mut sent = 0;

    for candidate in candidates {
        let email = Email {
            to: candidate.email.clone(),
            subject: format!("Budget alert for {}", candidate.account_name),
            html: budget_alert_email_body(&candidate).into_string(),
        };

        match mailer.send(&email).await {
            Ok(()) => {
                let connection = db_connection
                    .lock()
                    .map_err(|_| Error::DatabaseLockError)?;
                mark_alert_sent(candidate.budget_id, now, &connection)?;
                sent += 1;
            }
            Err(error) => {
                tracing::error!(
                    "could not send budget alert to {}: {error}",
                    candidate.email
                );
            }
        }
    }

    Ok(sent)
}

/// Run the budget alert check on a fixed period, e.g. every 6 hours.
pub async fn run_budget_alert_job<M: Mailer>(
    db_connection: Arc<Mutex<Connection>>,
    mailer: M,
    local_timezone: String,
    period: std::time::Duration,
) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let now = local_now(&local_timezone);
        match check_budget_alerts(&db_connection, &mailer, now).await {
            Ok(sent) if sent > 0 => tracing::info!("budget alert job sent {sent} alerts"),
            Ok(_) => {}
            Err(error) => tracing::error!("budget alert job failed: {error}"),
        }
    }
}
