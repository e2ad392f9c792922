//! The jobs that materialize recurring transactions.
//!
//! A daily trigger finds due recurring transactions and emits one event per
//! transaction into an in-process queue. A processor drains the queue,
//! throttled per user, and materializes each occurrence. Both sides re-check
//! state before mutating, so duplicate or stale events are harmless.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use time::{Date, Duration, OffsetDateTime};
use tokio::sync::mpsc;

use crate::{
    Error,
    account::{get_account, set_account_balance},
    timezone::local_now,
    transaction::{TransactionId, TransactionStatus, get_transaction, next_occurrence},
    user::UserId,
};

/// One due recurring transaction, queued for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringEvent {
    /// The recurring transaction to materialize.
    pub transaction_id: TransactionId,
    /// The user that owns it.
    pub user_id: UserId,
}

/// Find the recurring transactions that are due on `today`.
///
/// A transaction is due when it is recurring, COMPLETED, and either has never
/// been processed or its next recurring date has arrived.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn find_due_recurring(
    connection: &Connection,
    today: Date,
) -> Result<Vec<RecurringEvent>, Error> {
    connection
        .prepare(
            "SELECT id, user_id FROM \"transaction\"
             WHERE is_recurring = 1 AND status = 'COMPLETED'
                AND (last_processed IS NULL OR next_recurring_date <= ?1)",
        )?
        .query_map([today], |row| {
            Ok(RecurringEvent {
                transaction_id: row.get(0)?,
                user_id: UserId::new(row.get(1)?),
            })
        })?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// What happened when an event was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A new occurrence was created and the schedule advanced.
    Materialized(TransactionId),
    /// The transaction no longer exists (deleted since the trigger ran).
    SkippedMissing,
    /// The transaction is not due, e.g. a duplicate or stale event.
    SkippedNotDue,
}

/// Materialize one recurring transaction occurrence.
///
/// Re-checks that the transaction still exists and is still due before doing
/// anything, then creates the concrete occurrence, applies its signed amount
/// to the account balance, and advances the recurrence cursor
/// (`last_processed`, `next_recurring_date`) - all in one atomic unit.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn process_recurring_event(
    event: &RecurringEvent,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<ProcessOutcome, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = match get_transaction(event.transaction_id, event.user_id, &sql_transaction)
    {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Ok(ProcessOutcome::SkippedMissing),
        Err(error) => return Err(error),
    };

    if !transaction.is_recurring
        || transaction.status != TransactionStatus::Completed
        || !transaction.is_recurring_due(now.date())
    {
        return Ok(ProcessOutcome::SkippedNotDue);
    }

    sql_transaction.execute(
        "INSERT INTO \"transaction\" (user_id, account_id, kind, amount, date, category, \
            description, is_recurring, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
        rusqlite::params![
            transaction.user_id.as_i64(),
            transaction.account_id,
            transaction.kind.as_str(),
            transaction.amount.to_string(),
            now.date(),
            transaction.category,
            format!("{} (Recurring)", transaction.description),
            TransactionStatus::Completed.as_str(),
            now,
        ],
    )?;
    let new_id = sql_transaction.last_insert_rowid();

    let account = get_account(transaction.account_id, transaction.user_id, &sql_transaction)?;
    set_account_balance(
        account.id,
        account.balance + transaction.kind.signed_amount(transaction.amount),
        &sql_transaction,
    )?;

    let next_recurring_date = next_occurrence(now.date(), transaction.recurring_interval);
    sql_transaction.execute(
        "UPDATE \"transaction\" SET last_processed = ?1, next_recurring_date = ?2 WHERE id = ?3",
        rusqlite::params![now, next_recurring_date, transaction.id],
    )?;

    sql_transaction.commit()?;

    Ok(ProcessOutcome::Materialized(new_id))
}

/// A sliding-window throttle keyed by user.
///
/// Mirrors the limit a hosted job executor would apply: at most `limit`
/// events per user per `period`.
#[derive(Debug)]
pub struct UserThrottle {
    limit: usize,
    period: Duration,
    history: HashMap<UserId, VecDeque<OffsetDateTime>>,
}

impl UserThrottle {
    pub fn new(limit: usize, period: Duration) -> Self {
        Self {
            limit,
            period,
            history: HashMap::new(),
        }
    }

    /// Record an event for `user_id` at `now`, or return how long to wait
    /// before it may run.
    pub fn try_acquire(&mut self, user_id: UserId, now: OffsetDateTime) -> Option<Duration> {
        let history = self.history.entry(user_id).or_default();

        while let Some(&oldest) = history.front() {
            if now - oldest >= self.period {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() < self.limit {
            history.push_back(now);
            return None;
        }

        history.front().map(|&oldest| oldest + self.period - now)
    }
}

/// How many recurring events one user's schedule may process per minute.
const PROCESSOR_THROTTLE_LIMIT: usize = 10;

/// Run the daily trigger: find due recurring transactions and queue one event
/// per transaction.
pub async fn run_recurring_trigger_job(
    db_connection: Arc<Mutex<Connection>>,
    local_timezone: String,
    period: std::time::Duration,
    events: mpsc::Sender<RecurringEvent>,
) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let due = {
            let connection = match db_connection.lock() {
                Ok(connection) => connection,
                Err(error) => {
                    tracing::error!("could not acquire database lock: {error}");
                    continue;
                }
            };

            match find_due_recurring(&connection, local_now(&local_timezone).date()) {
                Ok(due) => due,
                Err(error) => {
                    tracing::error!("recurring trigger failed: {error}");
                    continue;
                }
            }
        };

        if due.is_empty() {
            continue;
        }

        tracing::info!("queueing {} due recurring transactions", due.len());

        for event in due {
            if events.send(event).await.is_err() {
                tracing::error!("recurring event queue closed, stopping trigger");
                return;
            }
        }
    }
}

/// Run the event processor: drain the queue and materialize each occurrence,
/// throttled per user.
pub async fn run_recurring_processor(
    db_connection: Arc<Mutex<Connection>>,
    local_timezone: String,
    mut events: mpsc::Receiver<RecurringEvent>,
) {
    let mut throttle = UserThrottle::new(PROCESSOR_THROTTLE_LIMIT, Duration::minutes(1));

    while let Some(event) = events.recv().await {
        while let Some(wait) = throttle.try_acquire(event.user_id, local_now(&local_timezone)) {
            tokio::time::sleep(wait.unsigned_abs()).await;
        }

        let outcome = {
            let connection = match db_connection.lock() {
                Ok(connection) => connection,
                Err(error) => {
                    tracing::error!("could not acquire database lock: {error}");
                    continue;
                }
            };

            process_recurring_event(&event, local_now(&local_timezone), &connection)
        };

        match outcome {
            Ok(ProcessOutcome::Materialized(id)) => {
                tracing::info!(
                    "materialized recurring transaction {} as {id}",
                    event.transaction_id
                );
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(
                    "could not process recurring transaction {}: {error}",
                    event.transaction_id
                );
            }
        }
    }
}

#[cfg(test)]
mod find_due_recurring_tests {
    use rust_decimal_macros::dec;
    use time::macros::{date, datetime};

    use crate::{
        test_utils::{get_test_connection, insert_test_account, insert_test_user},
        transaction::{
            NewTransaction, RecurringInterval, TransactionKind, create_transaction,
        },
        user::UserId,
    };

    use super::{RecurringEvent, find_due_recurring};

    fn recurring_expense(user_id: UserId, account_id: i64) -> NewTransaction {
        NewTransaction {
            user_id,
            account_id,
            kind: TransactionKind::Expense,
            amount: dec!(15.00),
            date: date!(2025 - 06 - 01),
            category: "bills".to_owned(),
            description: "Streaming".to_owned(),
            receipt_url: None,
            is_recurring: true,
            recurring_interval: Some(RecurringInterval::Monthly),
            created_at: datetime!(2025-06-01 00:00 UTC),
        }
    }

    #[test]
    fn never_processed_transactions_are_due() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(100.00));
        let transaction = create_transaction(recurring_expense(user_id, account.id), &conn).unwrap();

        let due = find_due_recurring(&conn, date!(2025 - 06 - 02)).unwrap();

        assert_eq!(
            due,
            vec![RecurringEvent {
                transaction_id: transaction.id,
                user_id,
            }]
        );
    }

    #[test]
    fn non_recurring_transactions_are_not_due() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(100.00));
        create_transaction(
            NewTransaction {
                is_recurring: false,
                recurring_interval: None,
                ..recurring_expense(user_id, account.id)
            },
            &conn,
        )
        .unwrap();

        let due = find_due_recurring(&conn, date!(2025 - 06 - 02)).unwrap();

        assert!(due.is_empty());
    }

    #[test]
    fn processed_transaction_is_due_again_once_the_next_date_arrives() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(100.00));
        let transaction = create_transaction(recurring_expense(user_id, account.id), &conn).unwrap();

        super::process_recurring_event(
            &super::RecurringEvent {
                transaction_id: transaction.id,
                user_id,
            },
            datetime!(2025-06-02 00:30 UTC),
            &conn,
        )
        .unwrap();

        // Not due the day after processing (next occurrence is 2025-07-02).
        assert!(find_due_recurring(&conn, date!(2025 - 06 - 03)).unwrap().is_empty());
        // Due again when the next occurrence arrives.
        let due = find_due_recurring(&conn, date!(2025 - 07 - 02)).unwrap();
        assert_eq!(due.len(), 1);
    }
}
