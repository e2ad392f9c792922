use std::collections::HashMap;

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, util::days_in_year_month};

use crate::{
    Error,
    account::{AccountId, get_account, set_account_balance},
    database_id::DatabaseId,
    money::map_decimal,
    user::UserId,
};

pub type TransactionId = DatabaseId;

/// Whether a transaction spent or earned money.
///
/// Amounts are stored unsigned; the kind decides the sign when the amount is
/// applied to the account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Income => "INCOME",
        }
    }

    pub fn from_str(text: &str) -> Option<Self> {
        match text {
            "EXPENSE" => Some(TransactionKind::Expense),
            "INCOME" => Some(TransactionKind::Income),
            _ => None,
        }
    }

    /// The amount as it applies to the account balance: positive for income,
    /// negative for expenses.
    pub fn signed_amount(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Expense => -amount,
            TransactionKind::Income => amount,
        }
    }
}

/// How often a recurring transaction repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurringInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringInterval::Daily => "DAILY",
            RecurringInterval::Weekly => "WEEKLY",
            RecurringInterval::Monthly => "MONTHLY",
            RecurringInterval::Yearly => "YEARLY",
        }
    }

    pub fn from_str(text: &str) -> Option<Self> {
        match text {
            "DAILY" => Some(RecurringInterval::Daily),
            "WEEKLY" => Some(RecurringInterval::Weekly),
            "MONTHLY" => Some(RecurringInterval::Monthly),
            "YEARLY" => Some(RecurringInterval::Yearly),
            _ => None,
        }
    }

    /// The interval's human-readable label for form options.
    pub fn label(&self) -> &'static str {
        match self {
            RecurringInterval::Daily => "Daily",
            RecurringInterval::Weekly => "Weekly",
            RecurringInterval::Monthly => "Monthly",
            RecurringInterval::Yearly => "Yearly",
        }
    }

    pub const ALL: [RecurringInterval; 4] = [
        RecurringInterval::Daily,
        RecurringInterval::Weekly,
        RecurringInterval::Monthly,
        RecurringInterval::Yearly,
    ];

    /// Advance `date` by one occurrence of this interval.
    ///
    /// Monthly and yearly advances clamp the day of month to the length of
    /// the target month, so Jan 31 + 1 month lands on the last day of
    /// February.
    pub fn advance(&self, date: Date) -> Date {
        match self {
            RecurringInterval::Daily => date.saturating_add(Duration::days(1)),
            RecurringInterval::Weekly => date.saturating_add(Duration::weeks(1)),
            RecurringInterval::Monthly => {
                let (year, month) = match date.month() {
                    time::Month::December => (date.year() + 1, time::Month::January),
                    month => (date.year(), month.next()),
                };
                let day = date.day().min(days_in_year_month(year, month));

                Date::from_calendar_date(year, month, day).unwrap_or(date)
            }
            RecurringInterval::Yearly => {
                let year = date.year() + 1;
                let day = date.day().min(days_in_year_month(year, date.month()));

                Date::from_calendar_date(year, date.month(), day).unwrap_or(date)
            }
        }
    }
}

/// Compute the next occurrence for a recurring schedule.
///
/// A transaction with no interval keeps its date unchanged.
pub fn next_occurrence(date: Date, interval: Option<RecurringInterval>) -> Date {
    match interval {
        Some(interval) => interval.advance(date),
        None => date,
    }
}

/// The processing state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(text: &str) -> Option<Self> {
        match text {
            "PENDING" => Some(TransactionStatus::Pending),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// An expense or income recorded against one account.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserId,
    /// The account the transaction applies to.
    pub account_id: AccountId,
    /// Whether money was spent or earned.
    pub kind: TransactionKind,
    /// The unsigned amount of money.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// The category the user filed the transaction under.
    pub category: String,
    /// A text description of what the transaction was for.
    pub description: String,
    /// An optional URL to the uploaded receipt image.
    pub receipt_url: Option<String>,
    /// Whether this transaction spawns a new occurrence on a schedule.
    pub is_recurring: bool,
    /// How often the transaction repeats, when recurring.
    pub recurring_interval: Option<RecurringInterval>,
    /// When the next occurrence is due, when recurring.
    pub next_recurring_date: Option<Date>,
    /// When the recurring schedule last materialized an occurrence.
    pub last_processed: Option<OffsetDateTime>,
    /// The processing state of the transaction.
    pub status: TransactionStatus,
    /// When the transaction row was created.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Whether a recurring transaction is due to be materialized.
    ///
    /// A schedule that has never been processed is always due; otherwise the
    /// next recurring date must have arrived.
    pub fn is_recurring_due(&self, today: Date) -> bool {
        match self.last_processed {
            None => true,
            Some(_) => self
                .next_recurring_date
                .is_some_and(|next| next <= today),
        }
    }
}

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            account_id INTEGER NOT NULL REFERENCES account(id),
            kind TEXT NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            receipt_url TEXT,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            recurring_interval TEXT,
            next_recurring_date TEXT,
            last_processed TEXT,
            status TEXT NOT NULL DEFAULT 'COMPLETED',
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, kind, amount, date, category, \
    description, receipt_url, is_recurring, recurring_interval, next_recurring_date, \
    last_processed, status, created_at";

pub fn map_row_to_transaction(row: &rusqlite::Row) -> Result<Transaction, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let kind = TransactionKind::from_str(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown transaction kind {kind}").into(),
        )
    })?;

    let recurring_interval: Option<String> = row.get(10)?;
    let recurring_interval = match recurring_interval {
        Some(text) => Some(RecurringInterval::from_str(&text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                10,
                rusqlite::types::Type::Text,
                format!("unknown recurring interval {text}").into(),
            )
        })?),
        None => None,
    };

    let status: String = row.get(13)?;
    let status = TransactionStatus::from_str(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            13,
            rusqlite::types::Type::Text,
            format!("unknown transaction status {status}").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        account_id: row.get(2)?,
        kind,
        amount: map_decimal(row, 4)?,
        date: row.get(5)?,
        category: row.get(6)?,
        description: row.get(7)?,
        receipt_url: row.get(8)?,
        is_recurring: row.get(9)?,
        recurring_interval,
        next_recurring_date: row.get(11)?,
        last_processed: row.get(12)?,
        status,
        created_at: row.get(14)?,
    })
}

/// The fields needed to create a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: Date,
    pub category: String,
    pub description: String,
    pub receipt_url: Option<String>,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
    pub created_at: OffsetDateTime,
}

/// Create a new transaction and apply its signed amount to the owning
/// account's balance as one atomic unit.
///
/// Recurring transactions get their next recurring date seeded from the
/// transaction date and interval.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the target account does not exist or belongs to
///   another user,
/// - [Error::MissingRecurringInterval] if the transaction is recurring but no
///   interval was given,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.is_recurring && new_transaction.recurring_interval.is_none() {
        return Err(Error::MissingRecurringInterval);
    }

    let next_recurring_date = if new_transaction.is_recurring {
        Some(next_occurrence(
            new_transaction.date,
            new_transaction.recurring_interval,
        ))
    } else {
        None
    };

    let sql_transaction = connection.unchecked_transaction()?;

    let account = get_account(
        new_transaction.account_id,
        new_transaction.user_id,
        &sql_transaction,
    )?;
    let new_balance =
        account.balance + new_transaction.kind.signed_amount(new_transaction.amount);

    sql_transaction.execute(
        "INSERT INTO \"transaction\" (user_id, account_id, kind, amount, date, category, \
            description, receipt_url, is_recurring, recurring_interval, next_recurring_date, \
            status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            new_transaction.user_id.as_i64(),
            new_transaction.account_id,
            new_transaction.kind.as_str(),
            new_transaction.amount.to_string(),
            new_transaction.date,
            new_transaction.category,
            new_transaction.description,
            new_transaction.receipt_url,
            new_transaction.is_recurring,
            new_transaction.recurring_interval.map(|i| i.as_str()),
            next_recurring_date,
            TransactionStatus::Completed.as_str(),
            new_transaction.created_at,
        ],
    )?;
    let id = sql_transaction.last_insert_rowid();

    set_account_balance(account.id, new_balance, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(Transaction {
        id,
        user_id: new_transaction.user_id,
        account_id: new_transaction.account_id,
        kind: new_transaction.kind,
        amount: new_transaction.amount,
        date: new_transaction.date,
        category: new_transaction.category,
        description: new_transaction.description,
        receipt_url: new_transaction.receipt_url,
        is_recurring: new_transaction.is_recurring,
        recurring_interval: new_transaction.recurring_interval,
        next_recurring_date,
        last_processed: None,
        status: TransactionStatus::Completed,
        created_at: new_transaction.created_at,
    })
}

/// The full field set submitted when editing a transaction.
///
/// The edit form always submits every field, so the recurring schedule is
/// recomputed from what the user actually chose rather than nulled out by a
/// partial patch.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: Date,
    pub category: String,
    pub description: String,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
}

/// Update a transaction, recomputing the account balance by reversing the old
/// signed amount and applying the new one, as one atomic unit.
///
/// The owning account cannot be changed by an update.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if the transaction does not exist or
///   belongs to another user,
/// - [Error::MissingRecurringInterval] if the update is recurring but no
///   interval was given,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if update.is_recurring && update.recurring_interval.is_none() {
        return Err(Error::MissingRecurringInterval);
    }

    let next_recurring_date = if update.is_recurring {
        Some(next_occurrence(update.date, update.recurring_interval))
    } else {
        None
    };

    let sql_transaction = connection.unchecked_transaction()?;

    let existing = match get_transaction(id, user_id, &sql_transaction) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Err(Error::UpdateMissingTransaction),
        Err(error) => return Err(error),
    };
    let account = get_account(existing.account_id, user_id, &sql_transaction)?;

    let new_balance = account.balance - existing.kind.signed_amount(existing.amount)
        + update.kind.signed_amount(update.amount);

    sql_transaction.execute(
        "UPDATE \"transaction\"
         SET kind = ?1, amount = ?2, date = ?3, category = ?4, description = ?5, \
             is_recurring = ?6, recurring_interval = ?7, next_recurring_date = ?8
         WHERE id = ?9",
        params![
            update.kind.as_str(),
            update.amount.to_string(),
            update.date,
            update.category,
            update.description,
            update.is_recurring,
            update.recurring_interval.map(|i| i.as_str()),
            next_recurring_date,
            id,
        ],
    )?;

    set_account_balance(account.id, new_balance, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(Transaction {
        kind: update.kind,
        amount: update.amount,
        date: update.date,
        category: update.category,
        description: update.description,
        is_recurring: update.is_recurring,
        recurring_interval: update.recurring_interval,
        next_recurring_date,
        ..existing
    })
}

/// Delete the given transactions and reverse their signed contribution to
/// each owning account's balance, as one atomic unit.
///
/// Transactions that do not exist or belong to another user are ignored. The
/// reversal is computed once per account, so a batch that spans several
/// accounts adjusts each of them correctly.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransactions] if none of the ids matched a
///   transaction owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transactions(
    ids: &[TransactionId],
    user_id: UserId,
    connection: &Connection,
) -> Result<usize, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let mut reversals: HashMap<AccountId, Decimal> = HashMap::new();
    let mut found_ids = Vec::new();

    for &id in ids {
        let transaction = match get_transaction(id, user_id, &sql_transaction) {
            Ok(transaction) => transaction,
            Err(Error::NotFound) => continue,
            Err(error) => return Err(error),
        };

        *reversals.entry(transaction.account_id).or_default() -=
            transaction.kind.signed_amount(transaction.amount);
        found_ids.push(transaction.id);
    }

    if found_ids.is_empty() {
        return Err(Error::DeleteMissingTransactions);
    }

    for &id in &found_ids {
        sql_transaction.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            params![id, user_id.as_i64()],
        )?;
    }

    for (account_id, reversal) in reversals {
        let account = get_account(account_id, user_id, &sql_transaction)?;
        set_account_balance(account_id, account.balance + reversal, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    Ok(found_ids.len())
}

/// Retrieve a transaction owned by `user_id` from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_row_to_transaction,
        )
        .map_err(|error| error.into())
}

/// Get all transactions for one account, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is a SQL error.
pub fn query_transactions_for_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE account_id = :account_id AND user_id = :user_id
             ORDER BY date DESC, id DESC"
        ))?
        .query_map(
            &[(":account_id", &account_id), (":user_id", &user_id.as_i64())],
            map_row_to_transaction,
        )?
        .map(|result| result.map_err(Error::from))
        .collect()
}


#[cfg(test)]
mod recurrence_tests {
    use time::macros::date;

    use super::{RecurringInterval, next_occurrence};

    #[test]
    fn daily_advances_one_day() {
        assert_eq!(
            RecurringInterval::Daily.advance(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 01)
        );
    }

    #[test]
    fn weekly_advances_seven_days() {
        assert_eq!(
            RecurringInterval::Weekly.advance(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 07)
        );
    }

    #[test]
    fn monthly_clamps_to_month_length() {
        assert_eq!(
            RecurringInterval::Monthly.advance(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 29)
        );
        assert_eq!(
            RecurringInterval::Monthly.advance(date!(2025 - 01 - 31)),
            date!(2025 - 02 - 28)
        );
        assert_eq!(
            RecurringInterval::Monthly.advance(date!(2024 - 12 - 15)),
            date!(2025 - 01 - 15)
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(
            RecurringInterval::Yearly.advance(date!(2024 - 02 - 29)),
            date!(2025 - 02 - 28)
        );
        assert_eq!(
            RecurringInterval::Yearly.advance(date!(2024 - 06 - 15)),
            date!(2025 - 06 - 15)
        );
    }

    #[test]
    fn no_interval_returns_date_unchanged() {
        assert_eq!(next_occurrence(date!(2024 - 01 - 31), None), date!(2024 - 01 - 31));
    }
}
