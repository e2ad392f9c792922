use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    database_id::DatabaseId,
    money::map_decimal,
    user::UserId,
};

pub type BudgetId = DatabaseId;

/// A user's monthly spending budget.
///
/// There is at most one budget row per user.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The id for the budget.
    pub id: BudgetId,
    /// The user the budget belongs to.
    pub user_id: UserId,
    /// The monthly spending limit.
    pub amount: Decimal,
    /// When the last budget alert email was sent, if any.
    ///
    /// Only the budget alert job writes this field.
    pub last_alert_sent: Option<OffsetDateTime>,
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE REFERENCES user(id),
            amount TEXT NOT NULL,
            last_alert_sent TEXT
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_budget(row: &rusqlite::Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        amount: map_decimal(row, 2)?,
        last_alert_sent: row.get(3)?,
    })
}

/// The calendar-month window containing `today`: the first of the month
/// (inclusive) through the first of the next month (exclusive).
pub fn month_window(today: Date) -> (Date, Date) {
    let start = Date::from_calendar_date(today.year(), today.month(), 1).unwrap_or(today);

    let (next_year, next_month) = match today.month() {
        Month::December => (today.year() + 1, Month::January),
        month => (today.year(), month.next()),
    };
    let end = Date::from_calendar_date(next_year, next_month, 1).unwrap_or(start);

    (start, end)
}

/// Sum the EXPENSE transactions for one account inside the calendar month
/// containing `today`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn sum_month_expenses(
    user_id: UserId,
    account_id: AccountId,
    today: Date,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let (start, end) = month_window(today);

    let amounts: Vec<Decimal> = connection
        .prepare(
            "SELECT amount FROM \"transaction\"
             WHERE user_id = ?1 AND account_id = ?2 AND kind = 'EXPENSE'
                AND date >= ?3 AND date < ?4",
        )?
        .query_map(
            params![user_id.as_i64(), account_id, start, end],
            |row| map_decimal(row, 0),
        )?
        .collect::<Result<_, _>>()?;

    Ok(amounts.iter().sum())
}

/// Get the budget row for `user_id`, if one has been set.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_budget(user_id: UserId, connection: &Connection) -> Result<Option<Budget>, Error> {
    connection
        .prepare("SELECT id, user_id, amount, last_alert_sent FROM budget WHERE user_id = :user_id")?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_budget)
        .optional()
        .map_err(|error| error.into())
}

/// The budget row (if any) together with the month-to-date expense total.
///
/// The expense total is computed whether or not a budget has been set.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub budget: Option<Budget>,
    pub current_expenses: Decimal,
}

impl BudgetStatus {
    /// Percentage of the budget spent this month, or `None` when no budget is
    /// set or the budget amount is not positive.
    pub fn percent_used(&self) -> Option<Decimal> {
        let budget = self.budget.as_ref()?;

        percent_used(self.current_expenses, budget.amount)
    }
}

/// Percentage of `budget` consumed by `expenses`, or `None` when the budget
/// amount is not positive.
pub fn percent_used(expenses: Decimal, budget: Decimal) -> Option<Decimal> {
    if budget <= Decimal::ZERO {
        return None;
    }

    Some(expenses * Decimal::ONE_HUNDRED / budget)
}

/// Get the current budget and the month-to-date expenses for `account_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_current_budget(
    user_id: UserId,
    account_id: AccountId,
    today: Date,
    connection: &Connection,
) -> Result<BudgetStatus, Error> {
    let budget = get_budget(user_id, connection)?;
    let current_expenses = sum_month_expenses(user_id, account_id, today, connection)?;

    Ok(BudgetStatus {
        budget,
        current_expenses,
    })
}

/// Create the budget row for `user_id`, or update its amount if one exists.
///
/// The alert marker is preserved on update.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn upsert_budget(
    user_id: UserId,
    amount: Decimal,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection.execute(
        "INSERT INTO budget (user_id, amount) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET amount = excluded.amount",
        params![user_id.as_i64(), amount.to_string()],
    )?;

    connection
        .prepare("SELECT id, user_id, amount, last_alert_sent FROM budget WHERE user_id = :user_id")?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_budget)
        .map_err(|error| error.into())
}

/// Get every budget row in the database.
///
/// Used by the budget alert job, which checks all users in one sweep.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn list_budgets(connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare("SELECT id, user_id, amount, last_alert_sent FROM budget ORDER BY id ASC")?
        .query_map([], map_row_to_budget)?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// Stamp the time the last alert email was sent for `budget_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn mark_alert_sent(
    budget_id: BudgetId,
    sent_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE budget SET last_alert_sent = ?1 WHERE id = ?2",
        params![sent_at, budget_id],
    )?;

    Ok(())
}



#[cfg(test)]
mod budget_tests {
    use rust_decimal_macros::dec;
    use time::macros::{date, datetime};

    use crate::{
        budget::core::{
            get_budget, get_current_budget, list_budgets, mark_alert_sent, percent_used,
            upsert_budget,
        },
        test_utils::{get_test_connection, insert_test_account, insert_test_user},
        transaction::{NewTransaction, TransactionKind, create_transaction},
        user::UserId,
    };

    fn insert_transaction(
        conn: &rusqlite::Connection,
        user_id: UserId,
        account_id: i64,
        kind: TransactionKind,
        amount: rust_decimal::Decimal,
        date: time::Date,
    ) {
        create_transaction(
            NewTransaction {
                user_id,
                account_id,
                kind,
                amount,
                date,
                category: "groceries".to_owned(),
                description: "Test".to_owned(),
                receipt_url: None,
                is_recurring: false,
                recurring_interval: None,
                created_at: datetime!(2025-06-01 00:00 UTC),
            },
            conn,
        )
        .unwrap();
    }

    #[test]
    fn upsert_creates_then_updates_single_row() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);

        let created = upsert_budget(user_id, dec!(500.00), &conn).unwrap();
        mark_alert_sent(created.id, datetime!(2025-06-02 08:00 UTC), &conn).unwrap();
        let updated = upsert_budget(user_id, dec!(750.00), &conn).unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.amount, dec!(750.00));
        // The alert marker belongs to the alert job and survives re-setting
        // the budget amount.
        assert_eq!(
            updated.last_alert_sent,
            Some(datetime!(2025-06-02 08:00 UTC))
        );
        assert_eq!(list_budgets(&conn).unwrap().len(), 1);
    }

    #[test]
    fn get_budget_returns_none_before_first_set() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);

        assert_eq!(get_budget(user_id, &conn), Ok(None));
    }

    #[test]
    fn current_budget_sums_only_month_expenses_for_account() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));
        let today = date!(2025 - 06 - 15);

        upsert_budget(user_id, dec!(500.00), &conn).unwrap();
        insert_transaction(
            &conn,
            user_id,
            account.id,
            TransactionKind::Expense,
            dec!(300.00),
            date!(2025 - 06 - 03),
        );
        insert_transaction(
            &conn,
            user_id,
            account.id,
            TransactionKind::Expense,
            dec!(110.00),
            date!(2025 - 06 - 28),
        );
        // Income and out-of-month expenses must not count.
        insert_transaction(
            &conn,
            user_id,
            account.id,
            TransactionKind::Income,
            dec!(50.00),
            date!(2025 - 06 - 10),
        );
        insert_transaction(
            &conn,
            user_id,
            account.id,
            TransactionKind::Expense,
            dec!(75.00),
            date!(2025 - 05 - 31),
        );

        let status = get_current_budget(user_id, account.id, today, &conn).unwrap();

        assert_eq!(status.budget.as_ref().unwrap().amount, dec!(500.00));
        assert_eq!(status.current_expenses, dec!(410.00));
        // 410 / 500 = 82%, which should trip the alert job's 80% threshold.
        let percent = status.percent_used().unwrap();
        assert_eq!(percent, dec!(82));
        assert!(percent >= dec!(80));
    }

    #[test]
    fn expenses_computed_without_budget_row() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let account = insert_test_account(&conn, user_id, dec!(1000.00));

        insert_transaction(
            &conn,
            user_id,
            account.id,
            TransactionKind::Expense,
            dec!(20.00),
            date!(2025 - 06 - 10),
        );

        let status = get_current_budget(user_id, account.id, date!(2025 - 06 - 15), &conn).unwrap();

        assert_eq!(status.budget, None);
        assert_eq!(status.current_expenses, dec!(20.00));
        assert_eq!(status.percent_used(), None);
    }

    #[test]
    fn percent_used_guards_zero_budget() {
        assert_eq!(percent_used(dec!(10.00), dec!(0.00)), None);
        assert_eq!(percent_used(dec!(41.00), dec!(50.00)), Some(dec!(82)));
    }
}
