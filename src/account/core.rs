use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, money::map_decimal, user::UserId};

pub type AccountId = DatabaseId;

/// Whether an account is a savings or an everyday (current) account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    Savings,
    Current,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Savings => "SAVINGS",
            AccountKind::Current => "CURRENT",
        }
    }

    pub fn from_str(text: &str) -> Option<Self> {
        match text {
            "SAVINGS" => Some(AccountKind::Savings),
            "CURRENT" => Some(AccountKind::Current),
            _ => None,
        }
    }
}

/// A bank account or credit card belonging to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserId,
    /// The display name of the account.
    pub name: String,
    /// Whether this is a savings or current account.
    pub kind: AccountKind,
    /// The running balance: the sum of signed transaction amounts applied to
    /// the opening balance.
    pub balance: Decimal,
    /// Whether this is the account pre-selected for new transactions and
    /// budget tracking.
    pub is_default: bool,
    /// When the account was created.
    pub created_at: OffsetDateTime,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            balance TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &rusqlite::Row) -> Result<Account, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let kind = AccountKind::from_str(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown account kind {kind}").into(),
        )
    })?;

    Ok(Account {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        kind,
        balance: map_decimal(row, 4)?,
        is_default: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, user_id, name, kind, balance, is_default, created_at";

/// An account along with the number of transactions recorded against it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountWithCount {
    pub account: Account,
    pub transaction_count: i64,
}

/// Get all accounts belonging to `user_id`, newest first, each annotated with
/// its transaction count.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn list_accounts(user_id: UserId, connection: &Connection) -> Result<Vec<AccountWithCount>, Error> {
    connection
        .prepare(
            "SELECT a.id, a.user_id, a.name, a.kind, a.balance, a.is_default, a.created_at,
                (SELECT COUNT(t.id) FROM \"transaction\" t WHERE t.account_id = a.id) AS transaction_count
             FROM account a
             WHERE a.user_id = :user_id
             ORDER BY a.created_at DESC, a.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(AccountWithCount {
                account: map_row_to_account(row)?,
                transaction_count: row.get(7)?,
            })
        })?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// Get the account with `account_id`, checking that it belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &account_id), (":user_id", &user_id.as_i64())],
            map_row_to_account,
        )
        .map_err(|error| error.into())
}

/// Get the user's default account, if they have one.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn find_default_account(
    user_id: UserId,
    connection: &Connection,
) -> Result<Option<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = :user_id AND is_default = 1"
        ))?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_account)
        .optional()
        .map_err(|error| error.into())
}

/// Create an account for `user_id`.
///
/// A user's first account always becomes the default. Creating a new default
/// account clears the flag on every other account, so that at most one
/// account is the default. Both writes happen in one atomic unit.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn create_account(
    user_id: UserId,
    name: &str,
    kind: AccountKind,
    balance: Decimal,
    is_default: bool,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Account, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let account_count: i64 = sql_transaction.query_row(
        "SELECT COUNT(id) FROM account WHERE user_id = :user_id",
        &[(":user_id", &user_id.as_i64())],
        |row| row.get(0),
    )?;
    let is_default = is_default || account_count == 0;

    if is_default {
        sql_transaction.execute(
            "UPDATE account SET is_default = 0 WHERE user_id = :user_id",
            &[(":user_id", &user_id.as_i64())],
        )?;
    }

    sql_transaction.execute(
        "INSERT INTO account (user_id, name, kind, balance, is_default, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            name,
            kind.as_str(),
            balance.to_string(),
            is_default,
            created_at,
        ),
    )?;

    let id = sql_transaction.last_insert_rowid();

    sql_transaction.commit()?;

    Ok(Account {
        id,
        user_id,
        name: name.to_owned(),
        kind,
        balance,
        is_default,
        created_at,
    })
}

/// Make `account_id` the default account for `user_id`, clearing the flag on
/// every other account, in one atomic unit.
///
/// The target account must belong to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingAccount] if the account does not exist or belongs
///   to another user (no rows are changed in that case),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_default_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let account = match get_account(account_id, user_id, &sql_transaction) {
        Ok(account) => account,
        Err(Error::NotFound) => return Err(Error::UpdateMissingAccount),
        Err(error) => return Err(error),
    };

    sql_transaction.execute(
        "UPDATE account SET is_default = 0 WHERE user_id = :user_id",
        &[(":user_id", &user_id.as_i64())],
    )?;
    sql_transaction.execute(
        "UPDATE account SET is_default = 1 WHERE id = :id",
        &[(":id", &account_id)],
    )?;

    sql_transaction.commit()?;

    Ok(Account {
        is_default: true,
        ..account
    })
}

/// Overwrite the balance of `account_id`.
///
/// This is a low-level helper for the transaction operations: callers are
/// expected to run it inside the same SQL transaction as the row write it
/// belongs to.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub(crate) fn set_account_balance(
    account_id: AccountId,
    balance: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        rusqlite::params![balance.to_string(), account_id],
    )?;

    Ok(())
}


#[cfg(test)]
mod account_core_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::{
        Error,
        account::core::{
            AccountKind, create_account, find_default_account, get_account, list_accounts,
            set_default_account,
        },
        initialize_db,
        test_utils::insert_test_user,
        user::UserId,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();
        conn
    }

    #[test]
    fn first_account_becomes_default() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);

        let account = create_account(
            user_id,
            "Everyday",
            AccountKind::Current,
            dec!(100.00),
            false,
            datetime!(2025-01-01 00:00 UTC),
            &conn,
        )
        .unwrap();

        assert!(account.is_default);
    }

    #[test]
    fn at_most_one_default_account() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);
        let created_at = datetime!(2025-01-01 00:00 UTC);

        let first = create_account(
            user_id,
            "Everyday",
            AccountKind::Current,
            dec!(100.00),
            false,
            created_at,
            &conn,
        )
        .unwrap();
        let second = create_account(
            user_id,
            "Rainy day",
            AccountKind::Savings,
            dec!(2500.00),
            true,
            created_at,
            &conn,
        )
        .unwrap();

        set_default_account(first.id, user_id, &conn).unwrap();
        set_default_account(second.id, user_id, &conn).unwrap();

        let accounts = list_accounts(user_id, &conn).unwrap();
        let default_count = accounts
            .iter()
            .filter(|entry| entry.account.is_default)
            .count();

        assert_eq!(
            default_count, 1,
            "want exactly one default account, got {default_count}"
        );
        assert_eq!(
            find_default_account(user_id, &conn).unwrap().unwrap().id,
            second.id
        );
    }

    #[test]
    fn set_default_rejects_foreign_account() {
        let conn = get_test_connection();
        let owner = insert_test_user(&conn);
        let attacker = UserId::new(owner.as_i64() + 1);
        conn.execute(
            "INSERT INTO user (id, external_id, name, email) VALUES (?1, ?2, ?3, ?4)",
            (attacker.as_i64(), "idp|attacker", "Mallory", "mallory@example.com"),
        )
        .unwrap();
        let account = create_account(
            owner,
            "Everyday",
            AccountKind::Current,
            dec!(100.00),
            true,
            datetime!(2025-01-01 00:00 UTC),
            &conn,
        )
        .unwrap();

        let result = set_default_account(account.id, attacker, &conn);

        assert_eq!(result, Err(Error::UpdateMissingAccount));
        // The owner's default flag must be untouched.
        let account = get_account(account.id, owner, &conn).unwrap();
        assert!(account.is_default);
    }

    #[test]
    fn list_accounts_is_newest_first_and_scoped_to_user() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn);

        let older = create_account(
            user_id,
            "Everyday",
            AccountKind::Current,
            dec!(100.00),
            false,
            datetime!(2025-01-01 00:00 UTC),
            &conn,
        )
        .unwrap();
        let newer = create_account(
            user_id,
            "Rainy day",
            AccountKind::Savings,
            dec!(50.00),
            false,
            datetime!(2025-03-01 00:00 UTC),
            &conn,
        )
        .unwrap();

        let accounts = list_accounts(user_id, &conn).unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].account.id, newer.id);
        assert_eq!(accounts[1].account.id, older.id);
        assert_eq!(accounts[0].transaction_count, 0);
    }

    #[test]
    fn get_account_rejects_foreign_user() {
        let conn = get_test_connection();
        let owner = insert_test_user(&conn);
        let account = create_account(
            owner,
            "Everyday",
            AccountKind::Current,
            dec!(100.00),
            true,
            datetime!(2025-01-01 00:00 UTC),
            &conn,
        )
        .unwrap();

        let result = get_account(account.id, UserId::new(owner.as_i64() + 1), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
