use rusqlite::Connection;
use rust_decimal::Decimal;
use time::macros::datetime;

use crate::{
    account::{Account, AccountKind, create_account},
    db::initialize,
    user::{UserId, UserProfile, ensure_user},
};

pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&conn).expect("Could not initialize database.");

    conn
}

pub(crate) fn insert_test_user(connection: &Connection) -> UserId {
    ensure_user(
        &UserProfile {
            external_id: "idp|test-user".to_owned(),
            name: "Test User".to_owned(),
            email: "test@example.com".to_owned(),
            picture: None,
        },
        connection,
    )
    .expect("Could not insert test user")
    .id
}

pub(crate) fn insert_test_account(
    connection: &Connection,
    user_id: UserId,
    balance: Decimal,
) -> Account {
    create_account(
        user_id,
        "Test Account",
        AccountKind::Savings,
        balance,
        true,
        datetime!(2025-01-01 00:00 UTC),
        connection,
    )
    .expect("Could not insert test account")
}
