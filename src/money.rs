//! Helpers for exact decimal money values.
//!
//! Monetary amounts are stored in SQLite as TEXT in the decimal's canonical
//! string form and only converted to floating point at the presentation
//! boundary.

use rusqlite::{Row, types::Type};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Convert an exact decimal amount to a float for display or JSON transport.
///
/// Amounts within the range of real-world money always fit in an `f64`.
pub fn to_float(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

/// Read a decimal amount from a TEXT column.
///
/// # Errors
/// Returns a conversion error if the column does not hold a valid decimal
/// string.
pub fn map_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    text.parse::<Decimal>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into()))
}

#[cfg(test)]
mod money_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use super::{map_decimal, to_float};

    #[test]
    fn to_float_keeps_cents() {
        assert_eq!(to_float(dec!(850.00)), 850.0);
        assert_eq!(to_float(dec!(-0.01)), -0.01);
    }

    #[test]
    fn map_decimal_round_trips_text_column() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        connection
            .execute("CREATE TABLE sample (amount TEXT NOT NULL)", ())
            .unwrap();
        connection
            .execute(
                "INSERT INTO sample (amount) VALUES (?1)",
                [dec!(1234.56).to_string()],
            )
            .unwrap();

        let amount = connection
            .query_one("SELECT amount FROM sample", [], |row| map_decimal(row, 0))
            .unwrap();

        assert_eq!(amount, dec!(1234.56));
    }

    #[test]
    fn map_decimal_rejects_garbage() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        connection
            .execute("CREATE TABLE sample (amount TEXT NOT NULL)", ())
            .unwrap();
        connection
            .execute("INSERT INTO sample (amount) VALUES ('not money')", ())
            .unwrap();

        let result = connection.query_one("SELECT amount FROM sample", [], |row| {
            super::map_decimal(row, 0)
        });

        assert!(result.is_err());
    }
}
