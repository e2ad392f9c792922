//! Code for creating the user table and mapping external identities to local
//! user rows.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Each row maps 1:1 to a stable identifier issued by the external identity
/// provider.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The stable identifier issued by the identity provider.
    pub external_id: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// An optional URL to the user's avatar.
    pub picture: Option<String>,
}

/// The identity fields supplied by the identity provider on sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// The stable identifier issued by the identity provider.
    pub external_id: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// An optional URL to the user's avatar.
    pub picture: Option<String>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                picture TEXT
                )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        external_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        picture: row.get(4)?,
    })
}

/// Get the local user row for an external identity, creating it on first
/// sight.
///
/// The profile fields are only copied in when the row is created; later
/// sign-ins return the stored row untouched.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn ensure_user(profile: &UserProfile, connection: &Connection) -> Result<User, Error> {
    match get_user_by_external_id(&profile.external_id, connection) {
        Ok(user) => return Ok(user),
        Err(Error::NotFound) => {}
        Err(error) => return Err(error),
    }

    connection.execute(
        "INSERT INTO user (external_id, name, email, picture) VALUES (?1, ?2, ?3, ?4)",
        (
            &profile.external_id,
            &profile.name,
            &profile.email,
            &profile.picture,
        ),
    )?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        external_id: profile.external_id.clone(),
        name: profile.name.clone(),
        email: profile.email.clone(),
        picture: profile.picture.clone(),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a known user.
/// - there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, external_id, name, email, picture FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user whose identity-provider identifier equals `external_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `external_id` has not been seen before.
/// - there was an error trying to access the database.
pub fn get_user_by_external_id(external_id: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, external_id, name, email, picture FROM user WHERE external_id = :external_id")?
        .query_row(&[(":external_id", external_id)], map_row_to_user)
        .map_err(|error| error.into())
}
