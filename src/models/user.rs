//! This file defines a user of the application and its supporting types.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow},
    models::PasswordHash,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors and more flexible generics that can have
/// distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying integer ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// A user is created once at sign-up and is immutable thereafter. Every
/// category and transaction is owned by exactly one user.
///
/// To create a `User`, insert a [NewUser] into the database. To retrieve an
/// existing user, see [User::select_by_email] and [User::select_by_id].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserID,
    name: String,
    email: EmailAddress,
    password_hash: PasswordHash,
    created_at: OffsetDateTime,
}

impl User {
    /// The user's ID in the database.
    pub fn id(&self) -> UserID {
        self.id
    }

    /// The display name the user registered with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email address associated with the user.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// The user's password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// When the user signed up.
    pub fn created_at(&self) -> &OffsetDateTime {
        &self.created_at
    }

    /// Get the user from the database that has the specified `email` address.
    ///
    /// The email is taken as a plain string so that a malformed email behaves
    /// exactly like an unknown one: both produce [Error::NotFound], which the
    /// log-in handler maps to a uniform "invalid credentials" response.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if there is no user with
    /// the given email, or [Error::SqlError] if there is some other SQL error.
    pub fn select_by_email(email: &str, connection: &Connection) -> Result<Self, Error> {
        let user = connection
            .prepare(
                "SELECT id, name, email, password, created_at FROM user WHERE email = :email",
            )?
            .query_row(&[(":email", &email)], User::map_row)?;

        Ok(user)
    }

    /// Get the user from the database that has the specified `id`.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if there is no user with
    /// the given ID, or [Error::SqlError] if there is some other SQL error.
    pub fn select_by_id(id: UserID, connection: &Connection) -> Result<Self, Error> {
        let user = connection
            .prepare("SELECT id, name, email, password, created_at FROM user WHERE id = :id")?
            .query_row(&[(":id", &id.as_i64())], User::map_row)?;

        Ok(user)
    }
}

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = UserID::new(row.get(offset)?);
        let name = row.get(offset + 1)?;

        let raw_email: String = row.get(offset + 2)?;
        let email = EmailAddress::new_unchecked(raw_email);

        let raw_password_hash: String = row.get(offset + 3)?;
        let password_hash = PasswordHash::new_unchecked(&raw_password_hash);

        let created_at = row.get(offset + 4)?;

        Ok(Self {
            id,
            name,
            email,
            password_hash,
            created_at,
        })
    }
}

/// The data needed to insert a new user into the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The display name the user registered with.
    pub name: String,
    /// The email address to associate with the user. Must be unique.
    pub email: EmailAddress,
    /// The hash of the user's password.
    pub password_hash: PasswordHash,
}

impl Insert for NewUser {
    type ResultType = User;

    /// Create a new user in the database.
    ///
    /// The creation timestamp is set to the current time.
    ///
    /// # Errors
    /// This function will return [Error::DuplicateEmail] if the email is
    /// already registered, or [Error::SqlError] if there is some other SQL
    /// error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        let created_at = OffsetDateTime::now_utc();

        connection.execute(
            "INSERT INTO user (name, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
            (
                &self.name,
                &self.email.to_string(),
                self.password_hash.as_ref(),
                &created_at,
            ),
        )?;

        let id = UserID::new(connection.last_insert_rowid());

        Ok(User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at,
        })
    }
}
