//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email and password combination that does not
    /// match a registered user.
    ///
    /// This error is returned both for an unknown email and for a wrong
    /// password so that the response does not reveal which one was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request did not carry a valid bearer token.
    ///
    /// A missing header, a malformed token, a bad signature and an expired
    /// token all collapse into this error.
    #[error("not authenticated")]
    Unauthenticated,

    /// The requested record could not be found under the calling user.
    ///
    /// A record owned by another user and a record that does not exist
    /// produce the same error so that the response does not reveal whether
    /// the ID exists.
    #[error("not found or access denied")]
    NotFound,

    /// A required field was missing or empty in the request payload.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The email in a sign-up request does not look like an email address.
    #[error("invalid email format")]
    InvalidEmail,

    /// An empty string was used as a category name.
    #[error("category name is required")]
    EmptyCategoryName,

    /// A negative amount was used to create or update a transaction.
    #[error("amount must not be negative")]
    NegativeAmount,

    /// The category ID on a transaction does not refer to a category owned
    /// by the calling user.
    ///
    /// A category owned by another user and a nonexistent category ID
    /// produce the same error.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory,

    /// The email in a sign-up request is already registered.
    #[error("email already in use")]
    DuplicateEmail,

    /// The category is still referenced by one or more transactions and
    /// cannot be deleted.
    #[error("cannot delete: referenced by transactions")]
    CategoryInUse,

    /// A query was given an invalid foreign key.
    ///
    /// Call sites should map this to a domain error before it reaches the
    /// client, e.g. [Error::InvalidCategory] or [Error::CategoryInUse].
    #[error("a query was given an invalid foreign key")]
    InvalidForeignKey,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server,
    /// never sent to the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The authentication token could not be signed.
    #[error("could not create the authentication token: {0}")]
    TokenCreation(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 787 =>
            {
                Error::InvalidForeignKey
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            Error::InvalidCredentials | Error::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::MissingField(_)
            | Error::InvalidEmail
            | Error::EmptyCategoryName
            | Error::NegativeAmount
            | Error::InvalidCategory => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Error::DuplicateEmail | Error::CategoryInUse => {
                (StatusCode::CONFLICT, self.to_string())
            }
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status_code, Json(json!({ "error": error_message }))).into_response()
    }
}
