//! Response handlers for creating, listing, updating and deleting
//! transactions.
//!
//! Every handler takes the caller's identity from a bearer token and only
//! ever touches transactions owned by that user.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::Claims,
    db::Insert,
    models::{Category, DatabaseID, NewTransaction, Transaction, TransactionChanges, TransactionType},
    routes::category::CategoryResponse,
};

/// The public view of a transaction, as returned by the API.
///
/// The category is embedded rather than referenced by ID, so that clients do
/// not need a second request to display it. A transaction without a category
/// has `"category": null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionResponse {
    /// The transaction's ID.
    pub id: DatabaseID,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Whether the transaction was income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// When the transaction happened, in RFC 3339 format.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// The category the transaction is filed under, if any.
    pub category: Option<CategoryResponse>,
}

impl From<&(Transaction, Option<Category>)> for TransactionResponse {
    fn from((transaction, category): &(Transaction, Option<Category>)) -> Self {
        Self {
            id: transaction.id(),
            description: transaction.description().to_string(),
            amount: transaction.amount(),
            transaction_type: transaction.transaction_type(),
            date: *transaction.date(),
            category: category.as_ref().map(CategoryResponse::from),
        }
    }
}

/// The data sent by the client to create a transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// The amount of money spent or earned. Must not be negative.
    pub amount: f64,
    /// Whether the transaction was income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// When the transaction happened, in RFC 3339 format. Defaults to the
    /// time the request is handled.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// The category to file the transaction under, if any.
    pub category_id: Option<DatabaseID>,
}

/// The data sent by the client to update a transaction.
///
/// Fields left out are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionForm {
    /// A new description for the transaction.
    pub description: Option<String>,
    /// A new amount for the transaction. Must not be negative.
    pub amount: Option<f64>,
    /// A new type for the transaction.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// A new date for the transaction, in RFC 3339 format.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// A new category for the transaction.
    pub category_id: Option<DatabaseID>,
}

/// Handler for listing the caller's transactions, most recent first.
pub async fn get_transactions(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionResponse>>, Error> {
    let connection = state.db_connection()?;
    let transactions = Transaction::select_by_user(claims.user_id(), &connection)?;

    Ok(Json(
        transactions.iter().map(TransactionResponse::from).collect(),
    ))
}

/// Handler for creating a transaction owned by the caller.
///
/// # Errors
///
/// This function will return:
/// - [Error::MissingField] if the description is missing or empty,
/// - [Error::NegativeAmount] if the amount is negative,
/// - [Error::InvalidCategory] if a category ID is given that does not refer
///   to a category owned by the caller.
pub async fn create_transaction(
    claims: Claims,
    State(state): State<AppState>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<TransactionResponse>), Error> {
    if form.description.is_empty() {
        return Err(Error::MissingField("description"));
    }

    let new_transaction = NewTransaction::new(
        form.description,
        form.amount,
        form.transaction_type,
        form.date.unwrap_or_else(OffsetDateTime::now_utc),
        form.category_id,
        claims.user_id(),
    )?;

    let connection = state.db_connection()?;
    let row = new_transaction.insert(&connection)?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from(&row)),
    ))
}

/// Handler for updating one of the caller's transactions.
///
/// # Errors
///
/// This function will return:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - [Error::NegativeAmount] if a negative amount is supplied,
/// - [Error::InvalidCategory] if a category ID is supplied that does not
///   refer to a category owned by the caller.
pub async fn update_transaction(
    claims: Claims,
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseID>,
    Json(form): Json<UpdateTransactionForm>,
) -> Result<Json<TransactionResponse>, Error> {
    let connection = state.db_connection()?;
    let row = Transaction::update(
        transaction_id,
        claims.user_id(),
        TransactionChanges {
            description: form.description,
            amount: form.amount,
            transaction_type: form.transaction_type,
            date: form.date,
            category_id: form.category_id,
        },
        &connection,
    )?;

    Ok(Json(TransactionResponse::from(&row)))
}

/// Handler for deleting one of the caller's transactions.
///
/// The deleted transaction is echoed back so that the client can show what
/// was removed.
///
/// # Errors
///
/// This function will return [Error::NotFound] if the transaction does not
/// exist or belongs to another user.
pub async fn delete_transaction(
    claims: Claims,
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<TransactionResponse>, Error> {
    let connection = state.db_connection()?;
    let row = Transaction::delete(transaction_id, claims.user_id(), &connection)?;

    Ok(Json(TransactionResponse::from(&row)))
}
