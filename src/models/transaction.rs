//! This file defines the type `Transaction`, the core type of the
//! record-keeping part of the application, along with the types needed to
//! create and modify transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow},
    models::{Category, DatabaseID, UserID},
};

/// Whether a transaction added money to the user's pocket or took it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money received, e.g., wages.
    Income,
    /// Money spent, e.g., groceries.
    Expense,
}

impl TransactionType {
    /// The canonical string form, as stored in the database and sent over
    /// the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(format!("{other:?} is not a valid transaction type")),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Every transaction is owned by exactly one user and ownership is immutable
/// after creation. The category is optional: "uncategorized" is a valid
/// state, and it is also what remains visible if queries resolve a category
/// that has since been deleted.
///
/// To create a new transaction, insert a [NewTransaction]. To retrieve
/// existing transactions, see [Transaction::select_with_category] and
/// [Transaction::select_by_user].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    id: DatabaseID,
    amount: f64,
    date: OffsetDateTime,
    description: String,
    transaction_type: TransactionType,
    category_id: Option<DatabaseID>,
    user_id: UserID,
}

impl Transaction {
    /// The ID of the transaction.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The amount of money spent or earned in this transaction.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// When the transaction happened.
    pub fn date(&self) -> &OffsetDateTime {
        &self.date
    }

    /// A text description of what the transaction was for.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the transaction was income or an expense.
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// The optional category the transaction is filed under.
    pub fn category_id(&self) -> Option<DatabaseID> {
        self.category_id
    }

    /// The ID of the user that owns this transaction.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Retrieve the transaction with `id` owned by `user_id`, along with its
    /// category if it has one.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if the transaction does
    /// not exist or belongs to another user, or [Error::SqlError] if there is
    /// some other SQL error.
    pub fn select_with_category(
        id: DatabaseID,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<(Self, Option<Category>), Error> {
        let row = connection
            .prepare(
                "SELECT t.id, t.amount, t.date, t.description, t.type, t.category_id, t.user_id, \
                        c.id, c.name, c.description, c.icon, c.color, c.user_id \
                 FROM \"transaction\" t \
                 LEFT JOIN category c ON c.id = t.category_id \
                 WHERE t.id = ?1 AND t.user_id = ?2",
            )?
            .query_row((id, user_id.as_i64()), Self::map_row_with_category)?;

        Ok(row)
    }

    /// Retrieve the transactions owned by `user_id`, most recent first, each
    /// along with its category if it has one.
    ///
    /// An empty vector is returned if the user has no transactions.
    ///
    /// # Errors
    /// This function will return [Error::SqlError] if there is an SQL error.
    pub fn select_by_user(
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Vec<(Self, Option<Category>)>, Error> {
        connection
            .prepare(
                "SELECT t.id, t.amount, t.date, t.description, t.type, t.category_id, t.user_id, \
                        c.id, c.name, c.description, c.icon, c.color, c.user_id \
                 FROM \"transaction\" t \
                 LEFT JOIN category c ON c.id = t.category_id \
                 WHERE t.user_id = :user_id \
                 ORDER BY t.date DESC",
            )?
            .query_map(
                &[(":user_id", &user_id.as_i64())],
                Self::map_row_with_category,
            )?
            .map(|maybe_row| maybe_row.map_err(|error| error.into()))
            .collect()
    }

    /// Apply `changes` to the transaction with `id` owned by `user_id` and
    /// return the updated transaction along with its category if it has one.
    ///
    /// Fields that are `None` in `changes` are left unchanged. The ownership
    /// check is part of the `UPDATE` statement itself, so there is no window
    /// between checking and writing.
    ///
    /// # Errors
    /// This function will return:
    /// - [Error::NegativeAmount] if a negative amount is supplied,
    /// - [Error::InvalidCategory] if a category ID is supplied that does not
    ///   refer to a category owned by `user_id`,
    /// - [Error::NotFound] if the transaction does not exist or belongs to
    ///   another user,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn update(
        id: DatabaseID,
        user_id: UserID,
        changes: TransactionChanges,
        connection: &Connection,
    ) -> Result<(Self, Option<Category>), Error> {
        if let Some(amount) = changes.amount
            && !(amount >= 0.0)
        {
            return Err(Error::NegativeAmount);
        }

        if let Some(category_id) = changes.category_id {
            check_category_ownership(category_id, user_id, connection)?;
        }

        let rows_updated = connection.execute(
            "UPDATE \"transaction\" SET \
                description = COALESCE(?1, description), \
                amount = COALESCE(?2, amount), \
                type = COALESCE(?3, type), \
                date = COALESCE(?4, date), \
                category_id = COALESCE(?5, category_id) \
             WHERE id = ?6 AND user_id = ?7",
            (
                &changes.description,
                changes.amount,
                changes.transaction_type,
                changes.date.map(|date| date.to_offset(UtcOffset::UTC)),
                changes.category_id,
                id,
                user_id.as_i64(),
            ),
        )?;

        if rows_updated == 0 {
            return Err(Error::NotFound);
        }

        Transaction::select_with_category(id, user_id, connection)
    }

    /// Delete the transaction with `id` owned by `user_id` and return its
    /// prior state along with its category if it had one.
    ///
    /// The deleted row is captured before the `DELETE` statement since the
    /// database does not retain it after removal. The `DELETE` itself is
    /// scoped to the owning user.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if the transaction does
    /// not exist or belongs to another user, or [Error::SqlError] if there is
    /// some other SQL error.
    pub fn delete(
        id: DatabaseID,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<(Self, Option<Category>), Error> {
        let row = Transaction::select_with_category(id, user_id, connection)?;

        connection.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        Ok(row)
    }

    fn map_row_with_category(row: &Row) -> Result<(Self, Option<Category>), rusqlite::Error> {
        let transaction = Transaction::map_row(row)?;

        // The joined category columns are all NULL when the transaction has
        // no category.
        let category = match row.get::<_, Option<DatabaseID>>(7)? {
            Some(_) => Some(Category::map_row_with_offset(row, 7)?),
            None => None,
        };

        Ok((transaction, category))
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                type TEXT NOT NULL,
                category_id INTEGER,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            amount: row.get(offset + 1)?,
            date: row.get(offset + 2)?,
            description: row.get(offset + 3)?,
            transaction_type: row.get(offset + 4)?,
            category_id: row.get(offset + 5)?,
            user_id: UserID::new(row.get(offset + 6)?),
        })
    }
}

/// The data needed to insert a new transaction into the database.
///
/// Use [NewTransaction::new] so that the amount is validated up front.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    description: String,
    amount: f64,
    transaction_type: TransactionType,
    date: OffsetDateTime,
    category_id: Option<DatabaseID>,
    user_id: UserID,
}

impl NewTransaction {
    /// Create a new transaction to be inserted into the database.
    ///
    /// The date is normalized to UTC so that stored dates sort
    /// chronologically.
    ///
    /// # Errors
    /// This function will return [Error::NegativeAmount] if `amount` is
    /// negative or NaN.
    pub fn new(
        description: String,
        amount: f64,
        transaction_type: TransactionType,
        date: OffsetDateTime,
        category_id: Option<DatabaseID>,
        user_id: UserID,
    ) -> Result<Self, Error> {
        // The negated comparison also rejects NaN.
        if !(amount >= 0.0) {
            return Err(Error::NegativeAmount);
        }

        Ok(Self {
            description,
            amount,
            transaction_type,
            date: date.to_offset(UtcOffset::UTC),
            category_id,
            user_id,
        })
    }
}

impl Insert for NewTransaction {
    type ResultType = (Transaction, Option<Category>);

    /// Create a new transaction in the database.
    ///
    /// If a category ID is given, it must refer to a category owned by the
    /// same user that owns the transaction. The category, if any, is returned
    /// alongside the transaction so that callers do not need a second query
    /// to shape their response.
    ///
    /// # Errors
    /// This function will return:
    /// - [Error::InvalidCategory] if the category does not exist or belongs
    ///   to another user (the two cases are deliberately indistinguishable),
    /// - or [Error::SqlError] if there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        let category = match self.category_id {
            Some(category_id) => {
                Some(check_category_ownership(category_id, self.user_id, connection)?)
            }
            None => None,
        };

        connection.execute(
            "INSERT INTO \"transaction\" (amount, date, description, type, category_id, user_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                self.amount,
                &self.date,
                &self.description,
                self.transaction_type,
                self.category_id,
                self.user_id.as_i64(),
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok((
            Transaction {
                id,
                amount: self.amount,
                date: self.date,
                description: self.description,
                transaction_type: self.transaction_type,
                category_id: self.category_id,
                user_id: self.user_id,
            },
            category,
        ))
    }
}

/// A partial set of transaction fields for an update.
///
/// Fields that are `None` are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    /// A new description for the transaction.
    pub description: Option<String>,
    /// A new amount for the transaction. Must not be negative.
    pub amount: Option<f64>,
    /// A new type for the transaction.
    pub transaction_type: Option<TransactionType>,
    /// A new date for the transaction.
    pub date: Option<OffsetDateTime>,
    /// A new category for the transaction. Must be owned by the same user.
    pub category_id: Option<DatabaseID>,
}

/// Check that `category_id` refers to a category owned by `user_id`.
///
/// Returns the category so that callers can reuse it for response shaping.
/// A category owned by another user is reported with the same error as a
/// nonexistent one.
fn check_category_ownership(
    category_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    Category::select(category_id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory,
        error => error,
    })
}
