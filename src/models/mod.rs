//! This module defines the domain data types.

pub use category::{Category, CategoryChanges, CategoryName, NewCategory};
pub use password::PasswordHash;
pub use transaction::{NewTransaction, Transaction, TransactionChanges, TransactionType};
pub use user::{NewUser, User, UserID};

mod category;
mod password;
mod transaction;
mod user;

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;
