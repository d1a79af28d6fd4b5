//! This file defines the `Category` type and the types needed to create and
//! modify a category. A category acts like a label for transactions, however
//! a transaction may have at most one category.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow},
    models::{DatabaseID, UserID},
};

/// The name of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an error if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty. This function
    /// has `_unchecked` in the name but is not `unsafe`, because if the
    /// non-empty invariant is violated it will cause incorrect behaviour but
    /// not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category for expenses and income, e.g., 'Groceries', 'Eating Out',
/// 'Wages'.
///
/// Every category is owned by exactly one user and ownership is immutable
/// after creation. All queries over categories are scoped to the owning user
/// so that a category owned by another user is indistinguishable from one
/// that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    id: DatabaseID,
    name: CategoryName,
    description: Option<String>,
    icon: Option<String>,
    color: Option<String>,
    user_id: UserID,
}

impl Category {
    /// The ID of the category.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The name of the category.
    pub fn name(&self) -> &CategoryName {
        &self.name
    }

    /// An optional free-form description of the category.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// An optional icon tag for displaying the category.
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// An optional color tag for displaying the category.
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// The ID of the user that owns the category.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Retrieve the category with `id` owned by `user_id`.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if the category does not
    /// exist or belongs to another user, or [Error::SqlError] if there is
    /// some other SQL error.
    pub fn select(
        id: DatabaseID,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let category = connection
            .prepare(
                "SELECT id, name, description, icon, color, user_id FROM category \
                 WHERE id = ?1 AND user_id = ?2",
            )?
            .query_row((id, user_id.as_i64()), Category::map_row)?;

        Ok(category)
    }

    /// Retrieve all categories owned by `user_id`.
    ///
    /// An empty vector is returned if the user has no categories.
    ///
    /// # Errors
    /// This function will return [Error::SqlError] if there is an SQL error.
    pub fn select_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Self>, Error> {
        connection
            .prepare(
                "SELECT id, name, description, icon, color, user_id FROM category \
                 WHERE user_id = :user_id",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], Category::map_row)?
            .map(|maybe_category| maybe_category.map_err(|error| error.into()))
            .collect()
    }

    /// Apply `changes` to the category with `id` owned by `user_id` and
    /// return the updated category.
    ///
    /// Fields that are `None` in `changes` are left unchanged. The ownership
    /// check is part of the `UPDATE` statement itself, so there is no window
    /// between checking and writing.
    ///
    /// # Errors
    /// This function will return [Error::NotFound] if the category does not
    /// exist or belongs to another user, or [Error::SqlError] if there is
    /// some other SQL error.
    pub fn update(
        id: DatabaseID,
        user_id: UserID,
        changes: CategoryChanges,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let rows_updated = connection.execute(
            "UPDATE category SET \
                name = COALESCE(?1, name), \
                description = COALESCE(?2, description), \
                icon = COALESCE(?3, icon), \
                color = COALESCE(?4, color) \
             WHERE id = ?5 AND user_id = ?6",
            (
                changes.name.as_ref().map(|name| name.as_ref()),
                &changes.description,
                &changes.icon,
                &changes.color,
                id,
                user_id.as_i64(),
            ),
        )?;

        if rows_updated == 0 {
            return Err(Error::NotFound);
        }

        Category::select(id, user_id, connection)
    }

    /// Delete the category with `id` owned by `user_id` and return its prior
    /// state.
    ///
    /// The deleted row is captured before the `DELETE` statement since the
    /// database does not retain it after removal. The `DELETE` itself is
    /// scoped to the owning user.
    ///
    /// # Errors
    /// This function will return:
    /// - [Error::NotFound] if the category does not exist or belongs to
    ///   another user,
    /// - [Error::CategoryInUse] if one or more transactions still reference
    ///   the category,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn delete(
        id: DatabaseID,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let category = Category::select(id, user_id, connection)?;

        connection
            .execute(
                "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
                (id, user_id.as_i64()),
            )
            .map_err(|error| match Error::from(error) {
                Error::InvalidForeignKey => Error::CategoryInUse,
                error => error,
            })?;

        Ok(category)
    }
}

impl CreateTable for Category {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                icon TEXT,
                color TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Category {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;

        let raw_name: String = row.get(offset + 1)?;
        let name = CategoryName::new_unchecked(&raw_name);

        let description = row.get(offset + 2)?;
        let icon = row.get(offset + 3)?;
        let color = row.get(offset + 4)?;
        let user_id = UserID::new(row.get(offset + 5)?);

        Ok(Self {
            id,
            name,
            description,
            icon,
            color,
            user_id,
        })
    }
}

/// The data needed to insert a new category into the database.
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// The name of the category.
    pub name: CategoryName,
    /// An optional free-form description of the category.
    pub description: Option<String>,
    /// An optional icon tag for displaying the category.
    pub icon: Option<String>,
    /// An optional color tag for displaying the category.
    pub color: Option<String>,
    /// The ID of the user that owns the category.
    pub user_id: UserID,
}

impl Insert for NewCategory {
    type ResultType = Category;

    /// Create a new category in the database.
    ///
    /// # Errors
    /// This function will return an error if `user_id` does not refer to a
    /// valid user, or if there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        connection.execute(
            "INSERT INTO category (name, description, icon, color, user_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                self.name.as_ref(),
                &self.description,
                &self.icon,
                &self.color,
                self.user_id.as_i64(),
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Category {
            id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            color: self.color,
            user_id: self.user_id,
        })
    }
}

/// A partial set of category fields for an update.
///
/// Fields that are `None` are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    /// A new name for the category.
    pub name: Option<CategoryName>,
    /// A new description for the category.
    pub description: Option<String>,
    /// A new icon tag for the category.
    pub icon: Option<String>,
    /// A new color tag for the category.
    pub color: Option<String>,
}

#[cfg(test)]
mod category_name_tests {
    use crate::Error;

    use super::CategoryName;

    #[test]
    fn new_fails_on_empty_string() {
        let category_name = CategoryName::new("");

        assert_eq!(category_name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_succeeds_on_non_empty_string() {
        let category_name = CategoryName::new("🔥");

        assert!(category_name.is_ok())
    }
}

#[cfg(test)]
mod category_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        Error,
        db::{Insert, initialize},
        models::{NewUser, PasswordHash, User, UserID},
    };

    use super::{Category, CategoryChanges, CategoryName, NewCategory};

    fn create_database_and_insert_test_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let test_user = NewUser {
            name: "Test User".to_string(),
            email: EmailAddress::from_str("foo@bar.baz").unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter2"),
        }
        .insert(&conn)
        .unwrap();

        (conn, test_user)
    }

    fn new_category(name: &str, user_id: UserID) -> NewCategory {
        NewCategory {
            name: CategoryName::new_unchecked(name),
            description: None,
            icon: None,
            color: None,
            user_id,
        }
    }

    #[test]
    fn insert_category_succeeds() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let category = NewCategory {
            name: CategoryName::new_unchecked("Food"),
            description: Some("Groceries and eating out".to_string()),
            icon: Some("🍔".to_string()),
            color: Some("#ff8800".to_string()),
            user_id: test_user.id(),
        }
        .insert(&conn)
        .unwrap();

        assert!(category.id() > 0);
        assert_eq!(category.name().as_ref(), "Food");
        assert_eq!(category.description(), Some("Groceries and eating out"));
        assert_eq!(category.icon(), Some("🍔"));
        assert_eq!(category.color(), Some("#ff8800"));
        assert_eq!(category.user_id(), test_user.id());
    }

    #[test]
    fn insert_category_fails_with_invalid_user_id() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let maybe_category = new_category("Foo", UserID::new(42)).insert(&conn);

        assert_eq!(maybe_category, Err(Error::InvalidForeignKey));
    }

    #[test]
    fn select_category_succeeds() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let inserted_category = new_category("Foo", test_user.id()).insert(&conn).unwrap();

        let selected_category =
            Category::select(inserted_category.id(), test_user.id(), &conn).unwrap();

        assert_eq!(inserted_category, selected_category);
    }

    #[test]
    fn select_category_fails_for_wrong_owner() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let other_user = NewUser {
            name: "Someone Else".to_string(),
            email: EmailAddress::from_str("bar@baz.qux").unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter3"),
        }
        .insert(&conn)
        .unwrap();

        let inserted_category = new_category("Foo", test_user.id()).insert(&conn).unwrap();

        let selected_category = Category::select(inserted_category.id(), other_user.id(), &conn);

        // Same error as a nonexistent ID so that existence is not leaked.
        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn select_category_fails_with_invalid_id() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let selected_category = Category::select(1337, test_user.id(), &conn);

        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn select_categories_by_user_only_returns_owned_categories() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let other_user = NewUser {
            name: "Someone Else".to_string(),
            email: EmailAddress::from_str("bar@baz.qux").unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter3"),
        }
        .insert(&conn)
        .unwrap();

        let owned_categories = vec![
            new_category("Foo", test_user.id()).insert(&conn).unwrap(),
            new_category("Bar", test_user.id()).insert(&conn).unwrap(),
        ];
        new_category("Baz", other_user.id()).insert(&conn).unwrap();

        let selected_categories = Category::select_by_user(test_user.id(), &conn).unwrap();

        assert_eq!(owned_categories, selected_categories);
    }

    #[test]
    fn update_category_changes_only_provided_fields() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let category = NewCategory {
            name: CategoryName::new_unchecked("Food"),
            description: Some("Groceries".to_string()),
            icon: None,
            color: None,
            user_id: test_user.id(),
        }
        .insert(&conn)
        .unwrap();

        let updated_category = Category::update(
            category.id(),
            test_user.id(),
            CategoryChanges {
                name: Some(CategoryName::new_unchecked("Eating Out")),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated_category.name().as_ref(), "Eating Out");
        assert_eq!(updated_category.description(), Some("Groceries"));
    }

    #[test]
    fn update_category_fails_for_wrong_owner() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let other_user = NewUser {
            name: "Someone Else".to_string(),
            email: EmailAddress::from_str("bar@baz.qux").unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter3"),
        }
        .insert(&conn)
        .unwrap();

        let category = new_category("Foo", test_user.id()).insert(&conn).unwrap();

        let result = Category::update(
            category.id(),
            other_user.id(),
            CategoryChanges {
                name: Some(CategoryName::new_unchecked("Bar")),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_category_returns_prior_state() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let category = new_category("Foo", test_user.id()).insert(&conn).unwrap();

        let deleted_category = Category::delete(category.id(), test_user.id(), &conn).unwrap();

        assert_eq!(category, deleted_category);
        assert_eq!(
            Category::select(category.id(), test_user.id(), &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_category_fails_for_wrong_owner() {
        let (conn, test_user) = create_database_and_insert_test_user();
        let other_user = NewUser {
            name: "Someone Else".to_string(),
            email: EmailAddress::from_str("bar@baz.qux").unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter3"),
        }
        .insert(&conn)
        .unwrap();

        let category = new_category("Foo", test_user.id()).insert(&conn).unwrap();

        let result = Category::delete(category.id(), other_user.id(), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
