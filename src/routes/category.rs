//! Response handlers for creating, listing, updating and deleting
//! categories.
//!
//! Every handler takes the caller's identity from a bearer token and only
//! ever touches categories owned by that user.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Claims,
    db::Insert,
    models::{Category, CategoryChanges, CategoryName, DatabaseID, NewCategory},
};

/// The public view of a category, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResponse {
    /// The category's ID.
    pub id: DatabaseID,
    /// The name of the category.
    pub name: String,
    /// An optional free-form description of the category.
    pub description: Option<String>,
    /// An optional icon tag for displaying the category.
    pub icon: Option<String>,
    /// An optional color tag for displaying the category.
    pub color: Option<String>,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id(),
            name: category.name().to_string(),
            description: category.description().map(|text| text.to_string()),
            icon: category.icon().map(|text| text.to_string()),
            color: category.color().map(|text| text.to_string()),
        }
    }
}

/// The data sent by the client to create a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    /// The name of the new category.
    #[serde(default)]
    pub name: String,
    /// An optional free-form description.
    pub description: Option<String>,
    /// An optional icon tag.
    pub icon: Option<String>,
    /// An optional color tag.
    pub color: Option<String>,
}

/// The data sent by the client to update a category.
///
/// Fields left out are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryForm {
    /// A new name for the category.
    pub name: Option<String>,
    /// A new description for the category.
    pub description: Option<String>,
    /// A new icon tag for the category.
    pub icon: Option<String>,
    /// A new color tag for the category.
    pub color: Option<String>,
}

/// Handler for listing the caller's categories.
pub async fn get_categories(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, Error> {
    let connection = state.db_connection()?;
    let categories = Category::select_by_user(claims.user_id(), &connection)?;

    Ok(Json(
        categories.iter().map(CategoryResponse::from).collect(),
    ))
}

/// Handler for creating a category owned by the caller.
///
/// # Errors
///
/// This function will return [Error::EmptyCategoryName] if the name is
/// missing or empty.
pub async fn create_category(
    claims: Claims,
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
    let name = CategoryName::new(&form.name)?;

    let connection = state.db_connection()?;
    let category = NewCategory {
        name,
        description: form.description,
        icon: form.icon,
        color: form.color,
        user_id: claims.user_id(),
    }
    .insert(&connection)?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(&category))))
}

/// Handler for updating one of the caller's categories.
///
/// # Errors
///
/// This function will return:
/// - [Error::NotFound] if the category does not exist or belongs to another
///   user,
/// - [Error::EmptyCategoryName] if a new name is supplied but empty.
pub async fn update_category(
    claims: Claims,
    State(state): State<AppState>,
    Path(category_id): Path<DatabaseID>,
    Json(form): Json<UpdateCategoryForm>,
) -> Result<Json<CategoryResponse>, Error> {
    let name = form
        .name
        .as_deref()
        .map(CategoryName::new)
        .transpose()?;

    let connection = state.db_connection()?;
    let category = Category::update(
        category_id,
        claims.user_id(),
        CategoryChanges {
            name,
            description: form.description,
            icon: form.icon,
            color: form.color,
        },
        &connection,
    )?;

    Ok(Json(CategoryResponse::from(&category)))
}

/// Handler for deleting one of the caller's categories.
///
/// The deleted category is echoed back so that the client can show what was
/// removed.
///
/// # Errors
///
/// This function will return:
/// - [Error::NotFound] if the category does not exist or belongs to another
///   user,
/// - [Error::CategoryInUse] if one or more transactions still reference the
///   category.
pub async fn delete_category(
    claims: Claims,
    State(state): State<AppState>,
    Path(category_id): Path<DatabaseID>,
) -> Result<Json<CategoryResponse>, Error> {
    let connection = state.db_connection()?;
    let category = Category::delete(category_id, claims.user_id(), &connection)?;

    Ok(Json(CategoryResponse::from(&category)))
}
