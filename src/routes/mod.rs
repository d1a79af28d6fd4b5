//! Defines the API routes and how to handle each one.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::{AppState, auth::log_in};

pub mod category;
pub mod transaction;
pub mod user;

/// The paths for each of the API endpoints.
pub mod endpoints {
    /// Sign up a new user.
    pub const USERS: &str = "/api/users";
    /// Exchange credentials for a bearer token.
    pub const LOG_IN: &str = "/api/log_in";
    /// The caller's own user record, or `null` when anonymous.
    pub const ME: &str = "/api/me";
    /// The caller's categories.
    pub const CATEGORIES: &str = "/api/categories";
    /// A single category of the caller's.
    pub const CATEGORY: &str = "/api/categories/{category_id}";
    /// The caller's transactions.
    pub const TRANSACTIONS: &str = "/api/transactions";
    /// A single transaction of the caller's.
    pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
}

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::USERS, post(user::create_user))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::ME, get(user::get_me))
        .route(
            endpoints::CATEGORIES,
            get(category::get_categories).post(category::create_category),
        )
        .route(
            endpoints::CATEGORY,
            put(category::update_category).delete(category::delete_category),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(transaction::get_transactions).post(transaction::create_transaction),
        )
        .route(
            endpoints::TRANSACTION,
            put(transaction::update_transaction).delete(transaction::delete_transaction),
        )
        .with_state(state)
}
