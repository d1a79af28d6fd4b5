//! Response handlers for signing up a user and inspecting the caller's own
//! identity.

use std::str::FromStr;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{OptionalClaims, encode_jwt},
    db::Insert,
    models::{NewUser, PasswordHash, User, UserID},
};

/// The public view of a user, as returned by the API.
///
/// The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The user's ID.
    pub id: UserID,
    /// The display name the user registered with.
    pub name: String,
    /// The email address associated with the user.
    pub email: String,
    /// When the user signed up.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            created_at: *user.created_at(),
        }
    }
}

/// The response to a successful sign-up or log-in: a bearer token and the
/// user it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    /// The signed bearer token the client should present on later requests.
    pub token: String,
    /// The user the token was issued to.
    pub user: UserResponse,
}

impl AuthPayload {
    /// Create an auth payload for `user` with the given `token`.
    pub fn new(token: String, user: &User) -> Self {
        Self {
            token,
            user: UserResponse::from(user),
        }
    }
}

/// The data sent by the client to sign up.
///
/// All fields default to empty strings so that a missing field produces the
/// same validation error as an empty one.
#[derive(Debug, Deserialize)]
pub struct SignUp {
    /// The display name to register with.
    #[serde(default)]
    pub name: String,
    /// The email address to register with. Must be unique.
    #[serde(default)]
    pub email: String,
    /// The password to register with.
    #[serde(default)]
    pub password: String,
}

/// Handler for sign-up requests.
///
/// Creates the user and logs them in, in one step.
///
/// # Errors
///
/// This function will return:
/// - [Error::MissingField] if the name, email or password is missing or
///   empty,
/// - [Error::InvalidEmail] if the email does not look like an email address,
/// - [Error::DuplicateEmail] if the email is already registered.
pub async fn create_user(
    State(state): State<AppState>,
    Json(sign_up): Json<SignUp>,
) -> Result<(StatusCode, Json<AuthPayload>), Error> {
    if sign_up.name.is_empty() {
        return Err(Error::MissingField("name"));
    }

    if sign_up.email.is_empty() {
        return Err(Error::MissingField("email"));
    }

    if sign_up.password.is_empty() {
        return Err(Error::MissingField("password"));
    }

    let email = EmailAddress::from_str(&sign_up.email).map_err(|_| Error::InvalidEmail)?;
    let password_hash = PasswordHash::from_raw_password(&sign_up.password, hash_cost())?;

    let user = {
        let connection = state.db_connection()?;
        NewUser {
            name: sign_up.name,
            email,
            password_hash,
        }
        .insert(&connection)?
    };

    let token = encode_jwt(user.id(), state.encoding_key())?;

    Ok((StatusCode::CREATED, Json(AuthPayload::new(token, &user))))
}

/// Handler for requests for the caller's own user record.
///
/// This is a "may or may not be logged in" probe: an anonymous caller gets
/// `null` rather than an error.
pub async fn get_me(
    OptionalClaims(claims): OptionalClaims,
    State(state): State<AppState>,
) -> Result<Json<Option<UserResponse>>, Error> {
    let Some(claims) = claims else {
        return Ok(Json(None));
    };

    let connection = state.db_connection()?;

    match User::select_by_id(claims.user_id(), &connection) {
        Ok(user) => Ok(Json(Some(UserResponse::from(&user)))),
        // A token for a user that no longer exists is treated like no token.
        Err(Error::NotFound) => Ok(Json(None)),
        Err(error) => Err(error),
    }
}

/// The bcrypt cost used for new passwords.
///
/// Tests use the minimum cost so that they do not spend most of their time
/// hashing.
fn hash_cost() -> u32 {
    // 4 is the lowest cost bcrypt accepts.
    if cfg!(test) { 4 } else { PasswordHash::HASH_COST }
}

#[cfg(test)]
mod sign_up_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router};

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "foobar").expect("Could not create app state.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn sign_up_succeeds_and_issued_token_resolves_to_the_new_user() {
        let server = new_test_server();

        let response = server
            .post("/api/users")
            .json(&json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let payload = response.json::<Value>();
        assert_eq!(payload["user"]["name"], "Ana");
        assert_eq!(payload["user"]["email"], "ana@x.com");
        assert!(payload["user"]["createdAt"].is_string());

        let token = payload["token"].as_str().unwrap();
        let me = server
            .get("/api/me")
            .authorization_bearer(token)
            .await
            .json::<Value>();

        assert_eq!(me["id"], payload["user"]["id"]);
        assert_eq!(me["email"], "ana@x.com");
    }

    #[tokio::test]
    async fn sign_up_fails_with_missing_name() {
        let server = new_test_server();

        let response = server
            .post("/api/users")
            .json(&json!({
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error"], "name is required");
    }

    #[tokio::test]
    async fn sign_up_fails_with_invalid_email() {
        let server = new_test_server();

        let response = server
            .post("/api/users")
            .json(&json!({
                "name": "Ana",
                "email": "not-an-email",
                "password": "pw12345",
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error"], "invalid email format");
    }

    #[tokio::test]
    async fn sign_up_fails_with_duplicate_email() {
        let server = new_test_server();

        server
            .post("/api/users")
            .json(&json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/users")
            .json(&json!({
                "name": "Also Ana",
                "email": "ana@x.com",
                "password": "pw67890",
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["error"], "email already in use");
    }
}

#[cfg(test)]
mod me_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router};

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "foobar").expect("Could not create app state.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn me_returns_null_for_anonymous_caller() {
        let server = new_test_server();

        let response = server.get("/api/me").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "null");
    }

    #[tokio::test]
    async fn me_returns_null_for_invalid_token() {
        let server = new_test_server();

        let response = server
            .get("/api/me")
            .authorization_bearer("not.a.token")
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "null");
    }

    #[tokio::test]
    async fn me_returns_the_authenticated_user() {
        let server = new_test_server();

        let sign_up_response = server
            .post("/api/users")
            .json(&json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await
            .json::<Value>();

        let response = server
            .get("/api/me")
            .authorization_bearer(sign_up_response["token"].as_str().unwrap())
            .await;

        response.assert_status_ok();
        let me = response.json::<Value>();
        assert_eq!(me["name"], "Ana");
        assert_eq!(me["email"], "ana@x.com");
    }
}
