//! This module defines the data structures, response handlers and functions
//! for authenticating a user with a JSON Web Token supplied as a bearer
//! token in the `Authorization` header.

use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts, Json, State},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    models::{User, UserID},
    routes::user::AuthPayload,
};

/// How long a bearer token stays valid after it is issued.
///
/// Tokens expire so that a leaked token is not a permanent credential. The
/// client is expected to log in again once its token lapses.
pub const TOKEN_DURATION: Duration = Duration::days(30);

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The ID of the user the token was issued to.
    pub fn user_id(&self) -> UserID {
        UserID::new(self.sub)
    }
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthenticated)?;

        let app_state = AppState::from_ref(state);

        decode_jwt(bearer.token(), app_state.decoding_key())
    }
}

/// The caller's identity, if any.
///
/// Unlike [Claims], this extractor never rejects a request: a missing header
/// and an invalid token both produce `OptionalClaims(None)`, making absence
/// of identity indistinguishable from invalid identity. Handlers that accept
/// anonymous callers, such as `me`, use this extractor.
#[derive(Debug)]
pub struct OptionalClaims(pub Option<Claims>);

impl<S> FromRequestParts<S> for OptionalClaims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Claims::from_request_parts(parts, state).await.ok()))
    }
}

/// Sign a bearer token for `user_id`.
///
/// # Errors
/// This function will return [Error::TokenCreation] if the token could not
/// be signed, e.g. if the signing key is malformed.
pub fn encode_jwt(user_id: UserID, encoding_key: &EncodingKey) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id.as_i64(),
        iat: now.unix_timestamp() as usize,
        exp: (now + TOKEN_DURATION).unix_timestamp() as usize,
    };

    encode(&Header::default(), &claims, encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Verify a bearer token and return its claims.
///
/// This function fails closed: a parse error, a bad signature and an expired
/// token all yield [Error::Unauthenticated] and nothing else.
pub fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<Claims, Error> {
    decode::<Claims>(token, decoding_key, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|_| Error::Unauthenticated)
}

/// The credentials a user logs in with.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return [Error::InvalidCredentials] if the email does
/// not belong to a registered user or the password is not correct. The two
/// cases produce identical responses so that the client cannot tell which
/// one was wrong.
pub async fn log_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthPayload>, Error> {
    // The lock is released before password verification, which is slow by
    // design.
    let user = {
        let connection = state.db_connection()?;
        User::select_by_email(&credentials.email, &connection)
    }
    .map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => {
            tracing::error!("Error matching user: {error:?}");
            error
        }
    })?;

    let password_is_correct = user.password_hash().verify(&credentials.password)?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(user.id(), state.encoding_key())?;

    Ok(Json(AuthPayload::new(token, &user)))
}


#[cfg(test)]
mod log_in_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, build_router};

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "foobar").expect("Could not create app state.");

        TestServer::new(build_router(state))
    }

    async fn sign_up_test_user(server: &TestServer) {
        server
            .post("/api/users")
            .json(&json!({
                "name": "Ana",
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = new_test_server();
        sign_up_test_user(&server).await;

        server
            .post("/api/log_in")
            .json(&json!({
                "email": "ana@x.com",
                "password": "pw12345",
            }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let server = new_test_server();

        server
            .post("/api/log_in")
            .content_type("application/json")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_in_errors_do_not_reveal_which_credential_was_wrong() {
        let server = new_test_server();
        sign_up_test_user(&server).await;

        let wrong_password_response = server
            .post("/api/log_in")
            .json(&json!({
                "email": "ana@x.com",
                "password": "definitelyNotTheCorrectPassword",
            }))
            .await;

        let unknown_email_response = server
            .post("/api/log_in")
            .json(&json!({
                "email": "nobody@nowhere.com",
                "password": "pw12345",
            }))
            .await;

        wrong_password_response.assert_status(StatusCode::UNAUTHORIZED);
        unknown_email_response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password_response.text(), unknown_email_response.text());
    }
}
