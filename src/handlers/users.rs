//! User registration and activation handlers.
//!
//! # Endpoints
//!
//! - `POST /v1/users` - Register a new account
//! - `PUT /v1/users/activated` - Activate an account with an activation token
//!
//! Registration grants `mangas:read` immediately; write access is granted
//! out of band. The activation token is returned in the registration
//! response body (there is no mail delivery in this service) and can be
//! used exactly until its expiry.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::mangas::bad_json;
use crate::error::{AppError, AppResult};
use crate::models::{
    Token, TokenScope, User, password, validate_password_plaintext, validate_token_plaintext,
    validate_user,
};
use crate::state::AppState;
use crate::validation::Validator;

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    user: User,
}

#[derive(Debug, Serialize)]
pub struct RegistrationEnvelope {
    user: User,
    /// One-shot plaintext; only its hash is stored.
    activation_token: String,
}

/// Request body for registration. All fields are required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Register a new user account.
///
/// The account starts unactivated with the `mangas:read` permission. The
/// response carries the activation token alongside the created user; a
/// duplicate email is reported as a validation failure.
#[instrument(skip(state, payload))]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RegistrationEnvelope>)> {
    let Json(payload) = payload.map_err(bad_json)?;

    let user = User {
        id: 0,
        created_at: Utc::now(),
        name: payload.name,
        email: payload.email,
        password_hash: password::hash(&payload.password),
        activated: false,
        version: 0,
    };

    let mut v = Validator::new();
    validate_user(&mut v, &user);
    validate_password_plaintext(&mut v, &payload.password);
    v.finish()?;

    let user = state.store.users.insert(&user).await?;

    state
        .store
        .permissions
        .add_for_user(user.id, &["mangas:read"])
        .await?;

    let token = Token::generate(
        user.id,
        state.config.activation_token_ttl,
        TokenScope::Activation,
    );
    state.store.tokens.insert(&token).await?;

    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegistrationEnvelope {
            user,
            activation_token: token.plaintext,
        }),
    ))
}

/// Request body for account activation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateUserRequest {
    pub token: String,
}

/// Activate a user account with an activation token.
///
/// The user row is updated under optimistic concurrency; if the account
/// changed since the token lookup, the request gets 409 and can simply be
/// retried. On success all activation tokens for the user are invalidated.
#[instrument(skip(state, payload))]
pub async fn activate_user(
    State(state): State<AppState>,
    payload: Result<Json<ActivateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserEnvelope>> {
    let Json(payload) = payload.map_err(bad_json)?;

    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &payload.token);
    v.finish()?;

    let mut user = match state
        .store
        .users
        .get_for_token(TokenScope::Activation, &payload.token)
        .await
    {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            let errors = std::collections::HashMap::from([(
                "token".to_string(),
                "invalid or expired activation token".to_string(),
            )]);
            return Err(AppError::ValidationFailed(errors));
        }
        Err(other) => return Err(other),
    };

    user.activated = true;
    user.version = state.store.users.update(&user).await?;

    state
        .store
        .tokens
        .delete_all_for_user(TokenScope::Activation, user.id)
        .await?;

    info!(user_id = user.id, "User activated");

    Ok(Json(UserEnvelope { user }))
}
