//! Authentication token issuance.
//!
//! `POST /v1/tokens/authentication` exchanges an email and password for a
//! 24-hour bearer token. Unknown email and wrong password produce the same
//! 401 so the endpoint does not confirm which addresses are registered.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::mangas::bad_json;
use crate::error::{AppError, AppResult};
use crate::models::{
    Token, TokenScope, password, validate_email, validate_password_plaintext,
};
use crate::state::AppState;
use crate::validation::Validator;

#[derive(Debug, Serialize)]
pub struct TokenEnvelope {
    authentication_token: Token,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenRequest {
    pub email: String,
    pub password: String,
}

/// Issue a new authentication token for valid credentials.
///
/// # Response Body
///
/// ```json
/// {
///   "authentication_token": {
///     "token": "X3D4LFQPBCD5M7YTRH2GZJNAOK",
///     "expiry": "2026-08-30T10:30:00Z"
///   }
/// }
/// ```
#[instrument(skip(state, payload))]
pub async fn create_authentication_token(
    State(state): State<AppState>,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TokenEnvelope>)> {
    let Json(payload) = payload.map_err(bad_json)?;

    let mut v = Validator::new();
    validate_email(&mut v, &payload.email);
    validate_password_plaintext(&mut v, &payload.password);
    v.finish()?;

    let user = match state.store.users.get_by_email(&payload.email).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            crate::metrics::record_auth_failure("unknown_email");
            return Err(AppError::InvalidCredentials);
        }
        Err(other) => return Err(other),
    };

    if !password::matches(&payload.password, &user.password_hash) {
        crate::metrics::record_auth_failure("wrong_password");
        return Err(AppError::InvalidCredentials);
    }

    let token = Token::generate(
        user.id,
        state.config.authentication_token_ttl,
        TokenScope::Authentication,
    );
    state.store.tokens.insert(&token).await?;

    info!(user_id = user.id, "Authentication token issued");

    Ok((
        StatusCode::CREATED,
        Json(TokenEnvelope {
            authentication_token: token,
        }),
    ))
}
