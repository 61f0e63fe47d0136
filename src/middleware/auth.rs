//! Bearer token authentication middleware.
//!
//! The authenticator classifies every request as either anonymous or a known
//! user, then lets it through. It never rejects a request for merely lacking
//! credentials; routes that need a user enforce that via
//! [`RequirePermission`](super::authorize::RequirePermission).
//!
//! # Classification
//!
//! - No `Authorization` header: the request proceeds as [`Principal::Anonymous`]
//! - `Authorization: Bearer <token>` with a known, unexpired token: the
//!   request proceeds as [`Principal::User`]
//! - Anything else (malformed header, wrong-length token, unknown or expired
//!   token) is rejected immediately with 401 and `WWW-Authenticate: Bearer`
//!
//! Every response passing through this layer carries `Vary: Authorization`
//! so caches never serve one principal's response to another.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, VARY};
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::debug;

use crate::error::AppError;
use crate::models::{TokenScope, User, validate_token_plaintext};
use crate::store::Store;
use crate::validation::Validator;

/// The identity attached to every request by the authenticator.
///
/// Stored in request extensions; handlers and the authorizer read it back
/// out with `Extension<Principal>`.
#[derive(Debug, Clone)]
pub enum Principal {
    /// No credentials were presented.
    Anonymous,
    /// A valid authentication token mapped to this user.
    User(User),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }
}

/// Authentication layer for the Tower middleware stack.
#[derive(Clone)]
pub struct AuthLayer {
    store: Store,
}

impl AuthLayer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            store: self.store.clone(),
        }
    }
}

/// Authentication service wrapper.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    store: Store,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let store = self.store.clone();
        let mut inner = self.inner.clone();

        // Only the header value crosses into the future; the request body
        // is not Sync and must not be borrowed across the store lookup.
        let auth_header = req.headers().get(AUTHORIZATION).cloned();

        Box::pin(async move {
            let principal = match resolve_principal(&store, auth_header.as_ref()).await {
                Ok(principal) => principal,
                Err(err) => return Ok(with_vary(err.into_response())),
            };

            if let Principal::User(ref user) = principal {
                debug!(user_id = user.id, "Request authenticated");
            }
            req.extensions_mut().insert(principal);

            let response = inner.call(req).await?;
            Ok(with_vary(response))
        })
    }
}

/// Map the Authorization header to a principal, or reject the request.
async fn resolve_principal(
    store: &Store,
    header: Option<&HeaderValue>,
) -> Result<Principal, AppError> {
    let Some(header) = header else {
        return Ok(Principal::Anonymous);
    };

    let value = header.to_str().map_err(|_| {
        crate::metrics::record_auth_failure("malformed_header");
        AppError::InvalidCredentials
    })?;

    let Some(plaintext) = value.strip_prefix("Bearer ") else {
        crate::metrics::record_auth_failure("malformed_header");
        return Err(AppError::InvalidCredentials);
    };

    let mut v = Validator::new();
    validate_token_plaintext(&mut v, plaintext);
    if !v.is_valid() {
        crate::metrics::record_auth_failure("malformed_token");
        return Err(AppError::InvalidCredentials);
    }

    match store
        .users
        .get_for_token(TokenScope::Authentication, plaintext)
        .await
    {
        Ok(user) => Ok(Principal::User(user)),
        Err(AppError::NotFound) => {
            crate::metrics::record_auth_failure("unknown_token");
            Err(AppError::InvalidCredentials)
        }
        Err(other) => Err(other),
    }
}

fn with_vary(mut response: Response<Body>) -> Response<Body> {
    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static("Authorization"));
    response
}
