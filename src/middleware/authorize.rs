//! Per-route permission enforcement.
//!
//! Applied to individual routes, after the router has resolved the path.
//! The checks escalate in order: an anonymous request gets 401 before any
//! activation or permission lookup, an unactivated account gets 403, and an
//! activated account without the required permission code gets 403.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::debug;

use super::auth::Principal;
use crate::error::AppError;
use crate::models::User;
use crate::store::Store;

/// Layer that rejects requests whose principal lacks a permission code.
///
/// Permission codes follow the `resource:action` convention, e.g.
/// `mangas:read` or `mangas:write`.
#[derive(Clone)]
pub struct RequirePermission {
    store: Store,
    code: &'static str,
}

impl RequirePermission {
    pub fn new(store: Store, code: &'static str) -> Self {
        Self { store, code }
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService {
            inner,
            store: self.store.clone(),
            code: self.code,
        }
    }
}

/// Permission enforcement service wrapper.
#[derive(Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    store: Store,
    code: &'static str,
}

impl<S> Service<Request<Body>> for RequirePermissionService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let store = self.store.clone();
        let code = self.code;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authorize(&store, code, req.extensions().get::<Principal>()).await {
                Ok(()) => inner.call(req).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

/// Run the escalating checks for one request.
async fn authorize(
    store: &Store,
    code: &'static str,
    principal: Option<&Principal>,
) -> Result<(), AppError> {
    // A missing extension means the authenticator is not in front of this
    // route; fail closed.
    let user: &User = match principal {
        Some(Principal::User(user)) => user,
        Some(Principal::Anonymous) | None => return Err(AppError::AuthenticationRequired),
    };

    if !user.activated {
        return Err(AppError::InactiveAccount);
    }

    let permissions = store.permissions.get_all_for_user(user.id).await?;
    if !permissions.contains(code) {
        debug!(user_id = user.id, code, "Permission denied");
        return Err(AppError::Forbidden);
    }

    Ok(())
}
