//! Request pipeline stages for protected routes.
//!
//! `protect` resolves the bearer token to a live user and stores it in the
//! request extensions; `restrict_to` then admits or rejects by role. Each
//! stage either passes the request on or answers with an `AppError`.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::{AppError, AppResult},
    state::AppState,
    users::{Role, User},
};

/// The authenticated user attached by `protect`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(not_logged_in)
    }
}

fn not_logged_in() -> AppError {
    AppError::unauthorized("You are not logged in! Please log in to get access.")
}

/// Expects "Bearer <token>".
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(req.headers())
        .ok_or_else(not_logged_in)?
        .to_owned();

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(&token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        match e.kind() {
            ErrorKind::ExpiredSignature => {
                AppError::unauthorized("Your token has expired! Please log in again.")
            }
            _ => AppError::unauthorized("Invalid token. Please log in again!"),
        }
    })?;

    let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!(user_id = %claims.sub, "token for deleted user");
        AppError::unauthorized("The user belonging to this token does no longer exist.")
    })?;

    if user.changed_password_after(claims.iat) {
        warn!(user_id = %user.id, "token predates password change");
        return Err(AppError::unauthorized(
            "User recently changed password! Please log in again.",
        ));
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// The set of roles admitted by a `restrict_to` stage.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    pub fn check(&self, user: &User) -> AppResult<()> {
        if self.admits(user.role) {
            Ok(())
        } else {
            warn!(user_id = %user.id, role = ?user.role, "role not permitted");
            Err(AppError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }
}

/// Must be layered inside `protect`.
pub async fn restrict_to(
    State(gate): State<RoleGate>,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) => gate.check(user)?,
        None => return Err(not_logged_in()),
    }
    Ok(next.run(req).await)
}
