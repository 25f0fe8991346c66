use axum::{middleware, Router};

use crate::state::AppState;
use crate::users::Role;

mod claims;
mod dto;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod session;

/// Routes mounted under `/users`.
///
/// Protected routes run `protect` first, then (for admin routes) the role
/// gate, then the handler.
pub fn router(state: AppState) -> Router<AppState> {
    let admin = handlers::admin_routes().route_layer(middleware::from_fn_with_state(
        guard::RoleGate::new([Role::Admin]),
        guard::restrict_to,
    ));

    let protected = handlers::protected_routes()
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, guard::protect));

    handlers::public_routes().merge(protected)
}
