use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Role-agnostic pages. `/dashboard` is open to any principal with at least one role;
/// `/profile` is protected but has no role route, so a session alone suffices.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/profile", get(handlers::get_profile))
}
