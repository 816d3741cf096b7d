use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable by anonymous callers. `/login` and `/api/auth/*` are bypassed by
/// the gate outright so that signing in stays possible.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /login?redirectTo=...
        .route("/login", get(handlers::login_page))
        // GET /unauthorized
        // Target of the gate's insufficient-role redirect.
        .route("/unauthorized", get(handlers::unauthorized_page))
        // GET /api/auth/session
        .route("/api/auth/session", get(handlers::get_session))
}
