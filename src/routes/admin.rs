use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Nested under `/admin`, which the route table grants to the 'admin' role only.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users/{username}
        // Directory lookup by username, with the user's current roles.
        .route("/users/{username}", get(handlers::lookup_user))
        // POST /admin/roles grants, DELETE /admin/roles revokes.
        .route(
            "/roles",
            post(handlers::grant_role).delete(handlers::revoke_role),
        )
}
