use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    AppState,
    access::{Decision, RouteTable},
    auth::resolve_principal,
};

/// authorization_gate
///
/// The single authorization checkpoint, layered over the whole router so it runs
/// before any handler.
///
/// Open and bypassed paths pass straight through without an identity lookup. For
/// protected paths the caller is resolved (a failed lookup counts as anonymous), the
/// route table decides, and on `Allow` the principal is stored in the request
/// extensions for the `AuthUser` extractor.
pub async fn authorization_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let routes = state.routes.clone();
    let path = request.uri().path().to_owned();

    if routes.is_bypassed(&path) || !routes.is_protected(&path) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let principal = resolve_principal(state.identity.as_ref(), &parts).await;

    match routes.authorize(&path, principal.as_ref()) {
        Decision::Allow => {
            if let Some(principal) = principal {
                parts.extensions.insert(principal);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        Decision::RedirectToLogin { return_to } => {
            tracing::info!(path = %path, "no session, redirecting to login");
            Redirect::temporary(&login_location(&routes, &return_to)).into_response()
        }
        Decision::RedirectToUnauthorized => {
            tracing::info!(
                path = %path,
                user_id = ?principal.as_ref().map(|p| p.id),
                "insufficient role, redirecting to unauthorized"
            );
            Redirect::temporary(&routes.unauthorized_path).into_response()
        }
    }
}

/// The login URL carrying the original path as `redirectTo`.
pub fn login_location(routes: &RouteTable, return_to: &str) -> String {
    format!(
        "{}?redirectTo={}",
        routes.login_path,
        utf8_percent_encode(return_to, NON_ALPHANUMERIC)
    )
}
