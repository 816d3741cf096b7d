use crate::{
    AppState,
    access::Principal,
    auth::{AuthUser, resolve_principal},
    models::{
        DashboardResponse, DirectoryUser, ErrorResponse, LoginPage, LoginQuery, RoleAssignment,
        RoleChangeRequest, SessionResponse, UserLookupResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::IntoResponse,
};

const ADMIN_ROLE: &str = "admin";

// --- Public & Bypass Handlers ---

/// login_page
///
/// [Bypass Route] Landing point for unauthenticated callers. The gate sends them here
/// with `redirectTo` set to the page they asked for; the client echoes it back after
/// the auth provider's sign-in completes.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login landing", body = LoginPage))
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        redirect_to: query.redirect_to,
    })
}

/// unauthorized_page
///
/// [Public Route] Target of the gate's "insufficient role" redirect.
#[utoipa::path(
    get,
    path = "/unauthorized",
    responses((status = 403, description = "Insufficient role", body = ErrorResponse))
)]
pub async fn unauthorized_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: "unauthorized".to_string(),
        }),
    )
}

/// get_session
///
/// [Bypass Route] Session introspection. The gate never resolves identity for the auth
/// API, so the handler runs the resolver itself. A failed lookup reports no principal.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn get_session(State(state): State<AppState>, request: Request) -> Json<SessionResponse> {
    let (parts, _) = request.into_parts();
    let principal = resolve_principal(state.identity.as_ref(), &parts).await;
    Json(SessionResponse { principal })
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".to_string(),
        }),
    )
}

// --- Authenticated Handlers ---

/// get_dashboard
///
/// [Authenticated Route] Role-agnostic landing page. Lists the sections the caller's
/// roles open, in route-table order.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardResponse))
)]
pub async fn get_dashboard(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Json<DashboardResponse> {
    let sections = state
        .routes
        .sections_for(&principal)
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(DashboardResponse {
        id: principal.id,
        email: principal.email,
        roles: principal.roles,
        sections,
    })
}

/// get_profile
///
/// [Authenticated Route] The caller's resolved principal.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Profile", body = Principal))
)]
pub async fn get_profile(AuthUser(principal): AuthUser) -> Json<Principal> {
    Json(principal)
}

// --- Admin Handlers ---

/// lookup_user
///
/// [Admin Route] Resolves a username through the directory and reports the user's
/// current roles.
#[utoipa::path(
    get,
    path = "/admin/users/{username}",
    params(("username" = String, Path, description = "Directory username")),
    responses(
        (status = 200, description = "Found", body = UserLookupResponse),
        (status = 404, description = "Unknown username"),
        (status = 502, description = "Directory unavailable")
    )
)]
pub async fn lookup_user(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserLookupResponse>, StatusCode> {
    require_admin(&principal)?;

    let user = find_directory_user(&state, &username).await?;
    let roles = state.repo.get_user_roles(user.id).await.map_err(|e| {
        tracing::error!("get_user_roles error: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(UserLookupResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        roles,
    }))
}

/// grant_role
///
/// [Admin Route] Grants an editorial role to the user behind `username`.
///
/// Only roles present in the route table may be granted. Granting a role the user
/// already holds is reported as 409.
#[utoipa::path(
    post,
    path = "/admin/roles",
    request_body = RoleChangeRequest,
    responses(
        (status = 200, description = "Granted", body = RoleAssignment),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "Unknown username"),
        (status = 409, description = "Role already held")
    )
)]
pub async fn grant_role(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<Json<RoleAssignment>, StatusCode> {
    require_admin(&principal)?;

    if !state.routes.knows_role(&payload.role) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = find_directory_user(&state, &payload.username).await?;

    match state.repo.grant_role(user.id, &payload.role).await {
        Ok(Some(assignment)) => {
            tracing::info!(
                granted_by = %principal.id,
                user_id = %user.id,
                role = %payload.role,
                "role granted"
            );
            Ok(Json(assignment))
        }
        Ok(None) => Err(StatusCode::CONFLICT),
        Err(e) => {
            tracing::error!("grant_role error: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// revoke_role
///
/// [Admin Route] Removes a role from the user behind `username`.
#[utoipa::path(
    delete,
    path = "/admin/roles",
    request_body = RoleChangeRequest,
    responses(
        (status = 204, description = "Revoked"),
        (status = 404, description = "Unknown username or role not held")
    )
)]
pub async fn revoke_role(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&principal)?;

    let user = find_directory_user(&state, &payload.username).await?;

    match state.repo.revoke_role(user.id, &payload.role).await {
        Ok(true) => {
            tracing::info!(
                revoked_by = %principal.id,
                user_id = %user.id,
                role = %payload.role,
                "role revoked"
            );
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("revoke_role error: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Admin handlers require the role themselves, independent of the gate.
fn require_admin(principal: &Principal) -> Result<(), StatusCode> {
    if principal.has_role(ADMIN_ROLE) {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

async fn find_directory_user(state: &AppState, username: &str) -> Result<DirectoryUser, StatusCode> {
    match state.directory.find_by_username(username).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("directory lookup error: {}", e);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}
