use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route classification and the pure authorization decision.
pub mod access;
pub mod auth;
pub mod config;
pub mod directory;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use access::{Decision, Principal, RouteTable, authorize};
pub use auth::{IdentityResolver, IdentityState, SessionResolver};
pub use config::AppConfig;
pub use directory::{DirectoryState, SupabaseDirectory, UserDirectory};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::unauthorized_page, handlers::get_session,
        handlers::get_dashboard, handlers::get_profile, handlers::lookup_user,
        handlers::grant_role, handlers::revoke_role
    ),
    components(
        schemas(
            access::Principal, models::User, models::RoleAssignment, models::DirectoryUser,
            models::RoleChangeRequest, models::LoginPage, models::SessionResponse,
            models::DashboardResponse, models::UserLookupResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "journal-portal", description = "Journal editorial portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for services and configuration. Cloned per request;
/// every field is an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Profiles and role memberships.
    pub repo: RepositoryState,
    /// Request -> principal resolution used by the gate.
    pub identity: IdentityState,
    /// Username -> user resolution for admin role management.
    pub directory: DirectoryState,
    /// The gate's route tables, immutable after startup.
    pub routes: Arc<RouteTable>,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for DirectoryState {
    fn from_ref(app_state: &AppState) -> DirectoryState {
        app_state.directory.clone()
    }
}

impl FromRef<AppState> for Arc<RouteTable> {
    fn from_ref(app_state: &AppState) -> Arc<RouteTable> {
        app_state.routes.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, layers the authorization gate over every route
/// (fallback included), then adds the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        // The fallback must exist before `layer` so unknown protected paths are gated too.
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::authorization_gate,
        ))
        .with_state(state);

    // Observability layers wrap the gate so redirects are traced as well.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with method, URI and the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
