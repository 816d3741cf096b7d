mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{MockDirectory, MockRepo, app, body_json, location};
use journal_portal::models::{DashboardResponse, LoginPage, SessionResponse};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN_ID: Uuid = Uuid::from_u128(1);
const REVIEWER_ID: Uuid = Uuid::from_u128(2);
const READER_ID: Uuid = Uuid::from_u128(3);

fn seeded_repo() -> Arc<MockRepo> {
    Arc::new(
        MockRepo::default()
            .with_user(ADMIN_ID, "admin@journal.test", &["admin"])
            .with_user(REVIEWER_ID, "reviewer@journal.test", &["reviewer"])
            .with_user(READER_ID, "reader@journal.test", &[]),
    )
}

fn get(uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = user {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

// --- Open Routes ---

#[tokio::test]
async fn test_health_is_open() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_page_is_open() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/unauthorized", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_page_echoes_redirect_target() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/login?redirectTo=%2Feditor%2Fqueue", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page: LoginPage = body_json(response).await;
    assert_eq!(page.redirect_to.as_deref(), Some("/editor/queue"));
}

// --- Redirect To Login ---

#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_login() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/dashboard", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirectTo=%2Fdashboard");
}

#[tokio::test]
async fn test_anonymous_admin_path_keeps_full_return_path() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/admin/dashboard", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/login?redirectTo=%2Fadmin%2Fdashboard"
    );
}

#[tokio::test]
async fn test_unknown_user_header_is_anonymous() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/profile", Some(Uuid::from_u128(99))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirectTo=%2Fprofile");
}

#[tokio::test]
async fn test_identity_backend_failure_is_treated_as_no_session() {
    let repo = Arc::new(MockRepo::failing());
    let response = app(repo, MockDirectory::default())
        .oneshot(get("/dashboard", Some(ADMIN_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirectTo=%2Fdashboard");
}

// --- Redirect To Unauthorized ---

#[tokio::test]
async fn test_reviewer_is_kept_out_of_admin() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/admin/users/jdoe", Some(REVIEWER_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/unauthorized");
}

#[tokio::test]
async fn test_unrouted_protected_path_is_still_gated() {
    let router = app(seeded_repo(), MockDirectory::default());

    let denied = router
        .clone()
        .oneshot(get("/editor/workflow", Some(REVIEWER_ID)))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&denied), "/unauthorized");

    // Allowed through the gate, then no route matches.
    let allowed = router
        .oneshot(get("/editor/workflow", Some(ADMIN_ID)))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_roleless_user_cannot_open_dashboard() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/dashboard", Some(READER_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/unauthorized");
}

// --- Allow ---

#[tokio::test]
async fn test_dashboard_lists_sections_for_reviewer() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/dashboard", Some(REVIEWER_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let dashboard: DashboardResponse = body_json(response).await;
    assert_eq!(dashboard.id, REVIEWER_ID);
    assert_eq!(dashboard.roles, vec!["reviewer"]);
    assert_eq!(dashboard.sections, vec!["/reviewer", "/dashboard"]);
}

#[tokio::test]
async fn test_profile_needs_session_only() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/profile", Some(READER_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// --- Session Introspection ---

#[tokio::test]
async fn test_session_reports_anonymous_caller() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/api/auth/session", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session: SessionResponse = body_json(response).await;
    assert!(session.principal.is_none());
}

#[tokio::test]
async fn test_session_reports_principal_and_roles() {
    let response = app(seeded_repo(), MockDirectory::default())
        .oneshot(get("/api/auth/session", Some(ADMIN_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session: SessionResponse = body_json(response).await;
    let principal = session.principal.expect("principal");
    assert_eq!(principal.id, ADMIN_ID);
    assert_eq!(principal.email, "admin@journal.test");
    assert_eq!(principal.roles, vec!["admin"]);
}

#[tokio::test]
async fn test_session_lookup_failure_reports_no_principal() {
    let response = app(Arc::new(MockRepo::failing()), MockDirectory::default())
        .oneshot(get("/api/auth/session", Some(ADMIN_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session: SessionResponse = body_json(response).await;
    assert!(session.principal.is_none());
}
