use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::access::Principal;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The user's profile record in the `public.profiles` table, mirrored from the
/// auth provider's `auth.users` row with the same id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

/// RoleAssignment
///
/// One row of `public.user_roles`: a user holding an editorial role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role: String,
    #[ts(type = "string")]
    pub granted_at: DateTime<Utc>,
}

/// DirectoryUser
///
/// A user as listed by the auth provider's admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

// --- Request Payloads ---

/// RoleChangeRequest
///
/// Input for granting or revoking a role (POST/DELETE /admin/roles). The user is
/// addressed by username and resolved through the directory.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleChangeRequest {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "reviewer")]
    pub role: String,
}

/// LoginQuery
///
/// Query parameters the gate attaches when redirecting to the login page.
#[derive(Debug, Deserialize, IntoParams, Default)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

// --- Responses ---

/// LoginPage
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginPage {
    /// Where the client should be sent after a successful login.
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// SessionResponse
///
/// Session introspection result (GET /api/auth/session). `principal` is null for
/// anonymous callers.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionResponse {
    pub principal: Option<Principal>,
}

/// DashboardResponse
///
/// The role-agnostic landing page for any authenticated user. `sections` lists the
/// route prefixes the user's roles open, in navigation order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardResponse {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub sections: Vec<String>,
}

/// UserLookupResponse
///
/// Admin view of a user resolved by username, including current roles.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserLookupResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

/// ErrorResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
