use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Default Journal Route Tables ---

/// Path prefixes that require an authenticated principal.
const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/admin",
    "/manager",
    "/editor",
    "/reviewer",
    "/author",
    "/profile",
];

/// Role -> path prefixes that role may access, in evaluation order.
const ROLE_ROUTES: &[(&str, &[&str])] = &[
    ("admin", &["/admin", "/manager", "/editor", "/dashboard"]),
    ("manager", &["/manager", "/editor", "/dashboard"]),
    ("editor", &["/editor", "/dashboard"]),
    ("section_editor", &["/editor", "/dashboard"]),
    ("reviewer", &["/reviewer", "/dashboard"]),
    ("author", &["/author", "/dashboard"]),
];

const LOGIN_PATH: &str = "/login";
const AUTH_API_PREFIX: &str = "/api/auth";
const DASHBOARD_PATH: &str = "/dashboard";
const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Principal
///
/// The resolved identity of the caller for a single request. It is produced by an
/// `IdentityResolver` and only ever read by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    /// Role identifiers, e.g. "admin", "reviewer", "author".
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self) -> bool {
        !self.roles.is_empty()
    }
}

/// PrefixMatch
///
/// How a request path is compared against a configured prefix.
///
/// - `Plain`: raw string prefix comparison. `/admin2` matches `/admin`.
/// - `Segment`: the prefix must end on a path-segment boundary. `/admin2` does not
///   match `/admin`, while `/admin` and `/admin/users` do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixMatch {
    #[default]
    Plain,
    Segment,
}

impl PrefixMatch {
    pub fn matches(self, path: &str, prefix: &str) -> bool {
        match self {
            PrefixMatch::Plain => path.starts_with(prefix),
            PrefixMatch::Segment => match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
                None => false,
            },
        }
    }
}

impl FromStr for PrefixMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(PrefixMatch::Plain),
            "segment" => Ok(PrefixMatch::Segment),
            other => Err(format!("unknown prefix match mode '{}'", other)),
        }
    }
}

/// Decision
///
/// The outcome of evaluating the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the route handler.
    Allow,
    /// No principal. `return_to` carries the original path so the client can be
    /// sent back after logging in.
    RedirectToLogin { return_to: String },
    /// Authenticated, but none of the principal's roles grant this path.
    RedirectToUnauthorized,
}

/// RouteTable
///
/// The immutable route classification tables. Built once at startup and shared
/// read-only (behind an `Arc`) by every request, so alternate tables can be
/// injected in tests.
#[derive(Debug, Clone)]
pub struct RouteTable {
    pub protected_prefixes: Vec<String>,
    /// Ordered role -> prefixes mapping. Iteration follows declaration order.
    pub role_routes: Vec<(String, Vec<String>)>,
    pub login_path: String,
    pub auth_api_prefix: String,
    pub dashboard_path: String,
    pub unauthorized_path: String,
    pub prefix_match: PrefixMatch,
}

impl Default for RouteTable {
    /// The journal's editorial route table.
    fn default() -> Self {
        Self::new(
            PROTECTED_PREFIXES.iter().copied(),
            ROLE_ROUTES
                .iter()
                .map(|(role, prefixes)| (*role, prefixes.iter().copied())),
        )
    }
}

impl RouteTable {
    /// Builds a table with the standard login, auth-API, dashboard and unauthorized paths.
    pub fn new<P, R, K, I>(protected_prefixes: P, role_routes: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator<Item = (K, I)>,
        K: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            protected_prefixes: protected_prefixes.into_iter().map(Into::into).collect(),
            role_routes: role_routes
                .into_iter()
                .map(|(role, prefixes)| {
                    (
                        role.into(),
                        prefixes.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
            login_path: LOGIN_PATH.to_string(),
            auth_api_prefix: AUTH_API_PREFIX.to_string(),
            dashboard_path: DASHBOARD_PATH.to_string(),
            unauthorized_path: UNAUTHORIZED_PATH.to_string(),
            prefix_match: PrefixMatch::default(),
        }
    }

    pub fn with_prefix_match(mut self, prefix_match: PrefixMatch) -> Self {
        self.prefix_match = prefix_match;
        self
    }

    /// Paths that must stay reachable without a session so that logging in is possible.
    pub fn is_bypassed(&self, path: &str) -> bool {
        path == self.login_path || self.prefix_match.matches(path, &self.auth_api_prefix)
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| self.prefix_match.matches(path, prefix))
    }

    /// Role keys whose prefix list covers `path`, in table order.
    pub fn matched_roles(&self, path: &str) -> Vec<&str> {
        self.role_routes
            .iter()
            .filter(|(_, prefixes)| {
                prefixes
                    .iter()
                    .any(|prefix| self.prefix_match.matches(path, prefix))
            })
            .map(|(role, _)| role.as_str())
            .collect()
    }

    pub fn knows_role(&self, role: &str) -> bool {
        self.role_routes.iter().any(|(known, _)| known == role)
    }

    /// The distinct prefixes reachable through the principal's roles, in table order.
    /// Used to build the dashboard navigation.
    pub fn sections_for(&self, principal: &Principal) -> Vec<&str> {
        let mut sections: Vec<&str> = Vec::new();
        for (role, prefixes) in &self.role_routes {
            if !principal.has_role(role) {
                continue;
            }
            for prefix in prefixes {
                if !sections.contains(&prefix.as_str()) {
                    sections.push(prefix);
                }
            }
        }
        sections
    }

    pub fn authorize(&self, path: &str, principal: Option<&Principal>) -> Decision {
        authorize(self, path, principal)
    }
}

/// authorize
///
/// Evaluates the gate for one request. Pure: the result depends only on the path,
/// the principal and the table.
///
/// 1. The login path and the auth API are always reachable.
/// 2. Paths outside every protected prefix are open.
/// 3. Protected paths without a principal redirect to login.
/// 4. The dashboard is open to any principal holding at least one role.
/// 5. Otherwise, if any role route covers the path, the principal must hold one of
///    those roles. A protected path no role route covers needs authentication only.
pub fn authorize(table: &RouteTable, path: &str, principal: Option<&Principal>) -> Decision {
    if table.is_bypassed(path) {
        return Decision::Allow;
    }

    if !table.is_protected(path) {
        return Decision::Allow;
    }

    let Some(principal) = principal else {
        return Decision::RedirectToLogin {
            return_to: path.to_string(),
        };
    };

    if path == table.dashboard_path && principal.has_any_role() {
        return Decision::Allow;
    }

    let matched = table.matched_roles(path);
    if matched.is_empty() {
        return Decision::Allow;
    }

    if matched.iter().any(|role| principal.has_role(role)) {
        Decision::Allow
    } else {
        Decision::RedirectToUnauthorized
    }
}
