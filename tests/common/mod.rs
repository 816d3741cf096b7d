#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Response, request::Parts},
};
use chrono::Utc;
use journal_portal::{
    AppConfig, AppState, RouteTable, create_router,
    access::Principal,
    auth::{IdentityError, IdentityResolver, IdentityState, SessionResolver},
    directory::{DirectoryError, DirectoryState, UserDirectory},
    models::{DirectoryUser, RoleAssignment, User},
    repository::{Repository, RepositoryState},
};
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// --- In-memory Repository ---

#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub roles: Mutex<HashMap<Uuid, Vec<String>>>,
    // Every call fails as if the database were unreachable.
    pub fail: bool,
}

impl MockRepo {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_user(self, id: Uuid, email: &str, roles: &[&str]) -> Self {
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                email: email.to_string(),
                username: email.split('@').next().map(str::to_string),
            },
        );
        self.roles
            .lock()
            .unwrap()
            .insert(id, roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn roles_of(&self, id: Uuid) -> Vec<String> {
        self.roles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut roles = self.roles_of(user_id);
        roles.sort();
        Ok(roles)
    }

    async fn grant_role(
        &self,
        user_id: Uuid,
        role: &str,
    ) -> Result<Option<RoleAssignment>, sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut roles = self.roles.lock().unwrap();
        let held = roles.entry(user_id).or_default();
        if held.iter().any(|r| r == role) {
            return Ok(None);
        }
        held.push(role.to_string());
        Ok(Some(RoleAssignment {
            user_id,
            role: role.to_string(),
            granted_at: Utc::now(),
        }))
    }

    async fn revoke_role(&self, user_id: Uuid, role: &str) -> Result<bool, sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut roles = self.roles.lock().unwrap();
        let Some(held) = roles.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = held.len();
        held.retain(|r| r != role);
        Ok(held.len() < before)
    }
}

// --- In-memory Directory ---

#[derive(Default)]
pub struct MockDirectory {
    pub users: Vec<DirectoryUser>,
    pub fail: bool,
}

impl MockDirectory {
    pub fn with_user(mut self, id: Uuid, email: &str, username: &str) -> Self {
        self.users.push(DirectoryUser {
            id,
            email: email.to_string(),
            username: Some(username.to_string()),
        });
        self
    }

    pub fn failing() -> Self {
        Self {
            users: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        if self.fail {
            return Err(DirectoryError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(self
            .users
            .iter()
            .find(|u| {
                u.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(username))
            })
            .cloned())
    }
}

// --- Fixed Identity ---

/// Resolves every request to the same principal without touching the repository.
pub struct FixedIdentity(pub Principal);

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self, _parts: &Parts) -> Result<Option<Principal>, IdentityError> {
        Ok(Some(self.0.clone()))
    }
}

// --- App Builders ---

/// State with the real `SessionResolver` over the mock repository, in `Env::Local`
/// so the `x-user-id` header works as a session.
pub fn app_state(repo: Arc<MockRepo>, directory: MockDirectory) -> AppState {
    let config = AppConfig::default();
    let repo = repo as RepositoryState;
    let identity = Arc::new(SessionResolver::new(repo.clone(), &config)) as IdentityState;

    AppState {
        repo,
        identity,
        directory: Arc::new(directory) as DirectoryState,
        routes: Arc::new(RouteTable::default()),
        config,
    }
}

pub fn app(repo: Arc<MockRepo>, directory: MockDirectory) -> Router {
    create_router(app_state(repo, directory))
}

/// Router whose identity comes from `identity` instead of the session resolver, so the
/// repository can fail without locking the caller out at the gate.
pub fn app_with_identity(
    repo: Arc<MockRepo>,
    directory: MockDirectory,
    identity: Principal,
) -> Router {
    let mut state = app_state(repo, directory);
    state.identity = Arc::new(FixedIdentity(identity)) as IdentityState;
    create_router(state)
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
