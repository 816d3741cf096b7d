use crate::models::{RoleAssignment, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Persistence contract for profiles and role memberships. Handlers and the identity
/// resolver only see this trait, so tests swap in in-memory implementations.
///
/// Unlike plain lookups, every method surfaces `sqlx::Error`: the identity resolver
/// must tell "no such user" apart from "database unavailable".
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    // --- Roles ---
    // Ordered by role name.
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>;
    // Returns None when the user already holds the role.
    async fn grant_role(
        &self,
        user_id: Uuid,
        role: &str,
    ) -> Result<Option<RoleAssignment>, sqlx::Error>;
    // Returns false when the user did not hold the role.
    async fn revoke_role(&self, user_id: Uuid, role: &str) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Postgres implementation over the `profiles` and `user_roles` tables defined in
/// `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, username FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// grant_role
    ///
    /// Idempotent insert: the composite primary key turns a duplicate grant into a
    /// no-op, reported as `None`.
    async fn grant_role(
        &self,
        user_id: Uuid,
        role: &str,
    ) -> Result<Option<RoleAssignment>, sqlx::Error> {
        sqlx::query_as::<_, RoleAssignment>(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            RETURNING user_id, role, granted_at
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
    }

    async fn revoke_role(&self, user_id: Uuid, role: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
