use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::AppConfig, models::DirectoryUser};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directory responded with status {0}")]
    Status(StatusCode),
}

/// UserDirectory
///
/// Username -> user resolution against the auth provider's user store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError>;
}

pub type DirectoryState = Arc<dyn UserDirectory>;

// --- Admin API wire format ---

#[derive(Deserialize)]
struct AdminUsersPage {
    #[serde(default)]
    users: Vec<AdminUser>,
}

#[derive(Deserialize)]
struct AdminUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Deserialize)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
}

impl AdminUser {
    fn username(&self) -> Option<&str> {
        self.user_metadata
            .as_ref()
            .and_then(|meta| meta.username.as_deref())
    }
}

impl From<AdminUser> for DirectoryUser {
    fn from(user: AdminUser) -> Self {
        let username = user.username().map(str::to_string);
        DirectoryUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            username,
        }
    }
}

/// SupabaseDirectory
///
/// The admin user listing has no username filter, so a lookup is a linear scan over
/// `GET /auth/v1/admin/users?page=N&per_page=M`, starting at page 1. The scan ends at
/// the first match, at a short page, or after `max_pages` pages.
#[derive(Clone)]
pub struct SupabaseDirectory {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    per_page: u32,
    max_pages: u32,
}

impl SupabaseDirectory {
    pub fn new(client: reqwest::Client, base_url: &str, service_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            per_page: 100,
            max_pages: 50,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.directory_timeout_secs))
            .build()?;
        Ok(Self::new(client, &config.supabase_url, &config.supabase_service_key)
            .with_paging(config.directory_page_size, config.directory_max_pages))
    }

    pub fn with_paging(mut self, per_page: u32, max_pages: u32) -> Self {
        self.per_page = per_page.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<AdminUser>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/admin/users", self.base_url))
            .query(&[("page", page), ("per_page", self.per_page)])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status()));
        }

        Ok(response.json::<AdminUsersPage>().await?.users)
    }
}

#[async_trait]
impl UserDirectory for SupabaseDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        let wanted = username.trim();
        if wanted.is_empty() {
            return Ok(None);
        }

        for page in 1..=self.max_pages {
            let users = self.fetch_page(page).await?;
            let fetched = users.len();

            if let Some(found) = users
                .into_iter()
                .find(|user| user.username().is_some_and(|name| name.eq_ignore_ascii_case(wanted)))
            {
                return Ok(Some(found.into()));
            }

            if fetched < self.per_page as usize {
                return Ok(None);
            }
        }

        tracing::warn!(
            username = %wanted,
            max_pages = self.max_pages,
            "directory scan hit page limit without a match"
        );
        Ok(None)
    }
}
