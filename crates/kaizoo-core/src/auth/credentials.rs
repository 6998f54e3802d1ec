//! Credential pair ownership.
//!
//! Tokens live in the device key-value store under fixed keys. Only the
//! refresh routine and the explicit login/register/logout paths write them;
//! everything else reads through [`CredentialProvider`].

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::storage::{KeyValueStore, keys};

/// Access + refresh bearer tokens, both opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The authenticated user as returned by login/register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// Source of credentials for the request pipeline.
///
/// Passed explicitly into [`crate::ApiClient::new`] at startup.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> ApiResult<Option<String>>;

    async fn refresh_token(&self) -> ApiResult<Option<String>>;

    /// Persists a new access token, and the refresh token when one is given.
    async fn store(&self, access_token: &str, refresh_token: Option<&str>) -> ApiResult<()>;

    /// Removes both tokens and resets any in-memory authenticated-user state.
    async fn clear(&self) -> ApiResult<()>;
}

/// [`CredentialProvider`] backed by a [`KeyValueStore`] plus the in-memory
/// session user.
pub struct StoredCredentials {
    kv: Arc<dyn KeyValueStore>,
    user: RwLock<Option<SessionUser>>,
}

impl StoredCredentials {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv: store,
            user: RwLock::new(None),
        }
    }

    /// Persists a full session after login or registration.
    ///
    /// # Errors
    /// Returns a `Storage` error if the tokens cannot be written.
    pub async fn start_session(&self, pair: &CredentialPair, user: SessionUser) -> ApiResult<()> {
        self.store(&pair.access_token, Some(&pair.refresh_token))
            .await?;
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        Ok(())
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_user(&self, user: Option<SessionUser>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    /// Returns true when an access token is stored.
    ///
    /// # Errors
    /// Returns a `Storage` error if the store cannot be read.
    pub async fn is_authenticated(&self) -> ApiResult<bool> {
        Ok(self.access_token().await?.is_some())
    }
}

#[async_trait::async_trait]
impl CredentialProvider for StoredCredentials {
    async fn access_token(&self) -> ApiResult<Option<String>> {
        read_token(self.kv.as_ref(), keys::ACCESS_TOKEN).await
    }

    async fn refresh_token(&self) -> ApiResult<Option<String>> {
        read_token(self.kv.as_ref(), keys::REFRESH_TOKEN).await
    }

    async fn store(&self, access_token: &str, refresh_token: Option<&str>) -> ApiResult<()> {
        self.kv
            .set(keys::ACCESS_TOKEN, access_token)
            .await
            .map_err(|e| ApiError::from_storage(&e))?;
        if let Some(refresh) = refresh_token {
            self.kv
                .set(keys::REFRESH_TOKEN, refresh)
                .await
                .map_err(|e| ApiError::from_storage(&e))?;
        }
        Ok(())
    }

    async fn clear(&self) -> ApiResult<()> {
        self.set_user(None);
        self.kv
            .delete_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN])
            .await
            .map_err(|e| ApiError::from_storage(&e))
    }
}

/// Empty values count as absent.
async fn read_token(store: &dyn KeyValueStore, key: &str) -> ApiResult<Option<String>> {
    let value = store
        .get(key)
        .await
        .map_err(|e| ApiError::from_storage(&e))?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Masks a token for display. Tokens are never logged in full.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}
