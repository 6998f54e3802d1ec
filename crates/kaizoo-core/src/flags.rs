//! Device flags and the launch gate.
//!
//! `onboarding_seen` and `profile_ready` are independent boolean flags in the
//! device store. Together with the authentication state they decide where
//! the app lands on startup.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::storage::{FLAG_SET, KeyValueStore, keys};

/// Where the app should land on launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Onboarding,
    SignIn,
    ProfileSetup,
    Home,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Onboarding => write!(f, "onboarding"),
            Route::SignIn => write!(f, "sign-in"),
            Route::ProfileSetup => write!(f, "profile-setup"),
            Route::Home => write!(f, "home"),
        }
    }
}

#[derive(Clone)]
pub struct DeviceFlags {
    store: Arc<dyn KeyValueStore>,
}

impl DeviceFlags {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// # Errors
    /// Returns a `Storage` error if the store cannot be read.
    pub async fn onboarding_seen(&self) -> ApiResult<bool> {
        self.is_set(keys::ONBOARDING_SEEN).await
    }

    /// # Errors
    /// Returns a `Storage` error if the store cannot be written.
    pub async fn mark_onboarding_seen(&self) -> ApiResult<()> {
        self.set(keys::ONBOARDING_SEEN).await
    }

    /// # Errors
    /// Returns a `Storage` error if the store cannot be read.
    pub async fn profile_ready(&self) -> ApiResult<bool> {
        self.is_set(keys::PROFILE_READY).await
    }

    /// # Errors
    /// Returns a `Storage` error if the store cannot be written.
    pub async fn mark_profile_ready(&self) -> ApiResult<()> {
        self.set(keys::PROFILE_READY).await
    }

    /// Clears both flags.
    ///
    /// # Errors
    /// Returns a `Storage` error if the store cannot be written.
    pub async fn reset(&self) -> ApiResult<()> {
        self.store
            .delete_many(&[keys::ONBOARDING_SEEN, keys::PROFILE_READY])
            .await
            .map_err(|e| ApiError::from_storage(&e))
    }

    /// Resolves the launch route for the current device state.
    ///
    /// # Errors
    /// Returns a `Storage` error if a flag cannot be read.
    pub async fn launch_route(&self, authenticated: bool) -> ApiResult<Route> {
        Ok(launch_route(
            self.onboarding_seen().await?,
            authenticated,
            self.profile_ready().await?,
        ))
    }

    async fn is_set(&self, key: &str) -> ApiResult<bool> {
        let value = self
            .store
            .get(key)
            .await
            .map_err(|e| ApiError::from_storage(&e))?;
        Ok(value.as_deref() == Some(FLAG_SET))
    }

    async fn set(&self, key: &str) -> ApiResult<()> {
        self.store
            .set(key, FLAG_SET)
            .await
            .map_err(|e| ApiError::from_storage(&e))
    }
}

/// Onboarding comes first, then sign-in, then profile setup.
pub fn launch_route(onboarding_seen: bool, authenticated: bool, profile_ready: bool) -> Route {
    if !onboarding_seen {
        Route::Onboarding
    } else if !authenticated {
        Route::SignIn
    } else if !profile_ready {
        Route::ProfileSetup
    } else {
        Route::Home
    }
}
