//! Profile read and update.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, ApiResult};
use crate::flags::DeviceFlags;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub height_cm: Option<u16>,
    #[serde(default)]
    pub weight_kg: Option<f32>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub streak_days: u32,
}

/// Partial update; absent fields are left unchanged server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub struct ProfileService {
    client: Arc<ApiClient>,
    flags: DeviceFlags,
}

impl ProfileService {
    pub fn new(client: Arc<ApiClient>, flags: DeviceFlags) -> Self {
        Self { client, flags }
    }

    /// # Errors
    /// Returns the pipeline failure.
    pub async fn get(&self) -> ApiResult<Profile> {
        self.client.send_json(ApiRequest::get("/profile")).await
    }

    /// Saves the profile and marks it ready on this device.
    ///
    /// # Errors
    /// `Validation` for an empty or out-of-range update, otherwise the
    /// pipeline failure.
    pub async fn update(&self, update: &ProfileUpdate) -> ApiResult<Profile> {
        validate_update(update)?;
        let profile = self
            .client
            .send_json(ApiRequest::put("/profile").body(update)?)
            .await?;
        self.flags.mark_profile_ready().await?;
        Ok(profile)
    }
}

fn validate_update(update: &ProfileUpdate) -> ApiResult<()> {
    if update.is_empty() {
        return Err(ApiError::invalid_field("profile", "Nothing to update"));
    }
    if let Some(name) = &update.display_name
        && name.trim().is_empty()
    {
        return Err(ApiError::invalid_field("displayName", "Display name cannot be blank"));
    }
    if update.height_cm.is_some_and(|h| !(50..=300).contains(&h)) {
        return Err(ApiError::invalid_field("heightCm", "Height must be between 50 and 300 cm"));
    }
    if update.weight_kg.is_some_and(|w| !(20.0..=500.0).contains(&w)) {
        return Err(ApiError::invalid_field("weightKg", "Weight must be between 20 and 500 kg"));
    }
    Ok(())
}
