//! Per-invocation wiring: storage, credentials, client and services.

use std::sync::Arc;

use anyhow::{Context, Result};
use kaizoo_core::ApiClient;
use kaizoo_core::auth::{CredentialProvider, StoredCredentials};
use kaizoo_core::community::{CommunityFeed, community_api};
use kaizoo_core::config::Config;
use kaizoo_core::flags::DeviceFlags;
use kaizoo_core::services::{ActivityService, AuthService, ChallengeService, ProfileService};
use kaizoo_core::storage::{FileStore, KeyValueStore};
use serde::Serialize;

pub struct App {
    pub config: Config,
    pub credentials: Arc<StoredCredentials>,
    pub client: Arc<ApiClient>,
    pub flags: DeviceFlags,
    json: bool,
}

impl App {
    pub fn open(config: Config, json: bool) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open_default());
        let credentials = Arc::new(StoredCredentials::new(Arc::clone(&store)));
        let client = ApiClient::new(
            &config,
            Arc::clone(&credentials) as Arc<dyn CredentialProvider>,
        )
        .context("create API client")?;

        Ok(Self {
            config,
            credentials,
            client: Arc::new(client),
            flags: DeviceFlags::new(store),
            json,
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.client), Arc::clone(&self.credentials))
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(Arc::clone(&self.client), self.flags.clone())
    }

    pub fn activities(&self) -> ActivityService {
        ActivityService::new(Arc::clone(&self.client))
    }

    pub fn challenges(&self) -> ChallengeService {
        ChallengeService::new(Arc::clone(&self.client))
    }

    pub fn feed(&self) -> CommunityFeed {
        CommunityFeed::new(community_api(Arc::clone(&self.client), &self.config))
    }

    /// Prints `value` as JSON with `--json`, otherwise through `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            let out = serde_json::to_string_pretty(value).context("encode JSON output")?;
            println!("{out}");
        } else {
            human(value);
        }
        Ok(())
    }
}
