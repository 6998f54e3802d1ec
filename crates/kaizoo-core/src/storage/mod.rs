//! Device key-value storage.
//!
//! An opaque get/set/delete store used for credentials and device flags.
//! Boolean flags are stored as `"1"` or absent.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Fixed storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "kaizoo.access_token";
    pub const REFRESH_TOKEN: &str = "kaizoo.refresh_token";
    pub const ONBOARDING_SEEN: &str = "kaizoo.onboarding_seen";
    pub const PROFILE_READY: &str = "kaizoo.profile_ready";
}

/// Value written for a set boolean flag.
pub const FLAG_SET: &str = "1";

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes several keys. Missing keys are ignored.
    async fn delete_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}
