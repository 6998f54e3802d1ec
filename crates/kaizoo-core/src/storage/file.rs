//! JSON-file backed store at `<KAIZOO_HOME>/storage.json`.
//!
//! The file holds bearer tokens, so it is written with restricted permissions
//! (0600) and replaced atomically.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::config::paths;

type Entries = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Opens the store at the default location.
    pub fn open_default() -> Self {
        Self::new(paths::storage_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Entries> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_entries(&path))
            .await
            .context("storage read task failed")?
    }

    async fn write(&self, entries: Entries) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || save_entries(&path, &entries))
            .await
            .context("storage write task failed")?
    }

    async fn update(&self, apply: impl FnOnce(&mut Entries) + Send) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        apply(&mut entries);
        self.write(entries).await
    }
}

/// Loads entries from disk. A missing file reads as empty.
fn load_entries(path: &Path) -> Result<Entries> {
    if !path.exists() {
        return Ok(Entries::new());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read storage from {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Entries::new());
    }

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse storage from {}", path.display()))
}

/// Saves entries via temp file + rename, with 0600 permissions on unix.
fn save_entries(path: &Path, entries: &Entries) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(entries).context("Failed to serialize storage")?;
    let tmp_path = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
    }

    #[cfg(not(unix))]
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        )
    })
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.update(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.update(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_string()).collect();
        self.update(move |entries| {
            for key in &keys {
                entries.remove(key);
            }
        })
        .await
    }
}
