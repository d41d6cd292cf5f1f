//! Installed-version tracking
//!
//! The map from [`PackageKey`] to installed version is the single source of
//! truth for "installed". It is persisted as a pretty-printed JSON object; a
//! missing or unreadable file is treated as an empty map.

use crate::catalog::{PackageKey, ScriptEntry};
use crate::error::StoreError;
use crate::storage::Storage;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Location of the version map relative to the storage root
pub const VERSIONS_FILE: &str = "BruceAppStore/installed.json";

/// Key under which the store itself is recorded as installed
pub const SELF_PACKAGE_KEY: &str = "emericklaw/Bruce-App-Store:App Store";

/// Version seeded for [`SELF_PACKAGE_KEY`] on first run
pub const SELF_SEED_VERSION: &str = "0.0.0";

/// Installed state of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    UpdateAvailable,
    UpToDate,
}

impl InstallState {
    pub fn label(&self) -> &'static str {
        match self {
            InstallState::NotInstalled => "NOT INSTALLED",
            InstallState::UpdateAvailable => "UPDATE AVAILABLE",
            InstallState::UpToDate => "UP TO DATE",
        }
    }

    pub fn is_installed(&self) -> bool {
        !matches!(self, InstallState::NotInstalled)
    }
}

/// Persisted map of installed package versions
pub struct VersionStore {
    storage: Arc<dyn Storage>,
    path: PathBuf,
    versions: BTreeMap<PackageKey, String>,
}

impl VersionStore {
    /// Create an empty store backed by `path` inside `storage`
    pub fn new(storage: Arc<dyn Storage>, path: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            path: path.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Create a store at the default location and load it
    pub async fn open(storage: Arc<dyn Storage>) -> Self {
        let mut store = Self::new(storage, VERSIONS_FILE);
        store.load().await;
        store
    }

    /// Replace the in-memory map with the persisted one.
    ///
    /// Never fails: a missing file means nothing is installed and a corrupt one
    /// is logged and treated the same way. Afterwards the store's own key is
    /// seeded if absent.
    pub async fn load(&mut self) {
        self.versions = match self.storage.read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    let err = StoreError::StorageCorrupt(e.to_string());
                    tracing::warn!("{}, starting with an empty version map", err);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No version map at {}", self.path.display());
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
        };

        let seed = PackageKey::from(SELF_PACKAGE_KEY);
        if !self.versions.contains_key(&seed) {
            self.versions.insert(seed, SELF_SEED_VERSION.to_string());
            self.persist().await;
        }

        tracing::debug!("Loaded {} installed version(s)", self.versions.len());
    }

    /// Write the map back to storage. Failures are logged and otherwise
    /// ignored; the in-memory map stays authoritative for this session.
    pub async fn persist(&self) {
        let content = match serde_json::to_string_pretty(&self.versions) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to serialize version map: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.write(&self.path, content.as_bytes()).await {
            tracing::warn!("Failed to save {}: {}", self.path.display(), e);
        }
    }

    pub fn get(&self, key: &PackageKey) -> Option<&str> {
        self.versions.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: PackageKey, version: impl Into<String>) {
        self.versions.insert(key, version.into());
    }

    pub fn remove(&mut self, key: &PackageKey) -> Option<String> {
        self.versions.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageKey, &str)> {
        self.versions.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn state_of(&self, entry: &ScriptEntry) -> InstallState {
        match self.get(&entry.key()) {
            None => InstallState::NotInstalled,
            Some(installed) if installed != entry.version => InstallState::UpdateAvailable,
            Some(_) => InstallState::UpToDate,
        }
    }

    /// True when nothing is installed for the entry or the installed version differs
    pub fn needs_update(&self, entry: &ScriptEntry) -> bool {
        self.state_of(entry) != InstallState::UpToDate
    }

    /// True when the entry is installed at a version other than the declared one
    pub fn has_update(&self, entry: &ScriptEntry) -> bool {
        self.state_of(entry) == InstallState::UpdateAvailable
    }
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("path", &self.path)
            .field("versions", &self.versions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use std::path::Path;

    fn entry(version: &str) -> ScriptEntry {
        ScriptEntry {
            name: "Clock".to_string(),
            owner: "alice".to_string(),
            repo: "tools".to_string(),
            description: String::new(),
            version: version.to_string(),
            release_tag: None,
            category: "Tools".to_string(),
            metadata_reference: None,
            inline_files: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_seeded_map() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::open(Arc::new(FsStorage::new(dir.path()))).await;

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&PackageKey::from(SELF_PACKAGE_KEY)),
            Some(SELF_SEED_VERSION)
        );
        assert!(dir.path().join(VERSIONS_FILE).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FsStorage::new(dir.path()));
        storage
            .write(Path::new(VERSIONS_FILE), b"{ not json")
            .await
            .unwrap();

        let store = VersionStore::open(storage).await;
        assert_eq!(store.len(), 1);
        assert!(store.get(&PackageKey::from("alice/tools:Clock")).is_none());
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new(dir.path()));

        let mut store = VersionStore::open(storage.clone()).await;
        store.set(PackageKey::from("alice/tools:Clock"), "1.1");
        store.set(PackageKey::from("bob/themes"), "v2 beta");
        store.persist().await;

        let reloaded = VersionStore::open(storage).await;
        assert_eq!(
            reloaded.iter().collect::<Vec<_>>(),
            store.iter().collect::<Vec<_>>()
        );

        let raw = std::fs::read_to_string(dir.path().join(VERSIONS_FILE)).unwrap();
        assert!(raw.contains("\n  \"alice/tools:Clock\": \"1.1\""));
    }

    #[tokio::test]
    async fn persist_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        std::fs::create_dir_all(dir.path().join(VERSIONS_FILE)).unwrap();

        let mut store = VersionStore::open(Arc::new(FsStorage::new(dir.path()))).await;
        store.set(PackageKey::from("alice/tools:Clock"), "1.1");
        store.persist().await;
        assert_eq!(store.get(&PackageKey::from("alice/tools:Clock")), Some("1.1"));
    }

    #[test]
    fn needs_update_tracks_stored_version() {
        let dir = std::env::temp_dir();
        let mut store = VersionStore::new(Arc::new(FsStorage::new(dir)), VERSIONS_FILE);
        let clock = entry("1.1");

        assert!(store.needs_update(&clock));
        assert_eq!(store.state_of(&clock), InstallState::NotInstalled);

        store.set(clock.key(), "1.0");
        assert!(store.needs_update(&clock));
        assert!(store.has_update(&clock));
        assert_eq!(store.state_of(&clock).label(), "UPDATE AVAILABLE");

        store.set(clock.key(), "1.1");
        assert!(!store.needs_update(&clock));
        assert!(!store.has_update(&clock));
        assert_eq!(store.state_of(&clock), InstallState::UpToDate);
    }
}
