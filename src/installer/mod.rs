//! Install, update and delete of single catalog entries
//!
//! Install is best-effort per file but all-or-nothing at the version level:
//! every file is attempted, and the version map is only updated when all of
//! them landed. Files written before a failure are left on disk.

use crate::catalog::{FullMetadata, PackageKey, ScriptEntry};
use crate::error::{StoreError, StoreResult};
use crate::remote::{Endpoints, Release, Transport};
use crate::storage::{sanitize_destination, Storage};
use crate::versions::VersionStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Install directory for regular scripts, relative to the storage root
pub const SCRIPTS_DIR: &str = "scripts";

/// Install directory for entries of the Themes category
pub const THEMES_DIR: &str = "Themes";

/// Outcome of an install attempt that got as far as the file loop
#[derive(Debug)]
pub struct InstallReport {
    pub key: PackageKey,
    pub name: String,
    pub version: String,
    pub total: usize,
    pub succeeded: usize,
    pub errors: Vec<StoreError>,
}

impl InstallReport {
    /// Whether the version map was updated
    pub fn committed(&self) -> bool {
        self.succeeded == self.total && self.errors.is_empty()
    }

    pub fn status_message(&self) -> String {
        match self.errors.last() {
            None if self.committed() => format!("{} installed successfully!", self.name),
            Some(err) => err.to_string(),
            None => format!("{} installed partially", self.name),
        }
    }
}

/// Outcome of a delete attempt that got as far as the file loop
#[derive(Debug)]
pub struct DeleteReport {
    pub key: PackageKey,
    pub name: String,
    pub total: usize,
    pub removed: usize,
    pub errors: Vec<StoreError>,
}

impl DeleteReport {
    /// Whether the version entry was dropped
    pub fn committed(&self) -> bool {
        self.removed > 0
    }

    pub fn status_message(&self) -> String {
        if self.committed() {
            format!("{} deleted successfully!", self.name)
        } else {
            "Failed to delete script files".to_string()
        }
    }
}

/// Directory an entry installs into
pub fn install_dir(entry: &ScriptEntry) -> PathBuf {
    if entry.is_theme() {
        PathBuf::from(THEMES_DIR)
    } else {
        PathBuf::from(SCRIPTS_DIR)
    }
}

/// Runs package lifecycle operations against the transport and storage
pub struct PackageInstaller {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    endpoints: Endpoints,
}

impl PackageInstaller {
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            storage,
            endpoints,
        }
    }

    /// True iff nothing is installed for the entry or the installed version differs
    pub fn needs_update(&self, entry: &ScriptEntry, versions: &VersionStore) -> bool {
        versions.needs_update(entry)
    }

    /// Fetch the file list for an entry; never cached.
    ///
    /// Entries from legacy catalogs carry their file list inline and are served
    /// from it when they have no metadata reference.
    pub async fn fetch_metadata(&self, entry: &ScriptEntry) -> StoreResult<FullMetadata> {
        let Some(reference) = entry.metadata_reference.as_deref() else {
            if entry.inline_files.is_empty() {
                return Err(StoreError::MalformedMetadata {
                    reference: entry.key().to_string(),
                    reason: "no metadata reference and no file list".to_string(),
                });
            }
            return Ok(FullMetadata {
                tag: entry.release_tag.clone(),
                files: entry.inline_files.clone(),
            });
        };

        let url = self.endpoints.metadata(reference);
        let body = self
            .transport
            .get(&url)
            .await
            .map_err(|source| StoreError::MetadataFetchFailed {
                reference: reference.to_string(),
                source,
            })?;

        FullMetadata::parse(&body).map_err(|e| StoreError::MalformedMetadata {
            reference: reference.to_string(),
            reason: e.to_string(),
        })
    }

    fn release<'a>(entry: &'a ScriptEntry, metadata: &'a FullMetadata) -> Release<'a> {
        if !entry.has_known_version() {
            return Release::Latest;
        }
        let tag = metadata
            .tag
            .as_deref()
            .or(entry.release_tag.as_deref())
            .unwrap_or(&entry.version);
        Release::Tag(tag)
    }

    /// Install or update an entry.
    ///
    /// Errors before the file loop (no network, metadata unavailable) leave the
    /// version map untouched. Otherwise the returned report tells whether the
    /// version was committed.
    pub async fn install(
        &self,
        entry: &ScriptEntry,
        versions: &mut VersionStore,
        progress: &mut dyn FnMut(&str),
    ) -> StoreResult<InstallReport> {
        progress("Connecting...");
        if !self.transport.is_online().await {
            return Err(StoreError::NetworkUnavailable);
        }

        progress(&format!("Downloading {}...", entry.name));
        let metadata = self.fetch_metadata(entry).await?;

        let key = entry.key();
        let base_dir = install_dir(entry);
        let release = Self::release(entry, &metadata);
        let total = metadata.files.len();
        tracing::info!("Installing {} ({} file(s), {:?})", key, total, release);

        let mut report = InstallReport {
            key,
            name: entry.name.clone(),
            version: entry.version.clone(),
            total,
            succeeded: 0,
            errors: Vec::new(),
        };

        for (i, file) in metadata.files.iter().enumerate() {
            let dest = base_dir.join(sanitize_destination(&file.destination));
            let url = self
                .endpoints
                .file(&entry.owner, &entry.repo, release, &file.source);
            tracing::debug!("Downloading {} -> {}", url, dest.display());

            let body = match self.transport.get(&url).await {
                Ok(body) => body,
                Err(source) => {
                    tracing::warn!("Download of {} failed: {}", file.source, source);
                    report.errors.push(StoreError::FileFetchFailed {
                        file: file.source.clone(),
                        source,
                    });
                    continue;
                }
            };

            progress(&format!("Downloading {} of {}...", i + 1, total));

            match self.storage.write(&dest, &body).await {
                Ok(()) => report.succeeded += 1,
                Err(source) => {
                    tracing::warn!("Write of {} failed: {}", dest.display(), source);
                    report
                        .errors
                        .push(StoreError::FileWriteFailed { path: dest, source });
                }
            }
        }

        if report.committed() {
            versions.set(report.key.clone(), entry.version.clone());
            versions.persist().await;
            tracing::info!("Installed {} at {}", report.key, entry.version);
        } else {
            tracing::warn!(
                "Install of {} incomplete: {}/{} file(s), {} error(s); version not recorded",
                report.key,
                report.succeeded,
                report.total,
                report.errors.len()
            );
        }

        Ok(report)
    }

    /// Remove an entry's files and forget its version if at least one file was removed
    pub async fn delete(
        &self,
        entry: &ScriptEntry,
        versions: &mut VersionStore,
    ) -> StoreResult<DeleteReport> {
        let metadata = self.fetch_metadata(entry).await?;
        let base_dir = install_dir(entry);

        let mut report = DeleteReport {
            key: entry.key(),
            name: entry.name.clone(),
            total: metadata.files.len(),
            removed: 0,
            errors: Vec::new(),
        };

        for file in &metadata.files {
            let path = base_dir.join(sanitize_destination(&file.destination));
            tracing::debug!("Deleting {}", path.display());
            match self.storage.remove(&path).await {
                Ok(()) => report.removed += 1,
                Err(source) => report.errors.push(StoreError::FileDeleteFailed { path, source }),
            }
        }

        if report.committed() {
            versions.remove(&report.key);
            versions.persist().await;
            tracing::info!("Deleted {} ({}/{} file(s))", report.key, report.removed, report.total);
        } else {
            tracing::warn!("Delete of {} removed no files", report.key);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::storage::FsStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    const BASE: &str = "http://store.test/";

    #[derive(Default)]
    struct StubTransport {
        offline: bool,
        responses: HashMap<String, Result<Vec<u8>, FetchError>>,
        requests: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn respond(mut self, url: &str, body: &str) -> Self {
            self.responses
                .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
            self
        }

        fn fail(mut self, url: &str, status: u16) -> Self {
            self.responses
                .insert(url.to_string(), Err(FetchError::Status(status)));
            self
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn is_online(&self) -> bool {
            !self.offline
        }

        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)))
        }
    }

    fn clock(category: &str) -> ScriptEntry {
        ScriptEntry {
            name: "Clock".to_string(),
            owner: "alice".to_string(),
            repo: "tools".to_string(),
            description: "A clock".to_string(),
            version: "1.1".to_string(),
            release_tag: None,
            category: category.to_string(),
            metadata_reference: Some("alice/clock.json".to_string()),
            inline_files: Vec::new(),
        }
    }

    fn metadata_url() -> String {
        format!("{}service/main/filename-last/alice/clock.json", BASE)
    }

    fn file_url(source: &str) -> String {
        format!(
            "{}service/release/owner/alice/repository/tools/tag/v1.1/filename-last/{}",
            BASE, source
        )
    }

    const THREE_FILES: &str = r#"{"tag": "v1.1", "files": [
        {"source": "clock.js", "destination": "/clock.js"},
        {"source": "lib/time.js", "destination": "clock/time.js"},
        {"source": "face.png", "destination": "clock/face.png"}
    ]}"#;

    async fn setup(
        transport: StubTransport,
    ) -> (tempfile::TempDir, Arc<StubTransport>, PackageInstaller, VersionStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new(dir.path()));
        let transport = Arc::new(transport);
        let installer = PackageInstaller::new(
            transport.clone(),
            storage.clone(),
            Endpoints::new(BASE).unwrap(),
        );
        let versions = VersionStore::open(storage).await;
        (dir, transport, installer, versions)
    }

    #[tokio::test]
    async fn install_commits_when_every_file_lands() {
        let stub = StubTransport::default()
            .respond(&metadata_url(), THREE_FILES)
            .respond(&file_url("clock.js"), "main()")
            .respond(&file_url("lib/time.js"), "time()")
            .respond(&file_url("face.png"), "png");
        let (dir, _, installer, mut versions) = setup(stub).await;
        let entry = clock("Tools");

        let mut messages = Vec::new();
        let report = installer
            .install(&entry, &mut versions, &mut |m: &str| messages.push(m.to_string()))
            .await
            .unwrap();

        assert!(report.committed());
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.status_message(), "Clock installed successfully!");
        assert_eq!(versions.get(&entry.key()), Some("1.1"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("scripts/clock.js")).unwrap(),
            "main()"
        );
        assert!(dir.path().join("scripts/clock/face.png").exists());
        assert_eq!(messages.last().map(String::as_str), Some("Downloading 3 of 3..."));

        let reloaded = VersionStore::open(Arc::new(FsStorage::new(dir.path()))).await;
        assert_eq!(reloaded.get(&entry.key()), Some("1.1"));
    }

    #[tokio::test]
    async fn single_failed_file_prevents_commit() {
        let stub = StubTransport::default()
            .respond(&metadata_url(), THREE_FILES)
            .respond(&file_url("clock.js"), "main()")
            .fail(&file_url("lib/time.js"), 404)
            .respond(&file_url("face.png"), "png");
        let (dir, transport, installer, mut versions) = setup(stub).await;
        let entry = clock("Tools");

        let report = installer
            .install(&entry, &mut versions, &mut |_: &str| {})
            .await
            .unwrap();

        assert!(!report.committed());
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.status_message(), "Download failed: HTTP 404 for lib/time.js");
        assert_eq!(versions.get(&entry.key()), None);
        // Loop is not aborted and earlier files are not rolled back
        assert_eq!(transport.requests.lock().unwrap().len(), 4);
        assert!(dir.path().join("scripts/clock.js").exists());
        assert!(dir.path().join("scripts/clock/face.png").exists());
    }

    #[tokio::test]
    async fn install_fails_fast_when_offline() {
        let stub = StubTransport {
            offline: true,
            ..Default::default()
        };
        let (_dir, transport, installer, mut versions) = setup(stub).await;

        let err = installer
            .install(&clock("Tools"), &mut versions, &mut |_: &str| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NetworkUnavailable));
        assert!(transport.requests.lock().unwrap().is_empty());
        assert_eq!(versions.len(), 1);
    }

    #[tokio::test]
    async fn metadata_failure_leaves_versions_untouched() {
        let stub = StubTransport::default().fail(&metadata_url(), 500);
        let (_dir, _, installer, mut versions) = setup(stub).await;
        let entry = clock("Tools");
        versions.set(entry.key(), "1.0");

        let err = installer
            .install(&entry, &mut versions, &mut |_: &str| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::MetadataFetchFailed {
                source: FetchError::Status(500),
                ..
            }
        ));
        assert_eq!(versions.get(&entry.key()), Some("1.0"));
    }

    #[tokio::test]
    async fn unknown_version_uses_latest_endpoint_and_themes_dir() {
        let latest = format!(
            "{}service/manual/owner/alice/repository/tools/filename-last/dark.json",
            BASE
        );
        let stub = StubTransport::default()
            .respond(&metadata_url(), r#"{"files": [{"source": "dark.json", "destination": "dark.json"}]}"#)
            .respond(&latest, "{}");
        let (dir, _, installer, mut versions) = setup(stub).await;
        let mut entry = clock("Themes");
        entry.version = "UNKNOWN".to_string();

        let report = installer
            .install(&entry, &mut versions, &mut |_: &str| {})
            .await
            .unwrap();
        assert!(report.committed());
        assert!(dir.path().join("Themes/dark.json").exists());
        assert_eq!(versions.get(&entry.key()), Some("UNKNOWN"));
    }

    #[tokio::test]
    async fn delete_succeeds_when_any_file_is_removed() {
        let two_files = r#"{"files": [
            {"source": "clock.js", "destination": "clock.js"},
            {"source": "gone.js", "destination": "gone.js"}
        ]}"#;
        let stub = StubTransport::default().respond(&metadata_url(), two_files);
        let (dir, _, installer, mut versions) = setup(stub).await;
        let entry = clock("Tools");
        versions.set(entry.key(), "1.1");
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts/clock.js"), "main()").unwrap();

        let report = installer.delete(&entry, &mut versions).await.unwrap();

        assert!(report.committed());
        assert_eq!(report.removed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.status_message(), "Clock deleted successfully!");
        assert_eq!(versions.get(&entry.key()), None);
        assert!(!dir.path().join("scripts/clock.js").exists());
    }

    #[tokio::test]
    async fn delete_without_removals_keeps_version() {
        let stub = StubTransport::default().respond(&metadata_url(), THREE_FILES);
        let (_dir, _, installer, mut versions) = setup(stub).await;
        let entry = clock("Tools");
        versions.set(entry.key(), "1.1");

        let report = installer.delete(&entry, &mut versions).await.unwrap();
        assert!(!report.committed());
        assert_eq!(report.status_message(), "Failed to delete script files");
        assert_eq!(versions.get(&entry.key()), Some("1.1"));
    }

    #[tokio::test]
    async fn legacy_entries_use_inline_file_list() {
        let url = format!(
            "{}service/release/owner/carol/repository/snake/tag/v3.0.0/filename-last/snake.js",
            BASE
        );
        let stub = StubTransport::default().respond(&url, "snake()");
        let (dir, _, installer, mut versions) = setup(stub).await;
        let entry = ScriptEntry {
            name: "Snake".to_string(),
            owner: "carol".to_string(),
            repo: "snake".to_string(),
            description: String::new(),
            version: "v3".to_string(),
            release_tag: Some("v3.0.0".to_string()),
            category: "All Scripts".to_string(),
            metadata_reference: None,
            inline_files: vec![crate::catalog::FileSpec::same_name("snake.js")],
        };

        let report = installer
            .install(&entry, &mut versions, &mut |_: &str| {})
            .await
            .unwrap();
        assert!(report.committed());
        assert!(dir.path().join(Path::new("scripts/snake.js")).exists());
    }

    #[test]
    fn needs_update_delegates_to_version_store() {
        let storage: Arc<dyn Storage> = Arc::new(FsStorage::new(std::env::temp_dir()));
        let installer = PackageInstaller::new(
            Arc::new(StubTransport::default()),
            storage.clone(),
            Endpoints::new(BASE).unwrap(),
        );
        let mut versions = VersionStore::new(storage, "v.json");
        let entry = clock("Tools");

        assert!(installer.needs_update(&entry, &versions));
        versions.set(entry.key(), "1.1");
        assert!(!installer.needs_update(&entry, &versions));
    }
}
