//! Raw file access on the device storage root

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Byte-level file access used by the version store and the installer.
///
/// Paths are relative to the storage root.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `bytes` to `path`, creating parent directories as needed
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Storage backed by a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(sanitize_relative(path))
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, bytes).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.resolve(path)).await
    }
}

/// Drop root, `.` and `..` components so a path can never leave the storage root
pub fn sanitize_relative(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Normalize a catalog-supplied destination string into a relative path
pub fn sanitize_destination(destination: &str) -> PathBuf {
    sanitize_relative(Path::new(&destination.replace('\\', "/")))
}
