//! Scratch storage for converters that work on file paths.
//!
//! Request bytes are staged as `<uuid>.<ext>` files in a single directory
//! shared by all requests. Names come from random v4 UUIDs, so concurrent
//! requests never coordinate through locks.
//!
//! ## Ownership
//!
//! Every file a request creates, and every artifact a converter writes on
//! its behalf, is held by a [`StagedFile`]. Dropping the handle deletes the
//! file, so success, converter failure and read failure all clean up.
//! [`ScratchDir::sweep`] removes whatever a crashed process left behind.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Handle to the scratch directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

/// A file in scratch storage, deleted when dropped.
#[derive(Debug)]
pub struct StagedFile {
    id: Uuid,
    path: PathBuf,
}

impl StagedFile {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {}: {}", self.path.display(), e),
        }
    }
}

impl ScratchDir {
    /// Use `root` as the scratch directory. Nothing is created until the
    /// first file is staged.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| Error::IoWrite {
                path: self.root.clone(),
                source,
            })
    }

    /// Write `bytes` to a fresh `<id>.<extension>` file.
    pub async fn stage(&self, bytes: &[u8], extension: &str) -> Result<StagedFile> {
        self.ensure().await?;

        let id = Uuid::new_v4();
        let path = self.resolve(id, extension);

        // Claim ownership before writing so a failed write still cleans up.
        let staged = StagedFile { id, path };
        tokio::fs::write(&staged.path, bytes)
            .await
            .map_err(|source| Error::IoWrite {
                path: staged.path.clone(),
                source,
            })?;

        debug!("Staged {} bytes at {}", bytes.len(), staged.path.display());
        Ok(staged)
    }

    /// Path for an identifier and extension. Does not touch the filesystem.
    pub fn resolve(&self, id: Uuid, extension: &str) -> PathBuf {
        self.root.join(format!("{id}.{extension}"))
    }

    /// Take ownership of an artifact written under `id`, whether or not it
    /// exists yet, so it is deleted with the returned handle.
    pub fn adopt(&self, id: Uuid, extension: &str) -> StagedFile {
        StagedFile {
            id,
            path: self.resolve(id, extension),
        }
    }

    /// Read a finished artifact.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::IoRead {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
            Err(source) => {
                return Err(Error::IoReadFailure {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !metadata.is_file() {
            return Err(Error::IoRead {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        tokio::fs::read(path)
            .await
            .map_err(|source| Error::IoReadFailure {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Delete entries last modified more than `max_age` ago.
    ///
    /// Returns the number of entries removed. A missing directory counts as
    /// empty.
    pub async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(Error::IoReadFailure {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(Error::IoReadFailure {
                        path: self.root.clone(),
                        source,
                    });
                }
            };

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified > cutoff {
                continue;
            }

            let path = entry.path();
            let result = if metadata.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };

            match result {
                Ok(()) => {
                    debug!("Swept orphaned scratch entry {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to sweep {}: {}", path.display(), e),
            }
        }

        Ok(removed)
    }
}
