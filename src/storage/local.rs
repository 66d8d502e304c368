//! Local filesystem storage implementation.
//!
//! ## Commit Protocol
//!
//! 1. Open the storage directory (kept for directory syncs)
//! 2. Create `tmp-<name>-XXXXXX` next to the destination
//! 3. Write the payload
//! 4. `fsync` the temporary file
//! 5. `fsync` the directory so the temporary entry survives a crash
//! 6. Close the temporary file
//! 7. Refuse if the destination already exists (temporary file is kept)
//! 8. Rename into place
//! 9. `fsync` the directory so the rename survives a crash
//!
//! The existence check runs after the payload is durable so a refused commit
//! never loses fetched bytes.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result, StoreError, SyncTarget};
use crate::storage::ArtifactStore;

/// Storage directory with crash-safe, no-overwrite commits.
#[derive(Debug, Clone)]
pub struct DurableStore {
    root_dir: PathBuf,
}

impl DurableStore {
    /// Create a store rooted at an existing directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Resolve, create and verify the storage directory at startup.
    ///
    /// Without a configured directory a `collector-YYYYMMDD-*` directory is
    /// created under the system temp dir and kept. A probe file is then written
    /// into the directory; any failure here is fatal.
    pub fn prepare(root_dir: Option<&Path>, now: DateTime<Utc>) -> Result<Self> {
        let stamp = now.format("%Y%m%d");

        let root_dir = match root_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .map_err(|e| AppError::startup(format!("creating {}", dir.display()), e))?;
                dir.to_path_buf()
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix(&format!("collector-{stamp}-"))
                    .tempdir()
                    .map_err(|e| AppError::startup("creating temporary storage directory", e))?
                    .keep();
                log::info!(
                    "Created temporary storage directory {}, it won't be removed",
                    dir.display()
                );
                dir
            }
        };

        let mut probe = tempfile::Builder::new()
            .prefix(&format!("collector-{stamp}"))
            .tempfile_in(&root_dir)
            .map_err(|e| AppError::startup(format!("creating file in {}", root_dir.display()), e))?;
        probe
            .write_all(b"collector-write")
            .map_err(|e| AppError::startup(format!("writing to {}", probe.path().display()), e))?;
        probe.close().map_err(|e| {
            AppError::startup(format!("removing probe file in {}", root_dir.display()), e)
        })?;

        Ok(Self::new(root_dir))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Full path of an artifact name.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    /// Run the commit protocol synchronously.
    pub fn commit_blocking(
        &self,
        name: &str,
        payload: &[u8],
    ) -> std::result::Result<usize, StoreError> {
        validate_name(name)?;

        let dir = &self.root_dir;
        let destination = self.path(name);
        log::debug!(
            "Committing {} byte(s) to {} in {}",
            payload.len(),
            name,
            dir.display()
        );

        let dir_handle = File::open(dir).map_err(|source| StoreError::DirectoryOpen {
            dir: dir.clone(),
            source,
        })?;

        let (mut file, temp_path) = tempfile::Builder::new()
            .prefix(&format!("tmp-{name}-"))
            .tempfile_in(dir)
            .and_then(|tmp| tmp.keep().map_err(|e| e.error))
            .map_err(|source| StoreError::TempFileCreate {
                dir: dir.clone(),
                source,
            })?;

        let written = write_counted(&mut file, payload).map_err(|(written, source)| {
            log::error!(
                "Write to {} failed after {} byte(s): {}",
                temp_path.display(),
                written,
                source
            );
            StoreError::Write {
                temp_file: temp_path.clone(),
                written,
                source,
            }
        })?;

        file.sync_all().map_err(|source| StoreError::Sync {
            target: SyncTarget::TempFile,
            written,
            source,
        })?;
        sync_dir(&dir_handle, written)?;
        drop(file);

        // Any entry at the destination counts, including one that cannot be
        // opened such as a dangling symlink.
        let occupied = match fs::symlink_metadata(&destination) {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::NotFound,
        };
        if occupied {
            log::error!(
                "Destination {} already exists, leaving {} ({} byte(s))",
                destination.display(),
                temp_path.display(),
                written
            );
            return Err(StoreError::DestinationExists {
                destination,
                temp_file: temp_path,
                written,
            });
        }

        fs::rename(&temp_path, &destination).map_err(|source| {
            log::error!(
                "Rename {} -> {} failed: {}",
                temp_path.display(),
                destination.display(),
                source
            );
            StoreError::Rename {
                from: temp_path.clone(),
                to: destination.clone(),
                written,
                source,
            }
        })?;

        sync_dir(&dir_handle, written)?;

        Ok(written)
    }
}

#[async_trait]
impl ArtifactStore for DurableStore {
    async fn commit(
        &self,
        name: &str,
        payload: Vec<u8>,
    ) -> std::result::Result<usize, StoreError> {
        let store = self.clone();
        let name = name.to_string();

        // A spawned blocking task runs to completion even if this future is
        // dropped, so a started commit is never cut short.
        tokio::task::spawn_blocking(move || store.commit_blocking(&name, &payload)).await?
    }
}

/// Reject names that would resolve outside the storage directory.
fn validate_name(name: &str) -> std::result::Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
        || name.contains('\0');
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Write all of `payload`, reporting progress on failure.
fn write_counted(
    file: &mut File,
    payload: &[u8],
) -> std::result::Result<usize, (usize, io::Error)> {
    let mut written = 0;
    while written < payload.len() {
        match file.write(&payload[written..]) {
            Ok(0) => {
                return Err((
                    written,
                    io::Error::new(io::ErrorKind::WriteZero, "failed to write whole payload"),
                ));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err((written, e)),
        }
    }
    Ok(written)
}

fn sync_dir(dir: &File, written: usize) -> std::result::Result<(), StoreError> {
    dir.sync_all().map_err(|source| StoreError::Sync {
        target: SyncTarget::Directory,
        written,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("tmp-"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_commit_creates_artifact() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());
        let payload = b"{\"events\":[1,2,3]}".to_vec();

        let written = store.commit("feed.json", payload.clone()).await.unwrap();

        assert_eq!(written, payload.len());
        assert_eq!(fs::read(tmp.path().join("feed.json")).unwrap(), payload);
        assert!(temp_files(tmp.path()).is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_commit_empty_payload() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());

        let written = store.commit("empty.blob", Vec::new()).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(fs::read(tmp.path().join("empty.blob")).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_commit_refuses_existing_destination() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());
        fs::write(tmp.path().join("feed.json"), b"old").unwrap();

        let err = store
            .commit("feed.json", b"new bytes".to_vec())
            .await
            .unwrap_err();

        let StoreError::DestinationExists {
            destination,
            temp_file,
            written,
        } = err
        else {
            panic!("expected DestinationExists");
        };
        assert_eq!(destination, tmp.path().join("feed.json"));
        assert_eq!(written, 9);
        assert_eq!(fs::read(tmp.path().join("feed.json")).unwrap(), b"old");
        assert_eq!(fs::read(&temp_file).unwrap(), b"new bytes");

        let leftovers = temp_files(tmp.path());
        assert_eq!(leftovers, vec![temp_file.clone()]);
        let leftover_name = temp_file.file_name().unwrap().to_str().unwrap();
        assert!(leftover_name.starts_with("tmp-feed.json-"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_counts_as_existing() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());
        let link = tmp.path().join("a.blob");
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), &link).unwrap();

        let err = store.commit_blocking("a.blob", b"new").unwrap_err();

        assert!(matches!(err, StoreError::DestinationExists { written: 3, .. }));
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(temp_files(tmp.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_conflict_keeps_both_payloads() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());
        store.commit("a.blob", b"first".to_vec()).await.unwrap();

        assert!(store.commit("a.blob", b"second".to_vec()).await.is_err());
        assert!(store.commit("a.blob", b"third".to_vec()).await.is_err());

        assert_eq!(fs::read(tmp.path().join("a.blob")).unwrap(), b"first");
        let mut orphaned: Vec<Vec<u8>> = temp_files(tmp.path())
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect();
        orphaned.sort();
        assert_eq!(orphaned, vec![b"second".to_vec(), b"third".to_vec()]);
    }

    #[tokio::test]
    async fn test_missing_directory_fails_to_open() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path().join("missing"));

        let err = store.commit("a.blob", b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, StoreError::DirectoryOpen { .. }));
        assert_eq!(err.bytes_written(), 0);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = DurableStore::new(tmp.path());

        for name in ["", ".", "..", "../escape", "nested/name"] {
            let err = store.commit_blocking(name, b"x").unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "{name:?}");
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");

        let store = DurableStore::prepare(Some(&dir), Utc::now()).unwrap();

        assert_eq!(store.root_dir(), dir.as_path());
        assert!(dir.is_dir());
        // Probe file is cleaned up
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_without_directory_uses_temp_dir() {
        let store = DurableStore::prepare(None, Utc::now()).unwrap();
        let name = store
            .root_dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        assert!(store.root_dir().is_dir());
        assert!(name.starts_with("collector-"));
        fs::remove_dir_all(store.root_dir()).unwrap();
    }

    #[test]
    fn test_prepare_rejects_file_as_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let err = DurableStore::prepare(Some(&file), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }
}
