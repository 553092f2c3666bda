//! Upload storage module
//!
//! A flat directory of stored files. All path handling for uploads and
//! downloads goes through [`Storage`], which guarantees that every file it
//! hands out lives directly inside the storage root.

mod filename;

pub use filename::sanitize_filename;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::TransferError;
use crate::logger;

/// Prefix of in-progress upload files; sanitized names never start with `.`
const PART_PREFIX: &str = ".upload-";
const PART_SUFFIX: &str = ".part";

static PART_SEQ: AtomicU64 = AtomicU64::new(0);

/// Storage directory handle
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open the storage directory, creating it if it does not exist
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let root = dir.canonicalize()?;
        Ok(Self { root })
    }

    /// Canonical path of the storage directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the storage directory is still present on disk
    pub async fn is_available(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .is_ok_and(|meta| meta.is_dir())
    }

    /// List stored file names, sorted
    ///
    /// Only regular files are listed (symlinks are followed). In-progress uploads
    /// and names that are not valid UTF-8 are skipped.
    pub async fn list(&self) -> Result<Vec<String>, TransferError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_part_file(&name) {
                continue;
            }
            // Entries may vanish between read_dir and metadata
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => names.push(name),
                Ok(_) | Err(_) => {}
            }
        }

        names.sort();
        Ok(names)
    }

    /// Resolve a stored file name to its path
    ///
    /// Fails with `NotFound` unless the name designates a regular file located
    /// directly inside the storage root.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, TransferError> {
        if !is_plain_name(name) || is_part_file(name) {
            return Err(TransferError::not_found(name));
        }

        let Ok(canonical) = fs::canonicalize(self.root.join(name)).await else {
            return Err(TransferError::not_found(name));
        };

        if canonical.parent() != Some(self.root.as_path()) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                name,
                canonical.display()
            ));
            return Err(TransferError::not_found(name));
        }

        match fs::metadata(&canonical).await {
            Ok(meta) if meta.is_file() => Ok(canonical),
            _ => Err(TransferError::not_found(name)),
        }
    }

    /// Read a stored file
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, TransferError> {
        let path = self.resolve(name).await?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TransferError::not_found(name)),
            Err(e) => Err(TransferError::Internal(e)),
        }
    }

    /// Start writing a file under an already sanitized name
    ///
    /// Bytes go to a hidden part file which replaces `name` on
    /// [`PendingUpload::commit`]. Dropping the upload without committing
    /// removes the part file.
    pub async fn create(&self, name: &str) -> Result<PendingUpload, TransferError> {
        if !is_plain_name(name) || name.starts_with('.') {
            return Err(TransferError::bad_request(format!("Invalid file name: {name}")));
        }

        let seq = PART_SEQ.fetch_add(1, Ordering::Relaxed);
        let part_path = self.root.join(format!(
            "{PART_PREFIX}{}-{seq}{PART_SUFFIX}",
            std::process::id()
        ));
        let file = fs::File::create(&part_path).await?;

        Ok(PendingUpload {
            file: Some(file),
            part_path,
            final_path: self.root.join(name),
            written: 0,
            committed: false,
        })
    }

    /// Store a complete file in one call
    #[cfg(test)]
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<u64, TransferError> {
        let mut upload = self.create(name).await?;
        upload.write_chunk(data).await?;
        Ok(upload.commit().await?)
    }
}

/// An upload being streamed into the storage directory
#[derive(Debug)]
pub struct PendingUpload {
    file: Option<fs::File>,
    part_path: PathBuf,
    final_path: PathBuf,
    written: u64,
    committed: bool,
}

impl PendingUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(closed_upload)?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush the part file and move it over the final name, replacing any previous file
    pub async fn commit(mut self) -> io::Result<u64> {
        let mut file = self.file.take().ok_or_else(closed_upload)?;
        file.flush().await?;
        file.sync_all().await?;
        // Close before renaming, Windows refuses to move open files
        drop(file);
        fs::rename(&self.part_path, &self.final_path).await?;
        self.committed = true;
        Ok(self.written)
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.part_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    logger::log_warning(&format!(
                        "Failed to remove partial upload '{}': {e}",
                        self.part_path.display()
                    ));
                }
            }
        }
    }
}

fn closed_upload() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "upload already closed")
}

/// A single normal path component: no separators, no NUL, not `.`/`..`
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

fn is_part_file(name: &str) -> bool {
    name.starts_with(PART_PREFIX) && name.ends_with(PART_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_open_creates_directory_idempotently() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("uploads");
        let first = Storage::open(&nested).unwrap();
        assert!(nested.is_dir());
        let second = Storage::open(&nested).unwrap();
        assert_eq!(first.root(), second.root());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, storage) = open_temp();
        let written = storage.write("report.txt", b"hello").await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(storage.read("report.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (_dir, storage) = open_temp();
        storage.write("a.txt", b"first version").await.unwrap();
        storage.write("a.txt", b"second").await.unwrap();
        assert_eq!(storage.read("a.txt").await.unwrap(), b"second");
        assert_eq!(storage.list().await.unwrap(), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_list_skips_directories_and_parts() {
        let (dir, storage) = open_temp();
        storage.write("b.txt", b"b").await.unwrap();
        storage.write("a.txt", b"a").await.unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let pending = storage.create("c.txt").await.unwrap();
        assert_eq!(
            storage.list().await.unwrap(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
        drop(pending);
    }

    #[tokio::test]
    async fn test_dropped_upload_leaves_nothing() {
        let (dir, storage) = open_temp();
        let mut pending = storage.create("x.bin").await.unwrap();
        pending.write_chunk(b"partial").await.unwrap();
        drop(pending);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(storage.read("x.bin").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_unsafe_names() {
        let (_dir, storage) = open_temp();
        storage.write("ok.txt", b"ok").await.unwrap();

        for name in ["", ".", "..", "../ok.txt", "sub/ok.txt", "..\\ok.txt", "a\0b"] {
            let err = storage.resolve(name).await.unwrap_err();
            assert!(matches!(err, TransferError::NotFound(_)), "{name:?}");
        }
        assert!(storage.resolve("ok.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_missing_and_directory() {
        let (dir, storage) = open_temp();
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        assert!(matches!(
            storage.resolve("doesnotexist").await,
            Err(TransferError::NotFound(_))
        ));
        assert!(matches!(
            storage.resolve("folder").await,
            Err(TransferError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_part_files_not_downloadable() {
        let (dir, storage) = open_temp();
        std::fs::write(dir.path().join(".upload-1-1.part"), b"secret").unwrap();
        assert!(storage.read(".upload-1-1.part").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escaping_root_rejected() {
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("secret.txt");
        std::fs::write(&target, b"secret").unwrap();

        let (dir, storage) = open_temp();
        std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

        assert!(matches!(
            storage.read("link.txt").await,
            Err(TransferError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_unsanitized_names() {
        let (_dir, storage) = open_temp();
        assert!(matches!(
            storage.create("../escape").await,
            Err(TransferError::BadRequest(_))
        ));
        assert!(matches!(
            storage.create(".hidden").await,
            Err(TransferError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_complete_version() {
        let (_dir, storage) = open_temp();
        let first = vec![b'a'; 64 * 1024];
        let second = vec![b'b'; 32 * 1024];

        let (r1, r2) = tokio::join!(
            storage.write("same.bin", &first),
            storage.write("same.bin", &second)
        );
        r1.unwrap();
        r2.unwrap();

        let stored = storage.read("same.bin").await.unwrap();
        assert!(stored == first || stored == second);
    }
}
