//! On-disk side of a document handle.
//!
//! Locator resolution, exclusive file ownership, change detection and
//! atomic replacement.

use std::fs::Metadata;
use std::io::{self, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::OpenError;
use super::handle::OpenMode;

const FILE_SCHEME: &str = "file://";

/// Map a locator onto a filesystem path
///
/// Plain paths and `file://` URIs are accepted. Any other scheme is
/// rejected as unsupported.
pub fn resolve_locator(locator: &str) -> Result<PathBuf, OpenError> {
    if let Some(rest) = locator.strip_prefix(FILE_SCHEME) {
        // file://localhost/path and file:///path
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        return Ok(PathBuf::from(rest));
    }

    if let Some((scheme, _)) = locator.split_once("://") {
        if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
            return Err(OpenError::UnsupportedFormat {
                locator: locator.to_string(),
                reason: format!("unsupported locator scheme '{}'", scheme),
            });
        }
    }

    if locator.is_empty() {
        return Err(OpenError::NotFound {
            locator: String::new(),
        });
    }

    Ok(PathBuf::from(locator))
}

/// Snapshot of file identity used to detect outside writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }

    pub async fn of(path: &Path) -> io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Self::from_metadata(&metadata))
    }
}

/// The file behind a handle, exclusively owned by it
#[derive(Debug)]
pub(crate) struct DocumentResource {
    pub path: PathBuf,
    pub mode: OpenMode,
    pub fingerprint: Fingerprint,
    file: File,
}

impl DocumentResource {
    /// Open the file and read its full contents
    pub async fn open(
        locator: &str,
        mode: OpenMode,
        max_bytes: Option<u64>,
    ) -> Result<(Self, Vec<u8>), OpenError> {
        let path = resolve_locator(locator)?;

        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(&path)
            .await
            .map_err(|e| OpenError::from_io(locator, e))?;

        let metadata = file
            .metadata()
            .await
            .map_err(|e| OpenError::from_io(locator, e))?;
        if !metadata.is_file() {
            return Err(OpenError::UnsupportedFormat {
                locator: locator.to_string(),
                reason: "not a regular file".to_string(),
            });
        }
        if let Some(max) = max_bytes {
            if metadata.len() > max {
                return Err(OpenError::UnsupportedFormat {
                    locator: locator.to_string(),
                    reason: format!("document is {} bytes, limit is {}", metadata.len(), max),
                });
            }
        }

        let mut resource = Self {
            path,
            mode,
            fingerprint: Fingerprint::from_metadata(&metadata),
            file,
        };
        let bytes = resource
            .read_all()
            .await
            .map_err(|e| OpenError::from_io(locator, e))?;

        Ok((resource, bytes))
    }

    pub async fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0)).await?;
        let mut bytes = Vec::new();
        self.file.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }

    /// True when the file on disk is no longer the one this resource saw
    pub async fn changed_on_disk(&self) -> bool {
        match Fingerprint::of(&self.path).await {
            Ok(current) => current != self.fingerprint,
            Err(e) => {
                log::debug!("stat of {} failed: {}", self.path.display(), e);
                true
            }
        }
    }

    /// Atomically replace the file contents and take ownership of the new file
    pub async fn replace(&self, bytes: Vec<u8>, durable: bool) -> io::Result<Self> {
        let path = self.path.clone();
        let mode = self.mode;
        let (file, fingerprint) =
            tokio::task::spawn_blocking(move || write_and_persist(&path, &bytes, durable))
                .await
                .map_err(io::Error::other)??;

        Ok(Self {
            path: self.path.clone(),
            mode,
            fingerprint,
            file: File::from_std(file),
        })
    }

    /// Flush and close the file
    pub async fn release(self) -> io::Result<()> {
        if self.mode == OpenMode::ReadWrite {
            self.file.sync_all().await?;
        }
        Ok(())
    }
}

/// Write `bytes` to a sibling temp file and rename it over `path`
///
/// Symlinks are resolved first so the link survives and its target gets
/// the new contents. The rename is the last fallible step, so readers see
/// either the old or the new contents.
fn write_and_persist(
    path: &Path,
    bytes: &[u8],
    durable: bool,
) -> io::Result<(std::fs::File, Fingerprint)> {
    let target = std::fs::canonicalize(path)?;
    let dir = target.parent().unwrap_or_else(|| Path::new("/"));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    if durable {
        tmp.as_file().sync_all()?;
    }
    tmp.as_file()
        .set_permissions(std::fs::metadata(&target)?.permissions())?;
    let fingerprint = Fingerprint::from_metadata(&tmp.as_file().metadata()?);

    let file = tmp.persist(&target).map_err(|e| e.error)?;
    if durable {
        sync_dir(dir)?;
    }
    Ok((file, fingerprint))
}

/// Make a rename inside `dir` durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path() {
        let path = resolve_locator("docs/report.pdf").expect("plain path");
        assert_eq!(path, PathBuf::from("docs/report.pdf"));
    }

    #[test]
    fn test_resolve_file_uri() {
        let path = resolve_locator("file:///tmp/report.pdf").expect("file uri");
        assert_eq!(path, PathBuf::from("/tmp/report.pdf"));

        let path = resolve_locator("file://localhost/tmp/report.pdf").expect("file uri");
        assert_eq!(path, PathBuf::from("/tmp/report.pdf"));
    }

    #[test]
    fn test_rejects_foreign_scheme() {
        let err = resolve_locator("content://media/external/42").unwrap_err();
        assert!(matches!(err, OpenError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_locator_is_not_found() {
        assert!(matches!(
            resolve_locator(""),
            Err(OpenError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_replace_keeps_old_contents_until_rename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"old").expect("seed file");

        let locator = path.to_string_lossy().to_string();
        let (resource, bytes) = DocumentResource::open(&locator, OpenMode::ReadWrite, None)
            .await
            .expect("open");
        assert_eq!(bytes, b"old");
        assert!(!resource.changed_on_disk().await);

        let replaced = resource
            .replace(b"new contents".to_vec(), false)
            .await
            .expect("replace");
        assert_eq!(std::fs::read(&path).expect("read back"), b"new contents");
        assert!(!replaced.changed_on_disk().await);
        assert!(resource.changed_on_disk().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replace_through_symlink_updates_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("doc.pdf");
        let link = dir.path().join("link.pdf");
        std::fs::write(&target, b"old").expect("seed file");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let locator = link.to_string_lossy().to_string();
        let (resource, _) = DocumentResource::open(&locator, OpenMode::ReadWrite, None)
            .await
            .expect("open");
        let replaced = resource.replace(b"new".to_vec(), true).await.expect("replace");

        let link_meta = std::fs::symlink_metadata(&link).expect("link metadata");
        assert!(link_meta.file_type().is_symlink());
        assert_eq!(std::fs::read(&target).expect("read target"), b"new");
        assert!(!replaced.changed_on_disk().await);
    }
}
