//! Session credential persistence.
//!
//! Defines the [`CredentialStore`] trait and two backends:
//! [`FileCredentialStore`], which keeps a single JSON record on disk, and
//! [`MemoryCredentialStore`] for tests and the loopback transport.

use crate::traits::Credentials;
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage for the single session's credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load persisted credentials, if any.
    async fn load(&self) -> Result<Option<Credentials>>;

    /// Replace the persisted credentials.
    async fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Delete persisted credentials. Succeeds when none exist.
    async fn clear(&self) -> Result<()>;
}

/// On-disk representation of the credential record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    /// Key material, base64-encoded.
    data: String,
    /// SHA-256 fingerprint prefix, for operators comparing files.
    fingerprint: String,
    updated_at: DateTime<Utc>,
}

/// File-backed credential store.
///
/// The record is written to a temporary sibling and renamed into place.
/// Files are created with mode `0600` on Unix. A missing parent directory
/// is created with mode `0700`; an existing one is left as is. A record
/// that cannot be decoded is moved aside and treated as absent.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_dir(&self) -> Result<()> {
        let Some(parent) = parent_dir(&self.path) else {
            return Ok(());
        };
        if tokio::fs::try_exists(parent).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(parent).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(parent, perms).await?;
        }

        Ok(())
    }

    async fn quarantine(&self, reason: &str) {
        let aside = self.path.with_extension(format!(
            "corrupt-{}.json",
            Utc::now().format("%Y%m%d%H%M%S")
        ));
        warn!(path = %self.path.display(), %reason, "stored credentials are unreadable, pairing required");
        match tokio::fs::rename(&self.path, &aside).await {
            Ok(()) => warn!(path = %aside.display(), "moved unreadable credentials aside"),
            Err(e) => warn!(error = %e, "failed to move unreadable credentials aside"),
        }
    }

    fn decode(content: &str) -> std::result::Result<(Vec<u8>, String), String> {
        let stored: StoredCredentials =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(stored.data.as_bytes())
            .map_err(|e| format!("base64 decode failed: {e}"))?;
        Ok((data, stored.fingerprint))
    }
}

/// Parent directory of `path`, ignoring the empty parent of a bare file name.
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Write `data` to `path` with mode 0600 on Unix.
async fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match Self::decode(&content) {
            Ok((data, fingerprint)) => {
                debug!(path = %self.path.display(), %fingerprint, "loaded credentials");
                Ok(Some(Credentials::new(data)))
            }
            Err(reason) => {
                self.quarantine(&reason).await;
                Ok(None)
            }
        }
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        self.ensure_dir().await?;

        let stored = StoredCredentials {
            data: base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes()),
            fingerprint: credentials.fingerprint(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        let temp_path = self.path.with_extension("tmp");
        write_private_file(&temp_path, json.as_bytes()).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), fingerprint = %stored.fingerprint, "saved credentials");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Option<Credentials> {
        self.inner.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.inner.lock().clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.inner.lock() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session").join("credentials.json"));

        assert!(store.load().await.unwrap().is_none());

        let creds = Credentials::new(vec![0u8, 1, 2, 255]);
        store.save(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(creds));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_does_not_write_raw_material() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&Credentials::new(b"plain-key".to_vec())).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(!content.contains("plain-key"));
        assert!(!dir.path().join("credentials.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&Credentials::new(b"k".to_vec())).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credentials file should have 0600 permissions");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let loaded = tokio_test::assert_ok!(FileCredentialStore::new(&path).load().await);
        assert!(loaded.is_none());
        assert!(!path.exists());

        let aside = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("corrupt"))
            .count();
        assert_eq!(aside, 1);
    }

    #[tokio::test]
    async fn test_bad_base64_is_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"data":"***","fingerprint":"x","updated_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(FileCredentialStore::new(&path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a file.
        let path = dir.path().join("credentials.json");
        std::fs::create_dir(&path).unwrap();

        let err = tokio_test::assert_err!(FileCredentialStore::new(&path).load().await);
        assert!(matches!(err, ChannelError::Io(_)));
    }

    #[test]
    fn test_bare_file_name_has_no_parent_dir() {
        assert!(parent_dir(Path::new("credentials.json")).is_none());
        assert_eq!(
            parent_dir(Path::new("session/credentials.json")),
            Some(Path::new("session"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_directory_mode_is_untouched() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir(&shared).unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = FileCredentialStore::new(shared.join("credentials.json"));
        store.save(&Credentials::new(b"k".to_vec())).await.unwrap();

        let mode = std::fs::metadata(&shared).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_created_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session").join("credentials.json"));
        store.save(&Credentials::new(b"k".to_vec())).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("session"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&Credentials::new(b"abc".to_vec())).await.unwrap();
        assert_eq!(store.snapshot().unwrap().as_bytes(), b"abc");

        store.clear().await.unwrap();
        assert!(store.snapshot().is_none());
    }
}
