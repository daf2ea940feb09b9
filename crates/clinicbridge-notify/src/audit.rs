//! Bounded delivery audit log.
//!
//! [`AuditLog`] keeps the most recent delivery records, newest first, and
//! evicts the oldest once the retention cap is reached. Every append is a
//! full read-modify-write of the backing collection under one async lock, so
//! concurrent deliveries cannot lose each other's records.

use crate::error::AuditError;
use async_trait::async_trait;
use clinicbridge_core::DeliveryRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default number of records kept.
pub const DEFAULT_RETENTION: usize = 200;

/// Storage for the whole record collection.
#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// Read every stored record, newest first.
    async fn load(&self) -> Result<Vec<DeliveryRecord>, AuditError>;

    /// Replace the stored collection.
    async fn store(&self, records: &[DeliveryRecord]) -> Result<(), AuditError>;
}

/// Keeps records in a single JSON array file.
///
/// Writes go to a temporary sibling that is renamed over the log, so a
/// reader never sees a partial file. A file that does not parse is moved
/// aside and the log starts empty.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn quarantine(&self) {
        let aside = self.path.with_extension(format!(
            "corrupt-{}.json",
            chrono::Utc::now().format("%Y%m%d%H%M%S")
        ));
        match tokio::fs::rename(&self.path, &aside).await {
            Ok(()) => warn!(path = %aside.display(), "moved unreadable audit log aside"),
            Err(e) => warn!(error = %e, "failed to move unreadable audit log aside"),
        }
    }
}

#[async_trait]
impl AuditBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<DeliveryRecord>, AuditError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "audit log is not valid JSON");
                self.quarantine().await;
                Ok(Vec::new())
            }
        }
    }

    async fn store(&self, records: &[DeliveryRecord]) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuditError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(records)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| AuditError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| AuditError::io(&self.path, e))?;
        Ok(())
    }
}

/// Keeps records in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: parking_lot::Mutex<Vec<DeliveryRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<DeliveryRecord>, AuditError> {
        Ok(self.records.lock().clone())
    }

    async fn store(&self, records: &[DeliveryRecord]) -> Result<(), AuditError> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}

/// Bounded, most-recent-first log of delivery attempts.
pub struct AuditLog {
    backend: Arc<dyn AuditBackend>,
    retention: usize,
    lock: Mutex<()>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    /// Create a log over `backend` keeping at most `retention` records.
    /// A retention of zero is raised to one.
    pub fn new(backend: Arc<dyn AuditBackend>, retention: usize) -> Self {
        Self {
            backend,
            retention: retention.max(1),
            lock: Mutex::new(()),
        }
    }

    /// A log persisted to a JSON file.
    pub fn json_file(path: impl Into<PathBuf>, retention: usize) -> Self {
        Self::new(Arc::new(JsonFileBackend::new(path)), retention)
    }

    /// A log kept in memory.
    pub fn in_memory(retention: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), retention)
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Insert `record` at the front and drop the oldest records beyond the cap.
    pub async fn append(&self, record: DeliveryRecord) -> Result<(), AuditError> {
        let _guard = self.lock.lock().await;

        let mut records = self.backend.load().await?;
        records.insert(0, record);
        if records.len() > self.retention {
            let evicted = records.len() - self.retention;
            records.truncate(self.retention);
            debug!(evicted, "audit log retention applied");
        }
        self.backend.store(&records).await
    }

    /// Every retained record, newest first.
    pub async fn list(&self) -> Result<Vec<DeliveryRecord>, AuditError> {
        let _guard = self.lock.lock().await;
        let mut records = self.backend.load().await?;
        records.truncate(self.retention);
        Ok(records)
    }

    /// Stored record count.
    pub async fn len(&self) -> Result<usize, AuditError> {
        Ok(self.list().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, AuditError> {
        Ok(self.len().await? == 0)
    }
}
