//! Backup service
//!
//! Snapshots the item, loan and history collections into a single JSON
//! document with a SHA-256 checksum over the data section. Restoring
//! verifies the checksum before anything is written back. Documents
//! without a checksum (exported by the browser front end) are accepted.

use crate::config::{APP_NAME, HISTORY_KEY, ITEMS_KEY, LOANS_KEY};
use crate::error::{AppError, Result};
use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = "json";

/// Datasets carried by a backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(rename = "dataBarang", default)]
    pub items: Value,
    #[serde(rename = "peminjaman", default)]
    pub loans: Value,
    #[serde(rename = "riwayat", default)]
    pub history: Value,
}

/// Backup document layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub timestamp: String,
    pub app: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub data: BackupData,
}

/// A backup file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// Backup service
#[derive(Clone)]
pub struct BackupService {
    store: Store,
    backups_dir: PathBuf,
    retention_count: usize,
}

impl BackupService {
    pub fn new(store: Store, app_data_dir: &Path, retention_count: usize) -> Self {
        Self {
            store,
            backups_dir: app_data_dir.join("backups"),
            retention_count: retention_count.max(1),
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Write a backup of all datasets and apply the retention policy
    pub async fn create_backup(&self) -> Result<PathBuf> {
        tracing::info!("Creating backup");

        fs::create_dir_all(&self.backups_dir).await?;

        let data = BackupData {
            items: self.dataset(ITEMS_KEY).await?,
            loans: self.dataset(LOANS_KEY).await?,
            history: self.dataset(HISTORY_KEY).await?,
        };

        let document = BackupDocument {
            timestamp: Utc::now().to_rfc3339(),
            app: APP_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checksum: Some(calculate_checksum(&data)?),
            data,
        };

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let backup_path = self
            .backups_dir
            .join(format!("{}{}.{}", BACKUP_PREFIX, timestamp, BACKUP_EXTENSION));

        let content = serde_json::to_string_pretty(&document)?;
        fs::write(&backup_path, &content).await.map_err(|e| {
            AppError::Backup(format!("Failed to write {:?}: {}", backup_path, e))
        })?;

        tracing::info!("Backup created: {:?} ({} bytes)", backup_path, content.len());

        self.apply_retention_policy().await?;

        Ok(backup_path)
    }

    /// Missing datasets are stored as empty lists
    async fn dataset(&self, key: &str) -> Result<Value> {
        Ok(match self.store.read_value(key).await? {
            Value::Null => Value::Array(Vec::new()),
            value => value,
        })
    }

    /// Keep only the newest `retention_count` backup files
    async fn apply_retention_policy(&self) -> Result<()> {
        let backups = self.list_backups().await?;

        if backups.len() <= self.retention_count {
            return Ok(());
        }

        for backup in backups.iter().skip(self.retention_count) {
            tracing::info!("Deleting old backup: {:?}", backup.path);

            if let Err(e) = fs::remove_file(&backup.path).await {
                tracing::warn!("Failed to delete backup file {:?}: {}", backup.path, e);
            }
        }

        Ok(())
    }

    /// List backup files, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&self.backups_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let is_backup = file_name.starts_with(BACKUP_PREFIX)
                && path.extension().is_some_and(|ext| ext == BACKUP_EXTENSION);
            if !is_backup {
                continue;
            }

            let size = entry.metadata().await?.len();
            backups.push(BackupInfo {
                path,
                file_name,
                size,
            });
        }

        // timestamped names sort chronologically
        backups.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(backups)
    }

    /// Restore all datasets from a backup file
    pub async fn restore_backup(&self, backup_path: &Path) -> Result<BackupDocument> {
        tracing::info!("Restoring from backup: {:?}", backup_path);

        let content = fs::read_to_string(backup_path).await?;
        let document: BackupDocument = serde_json::from_str(&content)
            .map_err(|e| AppError::Restore(format!("Invalid backup file format: {}", e)))?;

        tracing::info!(
            "Backup app: {}, version: {}, timestamp: {}",
            document.app,
            document.version,
            document.timestamp
        );

        match &document.checksum {
            Some(expected) => {
                let actual = calculate_checksum(&document.data)?;
                if &actual != expected {
                    return Err(AppError::Restore(format!(
                        "Checksum mismatch: expected {}, got {}",
                        expected, actual
                    )));
                }
            }
            None => tracing::warn!("Backup has no checksum, restoring unverified"),
        }

        for (key, value) in [
            (ITEMS_KEY, &document.data.items),
            (LOANS_KEY, &document.data.loans),
            (HISTORY_KEY, &document.data.history),
        ] {
            if !matches!(value, Value::Array(_) | Value::Null) {
                return Err(AppError::Restore(format!("Dataset {} is not a list", key)));
            }
        }

        for (key, value) in [
            (ITEMS_KEY, &document.data.items),
            (LOANS_KEY, &document.data.loans),
            (HISTORY_KEY, &document.data.history),
        ] {
            match value {
                Value::Null => {
                    self.store.remove(key).await?;
                }
                value => self.store.write_value(key, value).await?,
            }
            tracing::debug!("Restored dataset {}", key);
        }

        tracing::info!("Restore completed successfully");

        Ok(document)
    }
}

fn calculate_checksum(data: &BackupData) -> Result<String> {
    let canonical = serde_json::to_vec(data)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}
