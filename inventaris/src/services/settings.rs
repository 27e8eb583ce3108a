//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{DEFAULT_BACKUP_RETENTION, DEFAULT_GATEWAY_TIMEOUT_MS, DEFAULT_PAGE_SIZE};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the REST backend; no gateway when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_ms: u64,
}

fn default_gateway_timeout() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_MS
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_gateway_timeout(),
        }
    }
}

impl GatewaySettings {
    /// Configured base URL, ignoring blank values
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Table defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// QR label settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrSettings {
    /// Where the loan form is hosted; prefixed to `peminjaman.html?code=`
    #[serde(default)]
    pub link_base: String,
}

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default = "default_backup_retention")]
    pub retention_count: usize,
}

fn default_backup_retention() -> usize {
    DEFAULT_BACKUP_RETENTION
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            retention_count: default_backup_retention(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub qr: QrSettings,
    #[serde(default)]
    pub backup: BackupSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn get_gateway(&self) -> Result<GatewaySettings> {
        Ok(self.load().await?.gateway)
    }

    /// Update gateway settings
    pub async fn update_gateway(&self, gateway: GatewaySettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.gateway = gateway;
        self.save(&settings).await
    }

    /// Update view settings; a zero page size is rejected
    pub async fn update_view(&self, view: ViewSettings) -> Result<()> {
        if view.page_size == 0 {
            return Err(AppError::validation("Page size must be positive"));
        }
        let mut settings = self.load().await?;
        settings.view = view;
        self.save(&settings).await
    }

    pub async fn update_qr(&self, qr: QrSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.qr = qr;
        self.save(&settings).await
    }

    pub async fn update_backup(&self, backup: BackupSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.backup = backup;
        self.save(&settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert!(settings.gateway.base_url().is_none());
        assert_eq!(settings.gateway.timeout_ms, 10_000);
        assert_eq!(settings.view.page_size, 10);
        assert_eq!(settings.backup.retention_count, 10);
        assert!(temp.path().join("settings.json").exists());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let (service, temp) = create_test_service();
        std::fs::write(
            temp.path().join("settings.json"),
            r#"{"gateway":{"base_url":"https://inv.example/api"}}"#,
        )
        .unwrap();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.gateway.base_url(), Some("https://inv.example/api"));
        assert_eq!(settings.gateway.timeout_ms, 10_000);
        assert_eq!(settings.view.page_size, 10);
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().to_path_buf();

        {
            let service = SettingsService::new(settings_path.clone());
            service
                .update_qr(QrSettings {
                    link_base: "https://inv.example/".to_string(),
                })
                .await
                .unwrap();
            service
                .update_view(ViewSettings { page_size: 25 })
                .await
                .unwrap();
        }

        {
            let service = SettingsService::new(settings_path);
            let loaded = service.load().await.unwrap();
            assert_eq!(loaded.qr.link_base, "https://inv.example/");
            assert_eq!(loaded.view.page_size, 25);
        }
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let (service, _temp) = create_test_service();

        let result = service.update_view(ViewSettings { page_size: 0 }).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_blank_base_url_means_no_gateway() {
        let (service, _temp) = create_test_service();

        service
            .update_gateway(GatewaySettings {
                base_url: Some("   ".to_string()),
                ..GatewaySettings::default()
            })
            .await
            .unwrap();

        assert!(service.get_gateway().await.unwrap().base_url().is_none());
    }
}
