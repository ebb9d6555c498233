//! `printshop.toml` settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use printshop_bambu::{BridgeConfig, ConnectionMode};
use printshop_pricing::{JobParameters, TierPolicy, DEFAULT_MACHINE_RATE};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "printshop";
const CONFIG_FILE: &str = "printshop.toml";

/// All settings. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub pricing: PricingConfig,
    pub printer: PrinterConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub backups_to_keep: usize,
    pub receipts_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backups_to_keep: 5,
            receipts_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub machine_rate: f64,
    pub markup: f64,
    pub swap_fee: f64,
    pub processing_fee: f64,
    pub waste_pct: f64,
    pub tier: Option<TierPolicy>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            machine_rate: DEFAULT_MACHINE_RATE,
            markup: 1.0,
            swap_fee: 0.0,
            processing_fee: 0.0,
            waste_pct: 0.0,
            tier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub mode: ConnectionMode,
    pub host: String,
    pub serial: String,
    pub access_code: String,
    pub token: String,
    pub ca_cert: Option<PathBuf>,
    pub tls: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Local,
            host: String::new(),
            serial: String::new(),
            access_code: String::new(),
            token: String::new(),
            ca_cert: None,
            tls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub heartbeat_secs: u64,
    pub stale_after_secs: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 5,
            stale_after_secs: None,
        }
    }
}

impl AppConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load `path`, or the default location. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Directory holding the record collections.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("printshop-data"))
    }

    /// Directory receipts are written to.
    pub fn receipts_dir(&self) -> PathBuf {
        self.storage
            .receipts_dir
            .clone()
            .or_else(|| dirs::document_dir().map(|d| d.join("3D_Print_Receipts")))
            .unwrap_or_else(|| self.data_dir().join("Receipts"))
    }

    /// Quote defaults for fields left empty.
    pub fn default_params(&self) -> JobParameters {
        JobParameters {
            machine_rate: self.pricing.machine_rate,
            markup: self.pricing.markup,
            swap_fee: self.pricing.swap_fee,
            processing_fee: self.pricing.processing_fee,
            waste_pct: self.pricing.waste_pct,
            ..Default::default()
        }
    }

    /// How long before live status is shown as unknown.
    pub fn stale_after(&self) -> Option<Duration> {
        self.telemetry.stale_after_secs.map(Duration::from_secs)
    }

    /// Bridge settings from `[printer]` and `[telemetry]`.
    pub fn bridge_config(&self) -> Result<BridgeConfig> {
        let p = &self.printer;
        let secret = match p.mode {
            ConnectionMode::Local => &p.access_code,
            ConnectionMode::Cloud => &p.token,
        };
        let mut config = BridgeConfig::for_mode(p.mode, &p.host, &p.serial, secret);
        config.tls = p.tls;
        config.heartbeat = Duration::from_secs(self.telemetry.heartbeat_secs.max(1));
        if let Some(path) = &p.ca_cert {
            let pem = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            config.ca_cert = Some(pem);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.backups_to_keep, 5);
        assert_eq!(config.pricing.machine_rate, 0.75);
        assert_eq!(config.telemetry.heartbeat_secs, 5);
    }

    #[test]
    fn test_full_file() {
        let config = AppConfig::parse(
            r#"
            [storage]
            data_dir = "/srv/printshop"
            backups_to_keep = 3

            [pricing]
            machine_rate = 1.25
            markup = 2.5

            [pricing.tier]
            swap_threshold = 50
            swap_fee = 0.01
            markup = 2.0

            [printer]
            mode = "cloud"
            serial = "01S00A000000000"
            token = "abc"

            [telemetry]
            stale_after_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir(), PathBuf::from("/srv/printshop"));
        assert_eq!(config.storage.backups_to_keep, 3);
        assert_eq!(config.pricing.tier.unwrap().swap_threshold, 50);
        assert_eq!(config.stale_after(), Some(Duration::from_secs(30)));

        let params = config.default_params();
        assert_eq!(params.machine_rate, 1.25);
        assert_eq!(params.markup, 2.5);
        assert_eq!(params.batch_qty, 1);

        let bridge = config.bridge_config().unwrap();
        assert_eq!(bridge.host, printshop_bambu::CLOUD_HOST);
        assert_eq!(bridge.password, "abc");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[pricing]\nmarkup = \"lots\"").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
