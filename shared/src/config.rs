// Updater settings persisted as JSON in the user config directory

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::release::DEFAULT_RELEASE_ENDPOINT;

/// Environment variable that overrides the configured release endpoint
pub const ENDPOINT_ENV: &str = "ASSETDESK_UPDATE_ENDPOINT";

/// Updater configuration stored in JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default = "default_release_endpoint")]
    pub release_endpoint: String,
    /// Minutes between in-app checks
    #[serde(default = "default_check_interval")]
    pub check_interval_mins: u64,
    /// Minutes between checks made by the native shell updater
    #[serde(default = "default_native_check_interval")]
    pub native_check_interval_mins: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// Global shortcut that triggers a native check
    #[serde(default = "default_check_shortcut")]
    pub check_shortcut: String,
    /// Use the shell's native updater when the app runs as an installed build
    #[serde(default = "default_prefer_native")]
    pub prefer_native: bool,
}

fn default_auto_update() -> bool {
    true
}

fn default_release_endpoint() -> String {
    DEFAULT_RELEASE_ENDPOINT.into()
}

fn default_check_interval() -> u64 {
    30
}

fn default_native_check_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_download_timeout() -> u64 {
    300
}

fn default_check_shortcut() -> String {
    "Ctrl+Alt+U".into()
}

fn default_prefer_native() -> bool {
    true
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            auto_update: default_auto_update(),
            release_endpoint: default_release_endpoint(),
            check_interval_mins: default_check_interval(),
            native_check_interval_mins: default_native_check_interval(),
            request_timeout_secs: default_request_timeout(),
            download_timeout_secs: default_download_timeout(),
            check_shortcut: default_check_shortcut(),
            prefer_native: default_prefer_native(),
        }
    }
}

impl UpdaterConfig {
    pub fn check_interval(&self) -> Duration {
        minutes(self.check_interval_mins)
    }

    pub fn native_check_interval(&self) -> Duration {
        minutes(self.native_check_interval_mins)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        seconds(self.download_timeout_secs)
    }

    /// Apply environment overrides on top of the stored values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                log::info!("Release endpoint overridden by {}", ENDPOINT_ENV);
                self.release_endpoint = endpoint.trim().to_string();
            }
        }
        self
    }
}

/// Upper bound for any configured interval or timeout (one week)
const MAX_SECS: u64 = 7 * 24 * 60 * 60;

fn minutes(value: u64) -> Duration {
    seconds(value.saturating_mul(60))
}

fn seconds(value: u64) -> Duration {
    Duration::from_secs(value.clamp(1, MAX_SECS))
}

pub fn config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("AssetDesk").join("updater.json")
}

pub fn load_config() -> UpdaterConfig {
    load_config_from(&config_path())
}

/// Read the config at `path`, falling back to defaults if missing or invalid
pub fn load_config_from(path: &Path) -> UpdaterConfig {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return UpdaterConfig::default(),
    };
    serde_json::from_str(&data).unwrap_or_else(|e| {
        log::warn!("Ignoring invalid config {}: {}", path.display(), e);
        UpdaterConfig::default()
    })
}

pub fn save_config(config: &UpdaterConfig) -> std::io::Result<()> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &UpdaterConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(config)?;
    fs::write(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json"));
        assert_eq!(config, UpdaterConfig::default());
        assert_eq!(config.check_interval(), Duration::from_secs(30 * 60));
        assert_eq!(config.native_check_interval(), Duration::from_secs(60 * 60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("updater.json");
        let config = UpdaterConfig {
            auto_update: false,
            check_shortcut: "Ctrl+Shift+F5".into(),
            ..UpdaterConfig::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updater.json");
        fs::write(&path, r#"{ "check_interval_mins": 5 }"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.check_interval_mins, 5);
        assert!(config.auto_update);
        assert_eq!(config.release_endpoint, DEFAULT_RELEASE_ENDPOINT);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updater.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from(&path), UpdaterConfig::default());
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let config = UpdaterConfig {
            check_interval_mins: 0,
            request_timeout_secs: 0,
            ..UpdaterConfig::default()
        };
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn huge_intervals_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updater.json");
        fs::write(
            &path,
            r#"{ "check_interval_mins": 18446744073709551615,
                 "native_check_interval_mins": 307445734561825861,
                 "download_timeout_secs": 18446744073709551615 }"#,
        )
        .unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.check_interval_mins, u64::MAX);

        let week = Duration::from_secs(7 * 24 * 60 * 60);
        assert_eq!(config.check_interval(), week);
        assert_eq!(config.native_check_interval(), week);
        assert_eq!(config.download_timeout(), week);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }
}
