//! Application Configuration
//!
//! Compile-time defaults for the local detection stack, optionally overridden
//! by a `lolbin_monitor.json` next to the EXE. An invalid file is logged and
//! ignored; the app always starts.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000/api";
const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8080";
const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_APP_NAME: &str = "LOLBin Monitor";
const DEFAULT_ICON_SIZE_PX: u32 = 64;

const CONFIG_FILE_NAME: &str = "lolbin_monitor.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the detection backend API.
    pub backend_url: String,
    /// Base URL of the web dashboard.
    pub dashboard_url: String,
    /// Seconds between scheduled alert checks.
    pub check_interval_seconds: u64,
    pub app_name: String,
    pub icon_size_px: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECONDS,
            app_name: DEFAULT_APP_NAME.to_string(),
            icon_size_px: DEFAULT_ICON_SIZE_PX,
        }
    }
}

impl Config {
    /// Loads the config file next to the EXE, falling back to the defaults.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    info!("Configuration loaded: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring invalid config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Interval between scheduled polls. Clamped to at least one second.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(1))
    }

    /// Endpoint returning the JSON array of suspicious events.
    pub fn suspicious_events_url(&self) -> String {
        format!("{}/events/suspicious", self.backend_url)
    }

    /// Deep link to a single alert's detail view in the dashboard.
    pub fn alert_url(&self, alert_id: &str) -> String {
        format!("{}/alert/{}", self.dashboard_url, alert_id)
    }
}

/// Path to the configuration file (next to the EXE).
fn config_path() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join(CONFIG_FILE_NAME);
        }
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_stack() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:3000/api");
        assert_eq!(config.dashboard_url, "http://localhost:8080");
        assert_eq!(config.check_interval_seconds, 10);
        assert_eq!(config.app_name, "LOLBin Monitor");
        assert_eq!(config.icon_size_px, 64);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config: Config =
            serde_json::from_str(r#"{"backend_url":"http://10.0.0.5:3000/api"}"#).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.5:3000/api");
        assert_eq!(config.dashboard_url, "http://localhost:8080");
        assert_eq!(config.check_interval_seconds, 10);
    }

    #[test]
    fn zero_interval_is_clamped_to_one_second() {
        let config = Config {
            check_interval_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.check_interval(), Duration::from_secs(1));
    }

    #[test]
    fn urls_compose_endpoint_and_deep_link() {
        let config = Config::default();
        assert_eq!(
            config.suspicious_events_url(),
            "http://localhost:3000/api/events/suspicious"
        );
        assert_eq!(
            config.alert_url("alert-1234-t1"),
            "http://localhost:8080/alert/alert-1234-t1"
        );
    }
}
