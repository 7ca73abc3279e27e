//! Runtime configuration, read from the environment.
//!
//! A `.env` file next to the binary is honoured (loaded in `lib.rs` before
//! the config is read). The `NEXT_PUBLIC_*` names are accepted so an existing
//! web front-end `.env` can be reused unchanged.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ORDERS_API_BASE: &str = "http://localhost:5000";
pub const DEFAULT_INVOICES_API_BASE: &str = "http://localhost:8000";

/// Default timeout for API requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const APP_DIR_NAME: &str = "com.orders-dashboard";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub orders_api_base: String,
    pub invoices_api_base: String,
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            orders_api_base: DEFAULT_ORDERS_API_BASE.to_string(),
            invoices_api_base: DEFAULT_INVOICES_API_BASE.to_string(),
            export_dir: data_dir.join("exports"),
            data_dir,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let orders_api_base = env_first(&["ORDERS_API_BASE", "NEXT_PUBLIC_ORDERS_API_BASE"])
            .map(|v| normalize_base_url(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.orders_api_base);
        let invoices_api_base =
            env_first(&["INVOICES_API_BASE", "NEXT_PUBLIC_INVOICES_API_BASE"])
                .map(|v| normalize_base_url(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.invoices_api_base);

        let data_dir = env_first(&["DASHBOARD_DATA_DIR"])
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let export_dir = env_first(&["DASHBOARD_EXPORT_DIR"])
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("exports"));
        let request_timeout = env_first(&["DASHBOARD_HTTP_TIMEOUT_SECS"])
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            orders_api_base,
            invoices_api_base,
            data_dir,
            export_dir,
            request_timeout,
        }
    }

    /// Point the store and exports at `dir` (the desktop shell's app data dir).
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        if self.export_dir == self.data_dir.join("exports") {
            self.export_dir = dir.join("exports");
        }
        self.data_dir = dir;
        self
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Normalise an API base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// Per-user application data directory.
pub fn default_data_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ORDERS_API_BASE",
        "NEXT_PUBLIC_ORDERS_API_BASE",
        "INVOICES_API_BASE",
        "NEXT_PUBLIC_INVOICES_API_BASE",
        "DASHBOARD_DATA_DIR",
        "DASHBOARD_EXPORT_DIR",
        "DASHBOARD_HTTP_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn normalize_base_url_adds_scheme_and_strips_slashes() {
        assert_eq!(normalize_base_url("localhost:5000/"), "http://localhost:5000");
        assert_eq!(normalize_base_url("invoices.example.com//"), "https://invoices.example.com");
        assert_eq!(normalize_base_url(" http://10.0.0.2:8000 "), "http://10.0.0.2:8000");
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    #[serial]
    fn from_env_uses_defaults() {
        clear_env();
        std::env::set_var("DASHBOARD_DATA_DIR", "/tmp/od-test");
        let cfg = DashboardConfig::from_env();
        assert_eq!(cfg.orders_api_base, DEFAULT_ORDERS_API_BASE);
        assert_eq!(cfg.invoices_api_base, DEFAULT_INVOICES_API_BASE);
        assert_eq!(cfg.export_dir, PathBuf::from("/tmp/od-test/exports"));
        assert_eq!(cfg.request_timeout, DEFAULT_TIMEOUT);
        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides_and_aliases() {
        clear_env();
        std::env::set_var("NEXT_PUBLIC_ORDERS_API_BASE", "orders.example.com/");
        std::env::set_var("INVOICES_API_BASE", "localhost:9000");
        std::env::set_var("DASHBOARD_HTTP_TIMEOUT_SECS", "5");
        let cfg = DashboardConfig::from_env();
        assert_eq!(cfg.orders_api_base, "https://orders.example.com");
        assert_eq!(cfg.invoices_api_base, "http://localhost:9000");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_timeout_falls_back() {
        clear_env();
        std::env::set_var("DASHBOARD_HTTP_TIMEOUT_SECS", "0");
        assert_eq!(DashboardConfig::from_env().request_timeout, DEFAULT_TIMEOUT);
        clear_env();
    }

    #[test]
    fn with_data_dir_moves_default_exports() {
        let cfg = DashboardConfig::default().with_data_dir(PathBuf::from("/data/app"));
        assert_eq!(cfg.data_dir, PathBuf::from("/data/app"));
        assert_eq!(cfg.export_dir, PathBuf::from("/data/app/exports"));
    }
}
