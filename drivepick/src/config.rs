use std::time::Duration;

use serde::Serialize;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_ROOT_NAME: &str = "My Drive";
const DEFAULT_ROOT_ALIAS: &str = "root";
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerConfig {
    pub api_url: String,
    #[serde(skip)]
    pub token: Option<String>,
    pub root_name: String,
    /// Folder id the remote service uses for the top of the drive.
    pub root_alias: String,
    pub search_debounce_ms: u64,
    pub demo: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            root_alias: DEFAULT_ROOT_ALIAS.to_string(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            demo: false,
        }
    }
}

impl PickerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, default: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            api_url: text("DRIVEPICK_API_URL", DEFAULT_API_URL),
            token: lookup("DRIVEPICK_TOKEN")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            root_name: text("DRIVEPICK_ROOT_NAME", DEFAULT_ROOT_NAME),
            root_alias: text("DRIVEPICK_ROOT_ALIAS", DEFAULT_ROOT_ALIAS),
            search_debounce_ms: read_u64(
                lookup("DRIVEPICK_SEARCH_DEBOUNCE_MS"),
                DEFAULT_SEARCH_DEBOUNCE_MS,
            ),
            demo: read_bool(lookup("DRIVEPICK_DEMO"), false),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn read_u64(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}
