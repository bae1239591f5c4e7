//! Environment-driven runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use snaplabel_vision_contract::DEFAULT_MAX_RESULTS;

/// Default label detection endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default directory holding the history medium.
pub const DEFAULT_HISTORY_DIR: &str = "snaplabel-data";

/// Default bound on one labeling request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const ENV_API_KEY: &str = "SNAPLABEL_API_KEY";
const ENV_ENDPOINT: &str = "SNAPLABEL_ENDPOINT";
const ENV_HISTORY_DIR: &str = "SNAPLABEL_HISTORY_DIR";
const ENV_REQUEST_TIMEOUT_MS: &str = "SNAPLABEL_REQUEST_TIMEOUT_MS";
const ENV_MAX_RESULTS: &str = "SNAPLABEL_MAX_RESULTS";
const ENV_CAPTURE_ENABLED: &str = "SNAPLABEL_CAPTURE_ENABLED";

/// Runtime settings for the shell.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Labeling service API key. Required only by the HTTP transport.
    pub api_key: Option<String>,
    /// Labeling service endpoint.
    pub endpoint: String,
    /// Directory for the file-backed history medium.
    pub history_dir: PathBuf,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
    /// Labels requested per image.
    pub max_results: u32,
    /// Kill switch; `false` makes triggers no-ops.
    pub capture_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_results: DEFAULT_MAX_RESULTS,
            capture_enabled: true,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("history_dir", &self.history_dir)
            .field("request_timeout", &self.request_timeout)
            .field("max_results", &self.max_results)
            .field("capture_enabled", &self.capture_enabled)
            .finish()
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// Values are trimmed. Blank or unparsable values fall back to defaults;
    /// numeric settings must also be greater than zero.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: read(ENV_API_KEY),
            endpoint: read(ENV_ENDPOINT).unwrap_or(defaults.endpoint),
            history_dir: read(ENV_HISTORY_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.history_dir),
            request_timeout: read(ENV_REQUEST_TIMEOUT_MS)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            max_results: read(ENV_MAX_RESULTS)
                .and_then(|value| value.parse::<u32>().ok())
                .filter(|count| *count > 0)
                .unwrap_or(defaults.max_results),
            capture_enabled: read(ENV_CAPTURE_ENABLED)
                .map(|value| capture_flag_enabled(&value))
                .unwrap_or(true),
        }
    }
}

/// Kill-switch semantics: `0`, `false`, `off` (case-insensitive) disable
/// capture; any other value enables it.
fn capture_flag_enabled(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    !(normalized == "0" || normalized == "false" || normalized == "off")
}

#[cfg(test)]
mod tests {
    //! Unit tests for environment parsing.

    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]), AppConfig::default());
    }

    #[test]
    fn reads_and_trims_values() {
        let config = config_from(&[
            ("SNAPLABEL_API_KEY", "  abc  "),
            ("SNAPLABEL_ENDPOINT", "http://127.0.0.1:9000/annotate"),
            ("SNAPLABEL_HISTORY_DIR", "/var/lib/snaplabel"),
            ("SNAPLABEL_REQUEST_TIMEOUT_MS", "1500"),
            ("SNAPLABEL_MAX_RESULTS", "3"),
            ("SNAPLABEL_CAPTURE_ENABLED", "OFF"),
        ]);

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.endpoint, "http://127.0.0.1:9000/annotate");
        assert_eq!(config.history_dir, PathBuf::from("/var/lib/snaplabel"));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_results, 3);
        assert!(!config.capture_enabled);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("SNAPLABEL_REQUEST_TIMEOUT_MS", "0"),
            ("SNAPLABEL_MAX_RESULTS", "many"),
            ("SNAPLABEL_API_KEY", "   "),
        ]);

        assert_eq!(
            config.request_timeout,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
        );
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn kill_switch_values_disable_capture() {
        for value in ["0", "false", "OFF", " Off "] {
            let config = config_from(&[("SNAPLABEL_CAPTURE_ENABLED", value)]);
            assert!(!config.capture_enabled, "{value:?} should disable capture");
        }
        for value in ["1", "on", "true", "yes"] {
            let config = config_from(&[("SNAPLABEL_CAPTURE_ENABLED", value)]);
            assert!(config.capture_enabled, "{value:?} should keep capture enabled");
        }
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = config_from(&[("SNAPLABEL_API_KEY", "secret-value")]);
        assert!(!format!("{config:?}").contains("secret-value"));
    }
}
