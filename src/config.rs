//! Unified configuration for the Futureproof client.
//!
//! Settings are read from `~/.futureproof/config.toml` (or an explicit path)
//! and layered: file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! ws_url = "ws://localhost:8000"
//! site_url = "http://localhost:3000"
//! login_path = "/login"
//!
//! [polling]
//! strategy = "fixed"
//! interval_ms = 2000
//! max_attempts = 0
//!
//! [reconnect]
//! strategy = "fixed"
//! interval_ms = 3000
//! max_attempts = 0
//!
//! [transform]
//! mode = "maximum"
//! target_year = 2028
//! apply_changes = true
//!
//! [contact]
//! whatsapp_number = "15551234567"
//! ```
//!
//! Environment variables (a `.env` file in the working directory is honoured):
//! `FUTUREPROOF_API_URL`, `FUTUREPROOF_WS_URL`, `FUTUREPROOF_TOKEN`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{DEFAULT_TARGET_YEAR, MaximumTransformRequest, TransformMode};
use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

pub const ENV_API_URL: &str = "FUTUREPROOF_API_URL";
pub const ENV_WS_URL: &str = "FUTUREPROOF_WS_URL";
pub const ENV_TOKEN: &str = "FUTUREPROOF_TOKEN";

/// Backend addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Where the web dashboard lives; the login redirect is resolved against it.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            ws_url: default_ws_url(),
            site_url: default_site_url(),
            login_path: default_login_path(),
        }
    }
}

/// Options sent with the dashboard's transformation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformSection {
    #[serde(default)]
    pub mode: TransformMode,
    #[serde(default = "default_target_year")]
    pub target_year: u16,
    #[serde(default = "default_apply_changes")]
    pub apply_changes: bool,
}

fn default_target_year() -> u16 {
    DEFAULT_TARGET_YEAR
}

fn default_apply_changes() -> bool {
    true
}

impl Default for TransformSection {
    fn default() -> Self {
        Self {
            mode: TransformMode::Maximum,
            target_year: default_target_year(),
            apply_changes: default_apply_changes(),
        }
    }
}

impl TransformSection {
    pub fn to_request(&self) -> MaximumTransformRequest {
        MaximumTransformRequest {
            transformation_mode: self.mode,
            target_year: self.target_year,
            specific_targets: None,
            apply_changes: self.apply_changes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactSection {
    #[serde(default)]
    pub whatsapp_number: Option<String>,
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FutureproofToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(
        default = "RetryPolicy::poll_default",
        deserialize_with = "crate::retry::deserialize_poll"
    )]
    pub polling: RetryPolicy,
    #[serde(
        default = "RetryPolicy::reconnect_default",
        deserialize_with = "crate::retry::deserialize_reconnect"
    )]
    pub reconnect: RetryPolicy,
    #[serde(default)]
    pub transform: TransformSection,
    #[serde(default)]
    pub contact: ContactSection,
}

impl Default for FutureproofToml {
    fn default() -> Self {
        Self {
            api: ApiSection::default(),
            polling: RetryPolicy::poll_default(),
            reconnect: RetryPolicy::reconnect_default(),
            transform: TransformSection::default(),
            contact: ContactSection::default(),
        }
    }
}

impl FutureproofToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load from `path`, or return defaults if it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Fail on retry settings the poll and reconnect loops cannot run with.
    pub fn check_policies(&self) -> Result<()> {
        let problems: Vec<String> = self
            .polling
            .validate("polling")
            .into_iter()
            .chain(self.reconnect.validate("reconnect"))
            .collect();
        if problems.is_empty() {
            return Ok(());
        }
        anyhow::bail!("{}", problems.join("; "))
    }

    /// Validate the configuration, returning human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !is_http_url(&self.api.base_url) {
            warnings.push(format!(
                "[api] base_url '{}' must start with http:// or https://",
                self.api.base_url
            ));
        }
        if !self.api.ws_url.starts_with("ws://") && !self.api.ws_url.starts_with("wss://") {
            warnings.push(format!(
                "[api] ws_url '{}' must start with ws:// or wss://",
                self.api.ws_url
            ));
        }
        if !self.api.login_path.starts_with('/') {
            warnings.push(format!(
                "[api] login_path '{}' must start with '/'",
                self.api.login_path
            ));
        }
        warnings.extend(self.polling.validate("polling"));
        warnings.extend(self.reconnect.validate("reconnect"));
        if !(2000..=2100).contains(&self.transform.target_year) {
            warnings.push(format!(
                "[transform] target_year {} is outside 2000-2100",
                self.transform.target_year
            ));
        }
        if let Some(number) = &self.contact.whatsapp_number
            && (number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()))
        {
            warnings.push(format!(
                "[contact] whatsapp_number '{}' must contain digits only",
                number
            ));
        }

        warnings
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Directory holding `config.toml` and the token file.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".futureproof")
}

/// CLI-level overrides applied on top of file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub ws_url: Option<String>,
    pub token_path: Option<PathBuf>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub token_path: PathBuf,
    pub api_url: String,
    pub ws_url: String,
    pub login_location: String,
    pub polling: RetryPolicy,
    pub reconnect: RetryPolicy,
    pub transform: MaximumTransformRequest,
    pub whatsapp_number: Option<String>,
    /// Token supplied through the environment; takes precedence over the token file.
    pub env_token: Option<String>,
    toml: FutureproofToml,
}

impl Config {
    /// Resolve configuration: file → environment → CLI.
    pub fn load(overrides: CliOverrides) -> Result<Self> {
        let dir = default_config_dir();
        let config_path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| dir.join("config.toml"));
        let toml = FutureproofToml::load_or_default(&config_path)?;
        toml.check_policies()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;
        Ok(Self::from_toml(toml, config_path, overrides, |key| {
            std::env::var(key).ok()
        }))
    }

    /// Resolve from an already-parsed file with an injectable environment lookup.
    pub fn from_toml(
        toml: FutureproofToml,
        config_path: PathBuf,
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let token_path = overrides.token_path.clone().unwrap_or_else(|| {
            config_path
                .parent()
                .map(|p| p.join("token"))
                .unwrap_or_else(|| default_config_dir().join("token"))
        });

        let api_url = overrides
            .api_url
            .or_else(|| env(ENV_API_URL))
            .unwrap_or_else(|| toml.api.base_url.clone());
        let ws_url = overrides
            .ws_url
            .or_else(|| env(ENV_WS_URL))
            .unwrap_or_else(|| toml.api.ws_url.clone());
        let env_token = env(ENV_TOKEN).filter(|t| !t.trim().is_empty());

        let login_location = format!(
            "{}{}",
            toml.api.site_url.trim_end_matches('/'),
            toml.api.login_path
        );

        Self {
            config_path,
            token_path,
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_url: ws_url.trim_end_matches('/').to_string(),
            login_location,
            polling: toml.polling.clone(),
            reconnect: toml.reconnect.clone(),
            transform: toml.transform.to_request(),
            whatsapp_number: toml.contact.whatsapp_number.clone(),
            env_token,
            toml,
        }
    }

    /// The file-level configuration this was resolved from.
    pub fn file_config(&self) -> &FutureproofToml {
        &self.toml
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = FutureproofToml::parse("").unwrap();
        assert_eq!(toml.api.base_url, "http://localhost:8000");
        assert_eq!(toml.api.ws_url, "ws://localhost:8000");
        assert_eq!(toml.polling.delay(1), Duration::from_millis(2000));
        assert_eq!(toml.reconnect.delay(1), Duration::from_millis(3000));
        assert_eq!(toml.transform.target_year, 2028);
        assert!(toml.transform.apply_changes);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[api]
base_url = "https://api.example.com"

[polling]
strategy = "exponential"
interval_ms = 500
max_attempts = 10

[transform]
mode = "conservative"
target_year = 2030
apply_changes = false
"#;
        let toml = FutureproofToml::parse(content).unwrap();
        assert_eq!(toml.api.base_url, "https://api.example.com");
        assert_eq!(toml.api.ws_url, DEFAULT_WS_URL);
        assert_eq!(toml.polling.max_attempts, 10);
        assert_eq!(toml.transform.mode, TransformMode::Conservative);
        let request = toml.transform.to_request();
        assert_eq!(request.target_year, 2030);
        assert!(!request.apply_changes);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let content = r#"
[transform]
mode = "turbo"
"#;
        assert!(FutureproofToml::parse(content).is_err());
    }

    #[test]
    fn test_validate_flags_bad_urls_and_number() {
        let content = r#"
[api]
base_url = "localhost:8000"
ws_url = "http://localhost:8000"
login_path = "login"

[contact]
whatsapp_number = "+1 555"
"#;
        let warnings = FutureproofToml::parse(content).unwrap().validate();
        assert_eq!(warnings.len(), 4, "{:?}", warnings);
    }

    #[test]
    fn test_layering_env_over_file_cli_over_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://env:9000/"),
            (ENV_WS_URL, "ws://env:9000"),
            (ENV_TOKEN, "abc"),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let config = Config::from_toml(
            FutureproofToml::default(),
            PathBuf::from("/tmp/fp/config.toml"),
            CliOverrides {
                ws_url: Some("ws://cli:1".to_string()),
                ..Default::default()
            },
            lookup,
        );
        assert_eq!(config.api_url, "http://env:9000");
        assert_eq!(config.ws_url, "ws://cli:1");
        assert_eq!(config.env_token.as_deref(), Some("abc"));
        assert_eq!(config.token_path, PathBuf::from("/tmp/fp/token"));
        assert_eq!(config.login_location, "http://localhost:3000/login");
    }

    #[test]
    fn test_file_values_without_env() {
        let mut toml = FutureproofToml::default();
        toml.api.base_url = "http://file:1".to_string();
        let config = Config::from_toml(
            toml,
            PathBuf::from("/x/config.toml"),
            CliOverrides::default(),
            no_env,
        );
        assert_eq!(config.api_url, "http://file:1");
        assert!(config.env_token.is_none());
        assert_eq!(config.transform, MaximumTransformRequest::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_preserves_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut toml = FutureproofToml::default();
        toml.reconnect.max_attempts = 7;
        toml.save(&path).unwrap();

        let loaded = FutureproofToml::load(&path).unwrap();
        assert_eq!(loaded.reconnect.max_attempts, 7);
        assert_eq!(loaded.polling, RetryPolicy::poll_default());
    }

    #[test]
    fn test_partial_policy_tables_parse() {
        let toml = FutureproofToml::parse("[polling]\nmax_attempts = 30\n").unwrap();
        assert_eq!(toml.polling.max_attempts, 30);
        assert_eq!(toml.polling.delay(1), Duration::from_millis(2000));
        assert_eq!(toml.reconnect, RetryPolicy::reconnect_default());
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[polling]\ninterval_ms = 0\n\n[reconnect]\ninterval_ms = 0\n",
        )
        .unwrap();

        let err = Config::load(CliOverrides {
            config_path: Some(path),
            ..Default::default()
        })
        .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("[polling] interval_ms must be greater than 0"), "{}", message);
        assert!(message.contains("[reconnect] interval_ms"), "{}", message);
    }

    #[test]
    fn test_load_rejects_shrinking_multiplier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[polling]\nstrategy = \"exponential\"\nmultiplier = -1.0\n",
        )
        .unwrap();

        let result = Config::load(CliOverrides {
            config_path: Some(path),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let toml = FutureproofToml::load_or_default(&dir.path().join("none.toml")).unwrap();
        assert_eq!(toml.api.base_url, DEFAULT_API_URL);
    }
}
