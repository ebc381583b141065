use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::auth::{AuthMethod, AuthPreference};
use crate::tui::theme::ThemeConfig;

const APP_DIR: &str = "azscope";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory (tenant) id or domain used by the device-code flow.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Application (client) id used by the device-code flow.
    #[serde(default)]
    pub client_id: Option<String>,

    /// `"cli"` (default) or `"devicecode"`.
    #[serde(default = "default_preferred_auth")]
    pub preferred_auth: String,

    /// Minimum level written to the log file. Default: "info"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tenant_id: None,
            client_id: None,
            preferred_auth: default_preferred_auth(),
            log_level: default_log_level(),
            theme: ThemeConfig::default(),
        }
    }
}

fn default_preferred_auth() -> String {
    "cli".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Apply command-line overrides. Blank values leave the config untouched.
    pub fn with_overrides(
        mut self,
        auth: Option<String>,
        tenant_id: Option<String>,
        client_id: Option<String>,
    ) -> Self {
        if let Some(auth) = non_blank(auth) {
            self.preferred_auth = auth;
        }
        if let Some(tenant) = non_blank(tenant_id) {
            self.tenant_id = Some(tenant);
        }
        if let Some(client) = non_blank(client_id) {
            self.client_id = Some(client);
        }
        self
    }

    pub fn auth_preference(&self) -> AuthPreference {
        AuthPreference {
            method: AuthMethod::parse(&self.preferred_auth),
            tenant_id: non_blank(self.tenant_id.clone()),
            client_id: non_blank(self.client_id.clone()),
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level
            .trim()
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Returns the base config directory: `$XDG_CONFIG_HOME/azscope` or `~/.config/azscope`
pub fn base_dir() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join(APP_DIR));
    }
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Returns the path to `config.toml`
pub fn config_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("config.toml"))
}

/// Returns the path to the log file
pub fn log_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("azscope.log"))
}

/// Ensure the config directory exists
pub fn ensure_dirs() -> Result<()> {
    let base = base_dir()?;
    fs::create_dir_all(&base).with_context(|| format!("failed to create {}", base.display()))?;
    Ok(())
}

/// Load config from the default location (or return defaults if it doesn't exist)
pub fn load() -> Result<Config> {
    load_from(&config_path()?)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        if config.preferred_auth.trim().is_empty() {
            config.preferred_auth = default_preferred_auth();
        }
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.preferred_auth, "cli");
        assert_eq!(cfg.auth_preference(), AuthPreference::default());
    }

    #[test]
    fn parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "tenant_id = \"11111111-1111-1111-1111-111111111111\"\n\
             client_id = \"abc\"\n\
             preferred_auth = \"devicecode\"\n\
             log_level = \"debug\"\n\
             \n\
             [theme]\n\
             border_focused = \"red\"\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap();
        let pref = cfg.auth_preference();
        assert_eq!(pref.method, AuthMethod::DeviceCode);
        assert_eq!(
            pref.tenant_id.as_deref(),
            Some("11111111-1111-1111-1111-111111111111")
        );
        assert_eq!(pref.client_id.as_deref(), Some("abc"));
        assert_eq!(cfg.log_level(), tracing::Level::DEBUG);
        assert_eq!(cfg.theme.border_focused.as_deref(), Some("red"));
    }

    #[test]
    fn blank_preferred_auth_defaults_to_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "preferred_auth = \"  \"\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.preferred_auth, "cli");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tenant_id = [").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn overrides_replace_non_blank_values() {
        let cfg = Config {
            tenant_id: Some("from-file".into()),
            ..Config::default()
        }
        .with_overrides(Some("DeviceCode".into()), Some(" ".into()), Some("cid".into()));
        let pref = cfg.auth_preference();
        assert_eq!(pref.method, AuthMethod::DeviceCode);
        assert_eq!(pref.tenant_id.as_deref(), Some("from-file"));
        assert_eq!(pref.client_id.as_deref(), Some("cid"));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let cfg = Config {
            log_level: "chatty".into(),
            ..Config::default()
        };
        assert_eq!(cfg.log_level(), tracing::Level::INFO);
    }
}
