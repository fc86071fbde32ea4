//! Configuration loading, validation, and management for blockpilot.
//!
//! Loads configuration from `~/.blockpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup; every component
//! consumes the result read-only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.blockpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix for in-game chat commands (e.g. `!help`)
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Game server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Behaviour toggles
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Navigation and obstacle recovery
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Combat reflex
    #[serde(default)]
    pub combat: CombatConfig,

    /// Session supervision
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Discord command surface
    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_prefix() -> String {
    "!".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Game protocol version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_username")]
    pub username: String,

    /// Authentication mode: "offline" or "microsoft"
    #[serde(default = "default_auth")]
    pub auth: String,
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    25565
}
fn default_version() -> String {
    "1.20.1".into()
}
fn default_username() -> String {
    "blockpilot".into()
}
fn default_auth() -> String {
    "offline".into()
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            version: default_version(),
            username: default_username(),
            auth: default_auth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Never speak in in-game chat
    #[serde(default)]
    pub silent: bool,

    /// Fight back when attacked
    #[serde(default = "default_true")]
    pub guarding: bool,

    /// Allow coordinates to be shown to chat users
    #[serde(default = "default_true")]
    pub show_coordinates: bool,

    /// Log every in-game chat line
    #[serde(default)]
    pub logging: bool,

    /// Operator username; never treated as hostile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            silent: false,
            guarding: true,
            show_coordinates: true,
            logging: false,
            master: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Recovery attempts before a goal is abandoned
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Arrival radius around the target, in blocks
    #[serde(default = "default_goal_tolerance")]
    pub goal_tolerance: u32,

    /// Radius searched for building material
    #[serde(default = "default_scan_radius")]
    pub scan_radius: u32,

    /// Maximum material blocks collected per recovery
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

fn default_retry_ceiling() -> u32 {
    5
}
fn default_goal_tolerance() -> u32 {
    1
}
fn default_scan_radius() -> u32 {
    32
}
fn default_scan_count() -> usize {
    5
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: default_retry_ceiling(),
            goal_tolerance: default_goal_tolerance(),
            scan_radius: default_scan_radius(),
            scan_count: default_scan_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Attackers farther than this are ignored
    #[serde(default = "default_combat_radius")]
    pub radius: f64,
}

fn default_combat_radius() -> f64 {
    6.0
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            radius: default_combat_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Delay before a lost or dead session is recreated
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_reconnect_delay() -> u64 {
    5
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Allowlist of user IDs. Empty = deny all. ["*"] = allow all.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Guild (server) IDs to listen in. Empty = all guilds.
    #[serde(default)]
    pub guild_filter: Vec<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("enabled", &self.enabled)
            .field("bot_token", &redact(&self.bot_token))
            .field("allowed_users", &self.allowed_users)
            .field("guild_filter", &self.guild_filter)
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.blockpilot/config.toml).
    ///
    /// Environment variables override the file:
    /// - `BLOCKPILOT_HOST`, `BLOCKPILOT_PORT`, `BLOCKPILOT_USERNAME`
    /// - `BLOCKPILOT_DISCORD_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// The result is not validated; `load` validates once environment overrides are applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (the environment in production).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup("BLOCKPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BLOCKPILOT_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("BLOCKPILOT_PORT is not a port: {port}"))
            })?;
        }
        if let Some(username) = lookup("BLOCKPILOT_USERNAME") {
            self.server.username = username;
        }
        if let Some(token) = lookup("BLOCKPILOT_DISCORD_TOKEN") {
            self.discord.bot_token = Some(token);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".blockpilot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be non-zero".into()));
        }
        if self.prefix.is_empty() {
            return Err(ConfigError::ValidationError("prefix must not be empty".into()));
        }
        if self.navigation.scan_count == 0 || self.navigation.scan_radius == 0 {
            return Err(ConfigError::ValidationError(
                "navigation.scan_count and navigation.scan_radius must be at least 1".into(),
            ));
        }
        if self.combat.radius.is_nan() || self.combat.radius <= 0.0 {
            return Err(ConfigError::ValidationError("combat.radius must be > 0".into()));
        }
        if self.supervisor.reconnect_delay_secs == 0 {
            return Err(ConfigError::ValidationError(
                "supervisor.reconnect_delay_secs must be at least 1".into(),
            ));
        }
        if self.discord.enabled && self.discord.bot_token.is_none() {
            return Err(ConfigError::ValidationError(
                "discord.enabled requires discord.bot_token".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            server: ServerConfig::default(),
            behavior: BehaviorConfig::default(),
            navigation: NavigationConfig::default(),
            combat: CombatConfig::default(),
            supervisor: SupervisorConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prefix, "!");
        assert_eq!(config.server.port, 25565);
        assert_eq!(config.navigation.retry_ceiling, 5);
        assert_eq!(config.navigation.scan_radius, 32);
        assert_eq!(config.navigation.scan_count, 5);
        assert_eq!(config.combat.radius, 6.0);
        assert_eq!(config.supervisor.reconnect_delay_secs, 5);
        assert!(config.behavior.guarding);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.navigation.goal_tolerance, config.navigation.goal_tolerance);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.server.username, "blockpilot");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
prefix = "?"

[server]
host = "play.example.net"

[behavior]
silent = true
master = "Steve"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.prefix, "?");
        assert_eq!(config.server.host, "play.example.net");
        assert_eq!(config.server.port, 25565);
        assert!(config.behavior.silent);
        assert_eq!(config.behavior.master.as_deref(), Some("Steve"));
        assert_eq!(config.navigation.retry_ceiling, 5);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.prefix.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.combat.radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.discord.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BLOCKPILOT_HOST", "mc.internal"),
            ("BLOCKPILOT_PORT", "25570"),
            ("BLOCKPILOT_DISCORD_TOKEN", "secret-token"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.host, "mc.internal");
        assert_eq!(config.server.port, 25570);
        assert_eq!(config.discord.bot_token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn discord_token_from_env_satisfies_enabled_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discord]\nenabled = true\n").unwrap();

        let mut config = AppConfig::load_from(&path).unwrap();
        assert!(config.validate().is_err());

        config
            .apply_env(|key| (key == "BLOCKPILOT_DISCORD_TOKEN").then(|| "secret".to_string()))
            .unwrap();
        config.validate().unwrap();
        assert!(config.discord.enabled);
        assert_eq!(config.discord.bot_token.as_deref(), Some("secret"));
    }

    #[test]
    fn bad_port_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| (key == "BLOCKPILOT_PORT").then(|| "abc".to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn discord_token_is_redacted() {
        let mut config = AppConfig::default();
        config.discord.bot_token = Some("super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("25565"));
        assert!(toml_str.contains("retry_ceiling"));
    }
}
