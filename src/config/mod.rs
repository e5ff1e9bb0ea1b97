//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::backend::{CoinSymbol, Timeframe};
use crate::ui::DisplayMode;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Coins shown on the dashboard
    pub coins: Vec<CoinSymbol>,

    /// History window used for charts and the history cache
    pub timeframe: Timeframe,

    /// Price view layout
    pub display_mode: DisplayMode,

    /// Seconds between automatic refresh cycles (0 disables the timer)
    pub refresh_interval_secs: u64,

    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Backend API configuration
    pub api: ApiConfig,

    /// Spawned server configuration
    pub servers: ServersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API base URL
    pub base_url: String,

    /// Timeout for `/health` in milliseconds
    pub health_timeout_ms: u64,

    /// Timeout for data calls in milliseconds
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServersConfig {
    /// Maximum captured output lines kept per server
    pub output_max_lines: usize,

    pub api: ServerConfig,

    pub worker: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Directory the commands run in
    pub working_dir: String,

    /// Dependency install step, run before the server
    pub install_command: String,

    /// Long-running server command
    pub start_command: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the log file
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coins: vec![CoinSymbol::Bitcoin, CoinSymbol::Ethereum],
            timeframe: Timeframe::OneDay,
            display_mode: DisplayMode::Cards,
            refresh_interval_secs: 0,
            log_level: "info".to_string(),
            log: LogConfig::default(),
            api: ApiConfig::default(),
            servers: ServersConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            health_timeout_ms: 2000,
            request_timeout_ms: 5000,
        }
    }
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            output_max_lines: 2000,
            api: ServerConfig::npm("./api-server"),
            worker: ServerConfig::npm("./worker-server"),
        }
    }
}

impl ServerConfig {
    fn npm(working_dir: &str) -> Self {
        Self {
            working_dir: working_dir.to_string(),
            install_command: "npm install".to_string(),
            start_command: "npm start".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/cryptodash.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // CRYPTODASH_COINS - comma-separated list of coins; unknown entries are skipped
        if let Some(coins) = lookup("CRYPTODASH_COINS") {
            let parsed: Vec<CoinSymbol> = coins
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .filter_map(|s| match s.parse() {
                    Ok(coin) => Some(coin),
                    Err(e) => {
                        tracing::warn!("Ignoring CRYPTODASH_COINS entry: {}", e);
                        None
                    }
                })
                .collect();
            if !parsed.is_empty() {
                self.coins = parsed;
            }
        }

        // CRYPTODASH_TIMEFRAME - history window
        if let Some(timeframe) = lookup("CRYPTODASH_TIMEFRAME") {
            if let Ok(value) = timeframe.parse() {
                self.timeframe = value;
            }
        }

        // CRYPTODASH_DISPLAY_MODE - cards, table or minimal
        if let Some(mode) = lookup("CRYPTODASH_DISPLAY_MODE") {
            if let Ok(value) = mode.parse() {
                self.display_mode = value;
            }
        }

        // CRYPTODASH_REFRESH_INTERVAL_SECS - auto refresh timer
        if let Some(interval) = lookup("CRYPTODASH_REFRESH_INTERVAL_SECS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.refresh_interval_secs = value;
            }
        }

        // CRYPTODASH_LOG_LEVEL - logging level
        if let Some(log_level) = lookup("CRYPTODASH_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // CRYPTODASH_LOG_FILE_PATH - logging destination file
        if let Some(file_path) = lookup("CRYPTODASH_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // CRYPTODASH_API_URL - backend base URL
        if let Some(base_url) = lookup("CRYPTODASH_API_URL") {
            self.api.base_url = base_url;
        }

        // CRYPTODASH_API_HEALTH_TIMEOUT_MS
        if let Some(timeout) = lookup("CRYPTODASH_API_HEALTH_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.api.health_timeout_ms = value;
            }
        }

        // CRYPTODASH_API_REQUEST_TIMEOUT_MS
        if let Some(timeout) = lookup("CRYPTODASH_API_REQUEST_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.api.request_timeout_ms = value;
            }
        }

        // CRYPTODASH_API_SERVER_DIR / CRYPTODASH_WORKER_SERVER_DIR - server working directories
        if let Some(dir) = lookup("CRYPTODASH_API_SERVER_DIR") {
            self.servers.api.working_dir = dir;
        }
        if let Some(dir) = lookup("CRYPTODASH_WORKER_SERVER_DIR") {
            self.servers.worker.working_dir = dir;
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            Self::fallback_with(|key| env::var(key).ok())
        })
    }

    /// Defaults plus overrides from `lookup`; the overrides are discarded if they fail validation
    pub fn fallback_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!("Ignoring environment overrides: {}", err);
                Self::default()
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.coins.is_empty() {
            anyhow::bail!("At least one coin must be specified");
        }

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            anyhow::bail!("api.base_url must start with http:// or https://");
        }

        if self.api.health_timeout_ms == 0 || self.api.request_timeout_ms == 0 {
            anyhow::bail!("API timeouts must be greater than 0");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        if self.servers.output_max_lines == 0 {
            anyhow::bail!("servers.output_max_lines must be greater than 0");
        }

        for (name, server) in [("api", &self.servers.api), ("worker", &self.servers.worker)] {
            if server.start_command.trim().is_empty() {
                anyhow::bail!("servers.{}.start_command must not be empty", name);
            }
            if server.working_dir.trim().is_empty() {
                anyhow::bail!("servers.{}.working_dir must not be empty", name);
            }
        }

        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        println!("Current configuration:");
        println!("{}", content);
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(config_file: &str, action: &crate::cli::ConfigAction) -> Result<()> {
        match action {
            crate::cli::ConfigAction::Show => {
                let config = Config::load_or_default(config_file);
                config.display()?;
            }
            crate::cli::ConfigAction::Reset => {
                let default_config = Config::default();
                default_config.save_to_file(config_file)?;
                println!("Configuration reset to defaults in {}", config_file);
                default_config.display()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coins, vec![CoinSymbol::Bitcoin, CoinSymbol::Ethereum]);
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.health_timeout_ms, 2000);
        assert_eq!(config.api.request_timeout_ms, 5000);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("timeframe = \"24h\""));
        assert!(serialized.contains("\"ethereum\""));

        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.coins, deserialized.coins);
        assert_eq!(config.timeframe, deserialized.timeframe);
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.coins = vec![CoinSymbol::Solana, CoinSymbol::MaticNetwork];
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.coins, loaded_config.coins);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CRYPTODASH_COINS", "solana, dogecoin ,ripple"),
            ("CRYPTODASH_TIMEFRAME", "7d"),
            ("CRYPTODASH_DISPLAY_MODE", "table"),
            ("CRYPTODASH_API_URL", "http://10.0.0.5:3000"),
            ("CRYPTODASH_API_REQUEST_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.coins, vec![CoinSymbol::Solana, CoinSymbol::Ripple]);
        assert_eq!(config.timeframe, Timeframe::SevenDays);
        assert_eq!(config.display_mode, DisplayMode::Table);
        assert_eq!(config.api.base_url, "http://10.0.0.5:3000");
        assert_eq!(config.api.request_timeout_ms, 5000);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.coins.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = "localhost:3000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.servers.worker.start_command = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_discards_invalid_overrides() {
        let valid: HashMap<&str, &str> = [("CRYPTODASH_API_URL", "http://10.0.0.5:3000")]
            .into_iter()
            .collect();
        let config = Config::fallback_with(|key| valid.get(key).map(|v| v.to_string()));
        assert_eq!(config.api.base_url, "http://10.0.0.5:3000");
        assert!(config.validate().is_ok());

        let invalid: HashMap<&str, &str> = [
            ("CRYPTODASH_API_URL", "localhost"),
            ("CRYPTODASH_TIMEFRAME", "7d"),
        ]
        .into_iter()
        .collect();
        let config = Config::fallback_with(|key| invalid.get(key).map(|v| v.to_string()));
        assert_eq!(config.api.base_url, Config::default().api.base_url);
        assert_eq!(config.timeframe, Timeframe::default());
        assert!(config.validate().is_ok());
    }
}
