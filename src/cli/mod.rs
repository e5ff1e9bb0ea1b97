//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for CryptoDash.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "cryptodash")]
#[command(about = "CryptoDash cryptocurrency dashboard")]
#[command(
    long_about = "Terminal dashboard for the CryptoDash backend: prices, history, alerts and server management"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error); overrides the configured level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend API base URL
    #[arg(long)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Default)]
pub enum Commands {
    /// Start interactive terminal session
    #[default]
    Interactive,

    /// Run a single refresh cycle, print it and exit
    Once,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Adjust log level based on verbose flag, falling back to the configured level
    pub fn effective_log_level(&self, configured: &str) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone().unwrap_or_else(|| configured.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_interactive() {
        let cli = Cli::try_parse_from(["cryptodash"]).unwrap();
        assert!(matches!(cli.command(), Commands::Interactive));
        assert_eq!(cli.config_file, "config.toml");
        assert_eq!(cli.effective_log_level("warn"), "warn");
    }

    #[test]
    fn test_flags_and_subcommands() {
        let cli = Cli::try_parse_from([
            "cryptodash",
            "-v",
            "--api-url",
            "http://10.0.0.2:3000",
            "once",
        ])
        .unwrap();
        assert!(matches!(cli.command(), Commands::Once));
        assert_eq!(cli.effective_log_level("warn"), "debug");
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.2:3000"));

        let cli = Cli::try_parse_from(["cryptodash", "config", "reset"]).unwrap();
        assert!(matches!(
            cli.command(),
            Commands::Config {
                action: Some(ConfigAction::Reset)
            }
        ));
    }
}
