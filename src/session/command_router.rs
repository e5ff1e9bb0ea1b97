//! Command Router for interactive command processing

use anyhow::{Result, anyhow};

use crate::backend::{CoinSymbol, Timeframe};
use crate::supervisor::ServerKind;
use crate::ui::DisplayMode;

/// Server management sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    Start,
    Stop,
    Status,
    Logs,
}

/// Interactive commands for the terminal session
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    /// Trigger a backend update, drop cached history and refresh
    Refresh,
    /// Ask the backend to refresh its stored statistics
    Update,
    /// Switch the history timeframe
    Timeframe { timeframe: Timeframe },
    /// Replace the selected coins
    Coins { coins: Vec<CoinSymbol> },
    /// Switch the price view layout
    View { mode: DisplayMode },
    /// Set (or clear, with both bounds absent) a price alert
    SetAlert {
        coin: CoinSymbol,
        upper: Option<f64>,
        lower: Option<f64>,
    },
    /// List active alerts
    Alerts,
    /// Show the notification log
    Notifications,
    /// Market dominance, volume, volatility and correlation
    Market,
    /// Manage a backend server process
    Server {
        action: ServerAction,
        kind: ServerKind,
    },
    /// Show session status
    Status,
    /// Show configuration
    Config,
    Help,
    Quit,
}

/// Parses user input into interactive commands
pub struct CommandRouter;

impl CommandRouter {
    /// Parse interactive command from string input
    pub fn parse_interactive_command(input: &str) -> Result<Option<InteractiveCommand>> {
        let input = input.trim();

        if input.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts[0] {
            "/refresh" | "/r" => Ok(Some(InteractiveCommand::Refresh)),
            "/update" => Ok(Some(InteractiveCommand::Update)),
            "/timeframe" | "/tf" => {
                if parts.len() != 2 {
                    return Err(anyhow!("Usage: /timeframe <1h|24h|7d|30d|90d>"));
                }
                let timeframe = parts[1].parse::<Timeframe>()?;
                Ok(Some(InteractiveCommand::Timeframe { timeframe }))
            }
            "/coins" => {
                if parts.len() < 2 {
                    return Err(anyhow!("Usage: /coins <coin1> [coin2] ..."));
                }
                let coins = parts[1..]
                    .iter()
                    .map(|s| s.parse::<CoinSymbol>())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(InteractiveCommand::Coins { coins }))
            }
            "/view" => {
                if parts.len() != 2 {
                    return Err(anyhow!("Usage: /view <cards|table|minimal>"));
                }
                let mode = parts[1].parse::<DisplayMode>()?;
                Ok(Some(InteractiveCommand::View { mode }))
            }
            "/alert" => {
                if parts.len() < 3 || parts.len() > 4 {
                    return Err(anyhow!("Usage: /alert <coin> <upper|-> [lower|-]"));
                }
                let coin = parts[1].parse::<CoinSymbol>()?;
                let upper = parse_bound(parts[2])?;
                let lower = match parts.get(3) {
                    Some(value) => parse_bound(value)?,
                    None => None,
                };
                Ok(Some(InteractiveCommand::SetAlert { coin, upper, lower }))
            }
            "/alerts" => Ok(Some(InteractiveCommand::Alerts)),
            "/notifications" | "/n" => Ok(Some(InteractiveCommand::Notifications)),
            "/market" => Ok(Some(InteractiveCommand::Market)),
            "/server" => {
                if parts.len() != 3 {
                    return Err(anyhow!("Usage: /server <start|stop|status|logs> <api|worker>"));
                }
                let action = match parts[1] {
                    "start" => ServerAction::Start,
                    "stop" => ServerAction::Stop,
                    "status" => ServerAction::Status,
                    "logs" => ServerAction::Logs,
                    other => return Err(anyhow!("Unknown server action: {}", other)),
                };
                let kind = parts[2].parse::<ServerKind>()?;
                Ok(Some(InteractiveCommand::Server { action, kind }))
            }
            "/status" => Ok(Some(InteractiveCommand::Status)),
            "/config" => Ok(Some(InteractiveCommand::Config)),
            "/help" | "?" => Ok(Some(InteractiveCommand::Help)),
            "/quit" | "/exit" | "/q" => Ok(Some(InteractiveCommand::Quit)),
            _ => Err(anyhow!(
                "Unknown command: {}. Type '/help' for available commands.",
                parts[0]
            )),
        }
    }

    /// Interactive command help lines
    pub fn help_messages() -> Vec<&'static str> {
        vec![
            "CryptoDash Interactive Commands:",
            "  /refresh                       - Trigger backend update and reload data",
            "  /update                        - Trigger backend update only",
            "  /timeframe <1h|24h|7d|30d|90d> - Change history window",
            "  /coins <coin1> [coin2] ...     - Select coins to display",
            "  /view <cards|table|minimal>    - Change price view",
            "  /alert <coin> <upper|-> [lower|-] - Set or clear a price alert",
            "  /alerts                        - Show active alerts",
            "  /notifications                 - Show triggered alerts",
            "  /market                        - Market dominance, volume and correlation",
            "  /server <start|stop|status|logs> <api|worker> - Manage backend servers",
            "  /status                        - Show session status",
            "  /config                        - Show configuration",
            "  /help                          - Show this help",
            "  /quit                          - Stop servers and exit",
        ]
    }
}

/// `-` means "no bound"
fn parse_bound(value: &str) -> Result<Option<f64>> {
    if value == "-" {
        return Ok(None);
    }
    let parsed = value
        .trim_start_matches('$')
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| anyhow!("Invalid price: {}", value))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> InteractiveCommand {
        CommandRouter::parse_interactive_command(input)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_empty_input_is_ignored() {
        assert!(CommandRouter::parse_interactive_command("   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_alert() {
        assert_eq!(
            parse("/alert ethereum 4000"),
            InteractiveCommand::SetAlert {
                coin: CoinSymbol::Ethereum,
                upper: Some(4000.0),
                lower: None,
            }
        );
        assert_eq!(
            parse("/alert bitcoin - $58,000.50"),
            InteractiveCommand::SetAlert {
                coin: CoinSymbol::Bitcoin,
                upper: None,
                lower: Some(58000.5),
            }
        );
        assert!(CommandRouter::parse_interactive_command("/alert dogecoin 1").is_err());
        assert!(CommandRouter::parse_interactive_command("/alert bitcoin abc").is_err());
    }

    #[test]
    fn test_parse_timeframe_and_view() {
        assert_eq!(
            parse("/tf 7d"),
            InteractiveCommand::Timeframe {
                timeframe: Timeframe::SevenDays
            }
        );
        assert_eq!(
            parse("/view minimal"),
            InteractiveCommand::View {
                mode: DisplayMode::Minimal
            }
        );
        assert!(CommandRouter::parse_interactive_command("/timeframe 1y").is_err());
    }

    #[test]
    fn test_parse_coins_rejects_unknown() {
        assert_eq!(
            parse("/coins solana ripple"),
            InteractiveCommand::Coins {
                coins: vec![CoinSymbol::Solana, CoinSymbol::Ripple]
            }
        );
        assert!(CommandRouter::parse_interactive_command("/coins solana shiba").is_err());
    }

    #[test]
    fn test_parse_server() {
        assert_eq!(
            parse("/server start worker"),
            InteractiveCommand::Server {
                action: ServerAction::Start,
                kind: ServerKind::Worker,
            }
        );
        assert!(CommandRouter::parse_interactive_command("/server restart api").is_err());
        assert!(CommandRouter::parse_interactive_command("/server start db").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(CommandRouter::parse_interactive_command("/moon").is_err());
        assert_eq!(parse("/q"), InteractiveCommand::Quit);
        assert_eq!(parse("/update"), InteractiveCommand::Update);
    }
}
