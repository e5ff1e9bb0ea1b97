use colored::Colorize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Interval, MissedTickBehavior};

use cryptodash::cli::{Cli, Commands, ConfigAction};
use cryptodash::config::Config;
use cryptodash::init_logging;
use cryptodash::session::{CommandOutcome, CommandRouter, DashboardSession};
use cryptodash::ui::cli as output;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    if let Commands::Config { action } = cli.command() {
        let action = action.unwrap_or(ConfigAction::Show);
        return Config::handle_command(&cli.config_file, &action);
    }

    // Load configuration
    let mut config = Config::load_or_default(&cli.config_file);
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.trim_end_matches('/').to_string();
    }
    config.validate()?;

    // Initialize logging
    let log_level = cli.effective_log_level(&config.log_level);
    let _log_guard = init_logging(&log_level, &config.log.file_path)?;

    tracing::info!("CryptoDash starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    let mut session = DashboardSession::new(config.clone());

    match cli.command() {
        Commands::Once => {
            let report = session.run_cycle().await;
            output::display_cycle(&report);
            session.shutdown().await;
        }
        _ => run_interactive(&mut session, config.refresh_interval_secs).await?,
    }

    Ok(())
}

async fn run_interactive(session: &mut DashboardSession, refresh_secs: u64) -> anyhow::Result<()> {
    println!("{}", "💰 CryptoDash".bold().bright_blue());
    println!("{}", "Type '/help' for available commands.".dimmed());

    let report = session.run_cycle().await;
    output::display_cycle(&report);

    let mut ticker = (refresh_secs > 0).then(|| {
        let period = Duration::from_secs(refresh_secs);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Failed to read input: {}", e);
                        break;
                    }
                };
                let command = match CommandRouter::parse_interactive_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        output::display_error(&e.to_string());
                        continue;
                    }
                };
                match session.handle_command(command).await {
                    Ok(CommandOutcome::Quit) => {
                        output::display_outcome(&CommandOutcome::Quit);
                        return Ok(());
                    }
                    Ok(outcome) => output::display_outcome(&outcome),
                    Err(e) => output::display_error(&e.to_string()),
                }
            }
            _ = next_tick(&mut ticker) => {
                let report = session.run_cycle().await;
                output::display_cycle(&report);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
