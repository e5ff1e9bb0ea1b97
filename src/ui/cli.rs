//! Simple CLI output implementation
//!
//! Renders cycle reports and command outcomes as colored terminal text.

use colored::{ColoredString, Colorize};

use super::{AlertRow, DashboardView, NotificationRow, Trend};
use crate::backend::AlertKind;
use crate::session::{CommandOutcome, CycleReport, MarketOverview, ServerReport, StatusInfo};
use crate::supervisor::{ServerKind, ServerStatus};

/// Number of output lines shown by `/server logs`
const LOG_TAIL_LINES: usize = 40;

/// Format a number with thousands separators and a fixed number of decimals
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// `$1,234.56`
pub fn format_usd(value: f64) -> String {
    format!("${}", format_grouped(value, 2))
}

/// `$1,234,567`
pub fn format_usd_whole(value: f64) -> String {
    format!("${}", format_grouped(value, 0))
}

fn format_rank(rank: Option<u32>) -> String {
    match rank {
        Some(rank) => format!("#{}", rank),
        None => "N/A".to_string(),
    }
}

fn format_bound(bound: Option<f64>) -> String {
    bound.map(format_usd).unwrap_or_else(|| "-".to_string())
}

fn colored_change(change: f64) -> ColoredString {
    let text = format!("{} {:.2}%", Trend::of(change).arrow(), change.abs());
    match Trend::of(change) {
        Trend::Up => text.green(),
        Trend::Down => text.red(),
    }
}

fn colored_status(status: ServerStatus) -> ColoredString {
    match status {
        ServerStatus::Online => "online".green(),
        ServerStatus::Starting => "starting".yellow(),
        ServerStatus::Offline => "offline".red(),
    }
}

fn server_label(kind: ServerKind) -> &'static str {
    match kind {
        ServerKind::Api => "API Server",
        ServerKind::Worker => "Worker Server",
    }
}

/// Display the outcome of an interactive command
pub fn display_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Cycle(report) => display_cycle(report),
        CommandOutcome::Message(message) => println!("{} {}", "✓".green(), message),
        CommandOutcome::Alerts(rows) => display_alerts(rows),
        CommandOutcome::Notifications(rows) => display_notifications(rows),
        CommandOutcome::Market(overview) => display_market(overview),
        CommandOutcome::Servers(reports) => display_servers(reports),
        CommandOutcome::ServerOutput { kind, output } => display_server_output(*kind, output),
        CommandOutcome::Status(info) => display_status(info),
        CommandOutcome::Config(config) => {
            if let Err(e) = config.display() {
                display_error(&e.to_string());
            }
        }
        CommandOutcome::Help(lines) => display_help(lines),
        CommandOutcome::Quit => println!("{}", "Goodbye!".bright_blue()),
    }
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// Render one refresh cycle
pub fn display_cycle(report: &CycleReport) {
    println!();
    println!(
        "{}  {}  {}",
        "💰 CryptoDash".bold(),
        format!("[{}]", report.timeframe).cyan(),
        report
            .completed_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .dimmed()
    );

    if !report.api_online {
        println!(
            "{}",
            "API server is not available. Start it with '/server start api'.".red()
        );
        display_servers(&report.servers);
        return;
    }

    display_view(&report.view);

    if !report.history.is_empty() {
        println!();
        println!("{}", format!("Price history ({})", report.timeframe).bold());
        for series in &report.history {
            let change = series
                .change_percent()
                .map(|c| colored_change(c).to_string())
                .unwrap_or_else(|| "n/a".dimmed().to_string());
            let latest = series
                .latest_price()
                .map(format_usd)
                .unwrap_or_else(|| "-".to_string());
            let as_of = series
                .latest_time()
                .map(|t| t.format("%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {:<10} {:>5} points  latest {:>14}  {}  {}",
                series.coin().display_name(),
                series.len(),
                latest,
                change,
                as_of.dimmed()
            );
        }
    }

    for notification in &report.new_notifications {
        let direction = match notification.kind {
            AlertKind::Upper => "above",
            AlertKind::Lower => "below",
        };
        println!(
            "{} {} is {} {} (now {})",
            "🔔".yellow(),
            notification.coin.display_name().bold(),
            direction,
            format_usd(notification.threshold),
            format_usd(notification.price)
        );
    }

    for error in &report.errors {
        println!("  {} {}", "⚠".yellow(), error.yellow());
    }
}

/// Render the price view in its selected layout
pub fn display_view(view: &DashboardView) {
    if view.is_empty() {
        println!("{}", "No price data available.".dimmed());
        return;
    }

    match view {
        DashboardView::Cards(cards) => {
            for card in cards {
                println!();
                println!("  {} {}", card.icon, card.name.bold());
                println!(
                    "    {}  {}",
                    format_usd(card.price).bold(),
                    colored_change(card.change_24h)
                );
                println!(
                    "    Market Cap: {}   24h Volume: {}   Rank: {}",
                    format_usd_whole(card.market_cap),
                    format_usd_whole(card.volume_24h),
                    format_rank(card.rank)
                );
            }
        }
        DashboardView::Table(rows) => {
            println!(
                "  {:<14} {:>14} {:>10} {:>20} {:>18} {:>6}",
                "Coin".bold(),
                "Price (USD)".bold(),
                "24h".bold(),
                "Market Cap".bold(),
                "24h Volume".bold(),
                "Rank".bold()
            );
            for row in rows {
                let change = format!("{:.2}%", row.change_24h);
                let change = if row.change_24h < 0.0 {
                    change.red()
                } else {
                    change.green()
                };
                println!(
                    "  {} {:<12} {:>14} {:>10} {:>20} {:>18} {:>6}",
                    row.icon,
                    row.name,
                    format!("${:.2}", row.price),
                    change,
                    format_usd_whole(row.market_cap),
                    format_usd_whole(row.volume_24h),
                    format_rank(row.rank)
                );
            }
        }
        DashboardView::Minimal(tickers) => {
            let mut line = String::new();
            for ticker in tickers {
                if ticker.column == 0 && !line.is_empty() {
                    println!("{}", line);
                    line.clear();
                }
                line.push_str(&format!(
                    "  {} {:<9} {:>12} {:<12}",
                    ticker.icon,
                    ticker.name,
                    format_usd(ticker.price),
                    colored_change(ticker.change_24h)
                ));
            }
            if !line.is_empty() {
                println!("{}", line);
            }
        }
    }
}

pub fn display_alerts(rows: &[AlertRow]) {
    println!("{}", "🔔 Active price alerts:".bold());
    if rows.is_empty() {
        println!("   (No active alerts)");
        return;
    }
    for row in rows {
        println!(
            "   {:<10} upper {:>14}   lower {:>14}",
            row.name,
            format_bound(row.upper),
            format_bound(row.lower)
        );
    }
}

pub fn display_notifications(rows: &[NotificationRow]) {
    println!("{}", "📬 Triggered alerts:".bold());
    if rows.is_empty() {
        println!("   (No alerts triggered)");
        return;
    }
    for row in rows.iter().rev() {
        let kind = match row.kind {
            AlertKind::Upper => "↑ above".green(),
            AlertKind::Lower => "↓ below".red(),
        };
        println!(
            "   {}  {:<10} {} {}  price {}",
            row.observed_at.format("%H:%M:%S").to_string().dimmed(),
            row.name,
            kind,
            format_usd(row.threshold),
            format_usd(row.price)
        );
    }
}

pub fn display_market(overview: &MarketOverview) {
    println!("{}", "📊 Market overview".bold());

    if !overview.dominance.is_empty() {
        println!("  {}", "Dominance".underline());
        for (coin, share) in &overview.dominance {
            println!("    {:<10} {:>6.2}%", coin, share);
        }
    }

    if !overview.volume.is_empty() {
        println!("  {}", "24h trading volume".underline());
        for (coin, volume) in &overview.volume {
            println!("    {:<10} {:>20}", coin, format_usd_whole(*volume));
        }
    }

    if !overview.deviation.is_empty() {
        println!("  {}", "Price deviation".underline());
        for (coin, deviation) in &overview.deviation {
            println!("    {:<10} {:>14}", coin.display_name(), format!("${:.2}", deviation));
        }
    }

    if !overview.performance.is_empty() {
        println!("  {}", "Performance over cached window".underline());
        for (coin, change) in &overview.performance {
            println!("    {:<10} {}", coin.display_name(), colored_change(*change));
        }
    }

    match &overview.correlation {
        Some(matrix) => {
            println!("  {}", "Price correlation".underline());
            let header: String = matrix
                .coins
                .iter()
                .map(|c| format!("{:>9}", c.display_name()))
                .collect();
            println!("    {:<10}{}", "", header);
            for a in &matrix.coins {
                let cells: String = matrix
                    .coins
                    .iter()
                    .map(|b| match matrix.get(*a, *b) {
                        Some(r) => format!("{:>9.2}", r),
                        None => format!("{:>9}", "-"),
                    })
                    .collect();
                println!("    {:<10}{}", a.display_name(), cells);
            }
        }
        None => println!(
            "  {}",
            "Correlation needs cached history for at least two coins.".dimmed()
        ),
    }

    for error in &overview.errors {
        println!("  {} {}", "⚠".yellow(), error.yellow());
    }
}

pub fn display_servers(reports: &[ServerReport]) {
    for report in reports {
        let pid = report
            .pid
            .map(|pid| format!("pid {}", pid))
            .unwrap_or_default();
        let dropped = if report.dropped_lines > 0 {
            format!(" ({} dropped)", report.dropped_lines)
        } else {
            String::new()
        };
        println!(
            "  {:<14} {:<10} {:<12} {} output lines{}",
            server_label(report.kind),
            colored_status(report.status),
            pid,
            report.output_lines,
            dropped
        );
    }
}

pub fn display_server_output(kind: ServerKind, output: &str) {
    println!("{}", format!("📜 {} output:", server_label(kind)).bold());
    if output.is_empty() {
        println!("   (No output captured)");
        return;
    }
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    for line in &lines[start..] {
        println!("   {}", line);
    }
}

pub fn display_status(info: &StatusInfo) {
    println!("{}", "🔍 CryptoDash Status:".bold());
    println!("   Version: {}", info.version);
    println!("   Session: {:?}", info.state);
    println!("   API URL: {}", info.api_url);
    let coins: Vec<&str> = info.coins.iter().map(|c| c.display_name()).collect();
    println!("   Coins: {}", coins.join(", "));
    println!("   Timeframe: {}", info.timeframe);
    println!("   View: {}", info.display_mode);
    println!(
        "   Cached series: {} ({} fetches)",
        info.cached_series, info.history_fetches
    );
    println!("   Notifications: {}", info.notifications);
    match info.last_update {
        Some(at) => println!("   Last update: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("   Last update: never"),
    }
    println!(
        "   Cycles: {}  Commands: {}  Errors: {}",
        info.session_stats.cycles_run,
        info.session_stats.commands_processed,
        info.session_stats.errors_encountered
    );
    display_servers(&info.servers);
}

pub fn display_help(lines: &[&str]) {
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }
}
