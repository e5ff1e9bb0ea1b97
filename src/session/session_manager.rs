//! Dashboard session: the explicit context object that owns every component

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backend::{CoinSymbol, Notification, PriceHistorySeries, PriceSnapshot, RemoteClient, Timeframe};
use crate::config::Config;
use crate::error::{DashboardError, DashboardResult};
use crate::market_data::{CorrelationMatrix, MarketDataCache, correlation_matrix};
use crate::supervisor::{ServerKind, ServerProcessSupervisor, ServerStatus};
use crate::ui::{self, AlertRow, DashboardView, DisplayMode, NotificationRow};

use super::alert_store::{AlertThreshold, AlertThresholdStore};
use super::command_router::{CommandRouter, InteractiveCommand, ServerAction};
use super::notifications::NotificationDeduplicator;

/// Window fetched for coins missing from the cache when building the correlation matrix
const CORRELATION_FALLBACK_TIMEFRAME: Timeframe = Timeframe::SevenDays;

/// Session state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    ShuttingDown,
    Terminated,
}

/// Session statistics for monitoring
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub cycles_run: u64,
    pub commands_processed: u64,
    pub errors_encountered: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            cycles_run: 0,
            commands_processed: 0,
            errors_encountered: 0,
        }
    }
}

/// Everything one refresh cycle produced, ready for rendering
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub api_online: bool,
    pub timeframe: Timeframe,
    pub snapshots: Vec<PriceSnapshot>,
    pub history: Vec<Arc<PriceHistorySeries>>,
    pub view: DashboardView,
    pub new_notifications: Vec<Notification>,
    pub servers: Vec<ServerReport>,
    /// Per-operation failures; none of them aborted the cycle
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Status line for one supervised server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReport {
    pub kind: ServerKind,
    pub status: ServerStatus,
    pub pid: Option<u32>,
    pub output_lines: usize,
    pub dropped_lines: u64,
}

/// Market-wide analysis
#[derive(Debug, Clone, Default)]
pub struct MarketOverview {
    pub dominance: BTreeMap<String, f64>,
    /// 24h volume in USD, largest first
    pub volume: Vec<(String, f64)>,
    pub deviation: Vec<(CoinSymbol, f64)>,
    /// Change over the cached window, best performer first
    pub performance: Vec<(CoinSymbol, f64)>,
    /// Every supported coin; uncached ones use a 7d window
    pub correlation: Option<CorrelationMatrix>,
    pub errors: Vec<String>,
}

/// Status information for session
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub version: String,
    pub state: SessionState,
    pub api_url: String,
    pub coins: Vec<CoinSymbol>,
    pub timeframe: Timeframe,
    pub display_mode: DisplayMode,
    pub cached_series: usize,
    pub history_fetches: u64,
    pub notifications: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub servers: Vec<ServerReport>,
    pub session_stats: SessionStats,
}

/// Result of one interactive command
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Cycle(CycleReport),
    Message(String),
    Alerts(Vec<AlertRow>),
    Notifications(Vec<NotificationRow>),
    Market(MarketOverview),
    Servers(Vec<ServerReport>),
    ServerOutput { kind: ServerKind, output: String },
    Status(StatusInfo),
    Config(Config),
    Help(Vec<&'static str>),
    Quit,
}

/// Owns the client, caches, alert state and server supervisor for one dashboard session
pub struct DashboardSession {
    app_config: Config,
    rest_client: RemoteClient,
    market_cache: MarketDataCache,
    alert_store: AlertThresholdStore,
    notifications: NotificationDeduplicator,
    supervisor: ServerProcessSupervisor,
    selected_coins: Vec<CoinSymbol>,
    display_mode: DisplayMode,
    last_update: Option<DateTime<Utc>>,
    state: SessionState,
    stats: SessionStats,
}

impl DashboardSession {
    pub fn new(app_config: Config) -> Self {
        info!("Creating dashboard session against {}", app_config.api.base_url);

        let rest_client = RemoteClient::from_config(&app_config.api);
        let market_cache = MarketDataCache::new(rest_client.clone(), app_config.timeframe);
        let alert_store = AlertThresholdStore::new(rest_client.clone());
        let notifications = NotificationDeduplicator::new(rest_client.clone());
        let supervisor = ServerProcessSupervisor::from_config(&app_config.servers);

        Self {
            selected_coins: dedup_coins(&app_config.coins),
            display_mode: app_config.display_mode,
            app_config,
            rest_client,
            market_cache,
            alert_store,
            notifications,
            supervisor,
            last_update: None,
            state: SessionState::Running,
            stats: SessionStats::default(),
        }
    }

    /// Run one refresh pass: health probe, snapshots, cached history, alert poll, view.
    ///
    /// Failures are collected per operation and never abort the pass.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.stats.cycles_run += 1;
        let timeframe = self.market_cache.timeframe();
        let mut errors = Vec::new();

        let api_online = self.rest_client.health().await;
        self.supervisor.record_health(ServerKind::Api, api_online);
        self.supervisor.refresh_all().await;

        if !api_online {
            warn!("API server is not available, skipping data refresh");
            return CycleReport {
                api_online,
                timeframe,
                snapshots: Vec::new(),
                history: Vec::new(),
                view: ui::build_view(self.display_mode, &[]),
                new_notifications: Vec::new(),
                servers: self.server_reports(),
                errors,
                completed_at: Utc::now(),
            };
        }

        let mut snapshots = Vec::with_capacity(self.selected_coins.len());
        let mut history = Vec::with_capacity(self.selected_coins.len());
        for coin in self.selected_coins.clone() {
            match self.market_cache.get_snapshot(coin).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => errors.push(format!("Stats for {}: {}", coin, e)),
            }
            match self.market_cache.get_history(coin, timeframe).await {
                Ok(series) => history.push(series),
                Err(e) => errors.push(format!("History for {}: {}", coin, e)),
            }
        }

        let new_notifications = match self.notifications.poll().await {
            Ok(appended) => appended,
            Err(e) => {
                errors.push(format!("Alert check: {}", e));
                Vec::new()
            }
        };

        if !snapshots.is_empty() {
            self.last_update = Some(Utc::now());
        }
        if !errors.is_empty() {
            self.stats.errors_encountered += errors.len() as u64;
            debug!("Cycle finished with {} error(s)", errors.len());
        }

        CycleReport {
            api_online,
            timeframe,
            view: ui::build_view(self.display_mode, &snapshots),
            snapshots,
            history,
            new_notifications,
            servers: self.server_reports(),
            errors,
            completed_at: Utc::now(),
        }
    }

    /// Ask the backend to refresh, drop cached history, then run a cycle
    pub async fn refresh(&mut self) -> CycleReport {
        let trigger = self.rest_client.trigger_update().await;
        self.market_cache.invalidate();

        let mut report = self.run_cycle().await;
        if let Err(e) = trigger {
            if report.api_online {
                report.errors.insert(0, format!("Trigger update: {}", e));
                self.stats.errors_encountered += 1;
            } else {
                warn!("Trigger update failed while API offline: {}", e);
            }
        }
        report
    }

    /// Dispatch one interactive command to the owning component
    pub async fn handle_command(
        &mut self,
        command: InteractiveCommand,
    ) -> DashboardResult<CommandOutcome> {
        debug!("Handling command: {:?}", command);
        self.stats.commands_processed += 1;

        let result = self.dispatch(command).await;
        if let Err(e) = &result {
            error!("Command failed: {}", e);
            self.stats.errors_encountered += 1;
        }
        result
    }

    async fn dispatch(&mut self, command: InteractiveCommand) -> DashboardResult<CommandOutcome> {
        match command {
            InteractiveCommand::Refresh => Ok(CommandOutcome::Cycle(self.refresh().await)),
            InteractiveCommand::Update => {
                self.rest_client.trigger_update().await?;
                Ok(CommandOutcome::Message(
                    "Backend statistics update triggered".to_string(),
                ))
            }
            InteractiveCommand::Timeframe { timeframe } => {
                self.market_cache.set_timeframe(timeframe);
                Ok(CommandOutcome::Cycle(self.run_cycle().await))
            }
            InteractiveCommand::Coins { coins } => {
                self.set_selected_coins(coins)?;
                Ok(CommandOutcome::Cycle(self.run_cycle().await))
            }
            InteractiveCommand::View { mode } => {
                self.display_mode = mode;
                Ok(CommandOutcome::Cycle(self.run_cycle().await))
            }
            InteractiveCommand::SetAlert { coin, upper, lower } => {
                let threshold = self.alert_store.set_threshold(coin, upper, lower).await?;
                Ok(CommandOutcome::Message(describe_threshold(&threshold)))
            }
            InteractiveCommand::Alerts => Ok(CommandOutcome::Alerts(ui::alert_rows(
                &self.alert_store.active_thresholds(),
            ))),
            InteractiveCommand::Notifications => Ok(CommandOutcome::Notifications(
                ui::notification_rows(self.notifications.log()),
            )),
            InteractiveCommand::Market => Ok(CommandOutcome::Market(self.market_overview().await)),
            InteractiveCommand::Server { action, kind } => self.handle_server(action, kind).await,
            InteractiveCommand::Status => Ok(CommandOutcome::Status(self.status_info())),
            InteractiveCommand::Config => Ok(CommandOutcome::Config(self.app_config.clone())),
            InteractiveCommand::Help => Ok(CommandOutcome::Help(CommandRouter::help_messages())),
            InteractiveCommand::Quit => {
                self.shutdown().await;
                Ok(CommandOutcome::Quit)
            }
        }
    }

    async fn handle_server(
        &mut self,
        action: ServerAction,
        kind: ServerKind,
    ) -> DashboardResult<CommandOutcome> {
        match action {
            ServerAction::Start => {
                let status = self.supervisor.start(kind)?;
                let message = match status {
                    ServerStatus::Starting => {
                        format!("Starting {} server... waiting for health check", kind)
                    }
                    _ => format!("{} server started", kind),
                };
                Ok(CommandOutcome::Message(message))
            }
            ServerAction::Stop => {
                self.supervisor.stop(kind).await?;
                Ok(CommandOutcome::Message(format!("{} server stopped", kind)))
            }
            ServerAction::Status => {
                if kind.has_health_probe() {
                    let healthy = self.rest_client.health().await;
                    self.supervisor.record_health(kind, healthy);
                }
                self.supervisor.refresh(kind).await;
                Ok(CommandOutcome::Servers(self.server_reports()))
            }
            ServerAction::Logs => Ok(CommandOutcome::ServerOutput {
                kind,
                output: self.supervisor.output_snapshot(kind),
            }),
        }
    }

    /// Dominance, volume ranking, deviation and correlation across supported coins
    pub async fn market_overview(&mut self) -> MarketOverview {
        let mut overview = MarketOverview::default();

        match self.rest_client.get_dominance().await {
            Ok(dominance) => overview.dominance = dominance,
            Err(e) => overview.errors.push(format!("Market dominance: {}", e)),
        }

        match self.rest_client.get_volume().await {
            Ok(volume) => {
                let mut ranked: Vec<(String, f64)> = volume.into_iter().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                overview.volume = ranked;
            }
            Err(e) => overview.errors.push(format!("Trading volume: {}", e)),
        }

        for coin in CoinSymbol::ALL {
            match self.rest_client.get_deviation(coin).await {
                Ok(deviation) => overview.deviation.push((coin, deviation)),
                Err(e) => overview.errors.push(format!("Deviation for {}: {}", coin, e)),
            }
        }

        let cached = self.market_cache.cached_history();
        let mut performance: Vec<(CoinSymbol, f64)> = cached
            .iter()
            .filter_map(|s| s.change_percent().map(|change| (s.coin(), change)))
            .collect();
        performance.sort_by(|a, b| b.1.total_cmp(&a.1));
        overview.performance = performance;

        // Coins not cached under the active timeframe are fetched for the matrix only
        let mut correlated: Vec<Arc<PriceHistorySeries>> = Vec::with_capacity(CoinSymbol::ALL.len());
        for coin in CoinSymbol::ALL {
            if let Some(series) = cached.iter().find(|s| s.coin() == coin) {
                correlated.push(Arc::clone(series));
                continue;
            }
            match self
                .rest_client
                .get_history(coin, CORRELATION_FALLBACK_TIMEFRAME)
                .await
            {
                Ok(series) => correlated.push(Arc::new(series)),
                Err(e) => overview.errors.push(format!("History for {}: {}", coin, e)),
            }
        }

        let series: Vec<&PriceHistorySeries> = correlated.iter().map(|s| s.as_ref()).collect();
        overview.correlation = correlation_matrix(&series);

        overview
    }

    /// Replace the selected coins; duplicates collapse, order is kept
    pub fn set_selected_coins(&mut self, coins: Vec<CoinSymbol>) -> DashboardResult<()> {
        if coins.is_empty() {
            return Err(DashboardError::InvalidArgument(
                "At least one coin must be selected".to_string(),
            ));
        }
        self.selected_coins = dedup_coins(&coins);
        info!("Selected coins: {:?}", self.selected_coins);
        Ok(())
    }

    pub fn server_reports(&self) -> Vec<ServerReport> {
        ServerKind::ALL
            .into_iter()
            .map(|kind| {
                let output = self.supervisor.output(kind);
                ServerReport {
                    kind,
                    status: self.supervisor.status(kind),
                    pid: self.supervisor.pid(kind),
                    output_lines: output.line_count(),
                    dropped_lines: output.dropped_lines(),
                }
            })
            .collect()
    }

    pub fn status_info(&self) -> StatusInfo {
        StatusInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: self.state,
            api_url: self.rest_client.base_url().to_string(),
            coins: self.selected_coins.clone(),
            timeframe: self.market_cache.timeframe(),
            display_mode: self.display_mode,
            cached_series: self.market_cache.cached_count(),
            history_fetches: self.market_cache.history_fetches(),
            notifications: self.notifications.len(),
            last_update: self.last_update,
            servers: self.server_reports(),
            session_stats: self.stats.clone(),
        }
    }

    /// Stop every server this session started
    pub async fn shutdown(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        info!("Initiating graceful shutdown");
        self.state = SessionState::ShuttingDown;
        self.supervisor.shutdown().await;
        self.state = SessionState::Terminated;
        info!("Shutdown completed");
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn selected_coins(&self) -> &[CoinSymbol] {
        &self.selected_coins
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn market_cache(&self) -> &MarketDataCache {
        &self.market_cache
    }

    pub fn alert_store(&self) -> &AlertThresholdStore {
        &self.alert_store
    }

    pub fn notifications(&self) -> &NotificationDeduplicator {
        &self.notifications
    }

    pub fn supervisor(&self) -> &ServerProcessSupervisor {
        &self.supervisor
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            warn!("DashboardSession dropped without proper shutdown");
        }
    }
}

fn dedup_coins(coins: &[CoinSymbol]) -> Vec<CoinSymbol> {
    let mut unique = Vec::with_capacity(coins.len());
    for coin in coins {
        if !unique.contains(coin) {
            unique.push(*coin);
        }
    }
    unique
}

fn describe_threshold(threshold: &AlertThreshold) -> String {
    if !threshold.is_active() {
        return format!("Price alert cleared for {}", threshold.coin.display_name());
    }

    let mut bounds = Vec::new();
    if let Some(upper) = threshold.upper {
        bounds.push(format!("upper ${:.2}", upper));
    }
    if let Some(lower) = threshold.lower {
        bounds.push(format!("lower ${:.2}", lower));
    }
    format!(
        "Price alert set for {}: {}",
        threshold.coin.display_name(),
        bounds.join(", ")
    )
}
