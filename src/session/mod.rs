//! Dashboard session module
//!
//! The session owns every stateful component (history cache, alert thresholds, notification log,
//! server supervisor) and exposes one operation per user action or timer tick.

pub mod alert_store;
pub mod command_router;
pub mod notifications;
pub mod session_manager;

pub use alert_store::{AlertThreshold, AlertThresholdStore};
pub use command_router::{CommandRouter, InteractiveCommand, ServerAction};
pub use notifications::{DedupKey, NotificationDeduplicator};
pub use session_manager::{
    CommandOutcome, CycleReport, DashboardSession, MarketOverview, ServerReport, SessionState,
    SessionStats, StatusInfo,
};
