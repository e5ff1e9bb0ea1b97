//! Error taxonomy shared by the backend client, caches and process supervisor

use crate::supervisor::ServerKind;

/// Typed failure outcome for every core dashboard operation
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Bad coin, timeframe or threshold; rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection refused, DNS failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status with the server's message
    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Success status whose body could not be decoded or is inconsistent
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} server is already running")]
    AlreadyRunning(ServerKind),

    #[error("{0} server is not running")]
    NotRunning(ServerKind),

    #[error("Failed to spawn {kind} server: {source}")]
    SpawnFailure {
        kind: ServerKind,
        #[source]
        source: std::io::Error,
    },
}

impl DashboardError {
    /// Whether the failure happened before the request reached the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, DashboardError::Transport(_))
    }
}

/// Result alias for core operations
pub type DashboardResult<T> = Result<T, DashboardError>;
