//! Lifecycle management for the API and worker backend processes
//!
//! Each server kind has one handle with an explicit `offline → starting → online` state machine.
//! A spawned process gets a dedicated capture task that appends its combined stdout/stderr to a
//! mutex-guarded buffer the UI reads from.

pub mod output;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ServerConfig, ServersConfig};
use crate::error::{DashboardError, DashboardResult};
pub use output::{OutputBuffer, OutputWriter};

/// How long `stop` waits for the capture task to see end-of-stream before aborting it
const CAPTURE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a server gets to exit after SIGTERM before its process group is killed
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// The two externally owned backend servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Api,
    Worker,
}

impl ServerKind {
    pub const ALL: [ServerKind; 2] = [ServerKind::Api, ServerKind::Worker];

    /// Whether the server exposes a health endpoint that confirms it is online
    pub fn has_health_probe(&self) -> bool {
        matches!(self, ServerKind::Api)
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::Api => f.write_str("api"),
            ServerKind::Worker => f.write_str("worker"),
        }
    }
}

impl FromStr for ServerKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(ServerKind::Api),
            "worker" => Ok(ServerKind::Worker),
            other => Err(DashboardError::InvalidArgument(format!(
                "Unknown server '{}'. Must be one of: api, worker",
                other
            ))),
        }
    }
}

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Offline,
    Starting,
    Online,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Offline => f.write_str("offline"),
            ServerStatus::Starting => f.write_str("starting"),
            ServerStatus::Online => f.write_str("online"),
        }
    }
}

/// Install-then-run command executed in the server's working directory
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub working_dir: PathBuf,
    pub install_command: String,
    pub start_command: String,
}

impl ServerCommand {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            working_dir: PathBuf::from(&config.working_dir),
            install_command: config.install_command.clone(),
            start_command: config.start_command.clone(),
        }
    }

    /// Shell script that merges stderr into stdout, installs, then replaces the shell with the server
    #[cfg(unix)]
    fn script(&self) -> String {
        if self.install_command.trim().is_empty() {
            format!("exec 2>&1; exec {}", self.start_command)
        } else {
            format!(
                "exec 2>&1; {} && exec {}",
                self.install_command, self.start_command
            )
        }
    }

    #[cfg(unix)]
    fn build(&self) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(self.script());
        command
    }

    #[cfg(windows)]
    fn build(&self) -> Command {
        let script = if self.install_command.trim().is_empty() {
            format!("{} 2>&1", self.start_command)
        } else {
            format!(
                "{} 2>&1 && {} 2>&1",
                self.install_command, self.start_command
            )
        };
        let mut command = Command::new("cmd");
        command.arg("/C").arg(script);
        command
    }

    /// Spawn the script. On unix it leads a new process group so children like `node` under
    /// `npm start` can be signalled together.
    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = self.build();
        command
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command.spawn()
    }
}

/// Deliver `signal` to every process in group `pgid` via `kill(1)`. Returns false when no
/// process in the group received it.
#[cfg(unix)]
async fn signal_group(pgid: u32, signal: &str) -> bool {
    let result = Command::new("kill")
        .args(["-s", signal, "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match result {
        Ok(status) => status.success(),
        Err(e) => {
            warn!("Failed to run kill for process group {}: {}", pgid, e);
            false
        }
    }
}

/// Blocking variant of `signal_group` for `Drop`
#[cfg(unix)]
fn signal_group_blocking(pgid: u32, signal: &str) {
    let result = std::process::Command::new("kill")
        .args(["-s", signal, "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        warn!("Failed to run kill for process group {}: {}", pgid, e);
    }
}

/// SIGTERM the whole group, give the leader `STOP_GRACE_PERIOD` to exit, then SIGKILL whatever
/// is left of the group.
#[cfg(unix)]
async fn terminate(kind: ServerKind, mut child: Child, pgid: Option<u32>) {
    let Some(pgid) = pgid else {
        if let Err(e) = child.kill().await {
            warn!("Failed to terminate {} server: {}", kind, e);
        }
        return;
    };

    if let Ok(Some(status)) = child.try_wait() {
        debug!("{} server had already exited: {}", kind, status);
    } else {
        debug!("Sending SIGTERM to {} server group {}", kind, pgid);
        signal_group(pgid, "TERM").await;
        match tokio::time::timeout(STOP_GRACE_PERIOD, child.wait()).await {
            Ok(Ok(status)) => debug!("{} server exited: {}", kind, status),
            Ok(Err(e)) => warn!("Failed to wait for {} server: {}", kind, e),
            Err(_) => warn!(
                "{} server ignored SIGTERM for {:?}, killing",
                kind, STOP_GRACE_PERIOD
            ),
        }
    }

    // Stragglers that outlived the leader still hold the output pipe
    if signal_group(pgid, "KILL").await {
        debug!("Killed leftover processes in {} server group {}", kind, pgid);
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to reap {} server: {}", kind, e);
    }
}

#[cfg(windows)]
async fn terminate(kind: ServerKind, mut child: Child, _pgid: Option<u32>) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!("{} server had already exited: {}", kind, status);
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to terminate {} server: {}", kind, e);
    }
}

/// Exclusively owned state for one server kind
struct ServerHandle {
    kind: ServerKind,
    command: ServerCommand,
    status: ServerStatus,
    process: Option<Child>,
    /// Process group led by the spawned script; equal to its pid
    group: Option<u32>,
    capture_task: Option<JoinHandle<()>>,
    output: OutputBuffer,
}

impl ServerHandle {
    fn new(kind: ServerKind, command: ServerCommand, max_lines: usize) -> Self {
        Self {
            kind,
            command,
            status: ServerStatus::Offline,
            process: None,
            group: None,
            capture_task: None,
            output: OutputBuffer::empty(max_lines),
        }
    }

    async fn release(&mut self) {
        if let Some(child) = self.process.take() {
            terminate(self.kind, child, self.group).await;
        }
        self.group = None;
        if let Some(task) = self.capture_task.take() {
            finish_capture(self.kind, task).await;
        }
        self.status = ServerStatus::Offline;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // kill_on_drop only reaches the group leader
        #[cfg(unix)]
        if let (Some(_), Some(pgid)) = (&self.process, self.group) {
            warn!("{} server dropped while running, killing group {}", self.kind, pgid);
            signal_group_blocking(pgid, "KILL");
        }
    }
}

/// Starts, stops and observes the API and worker processes
pub struct ServerProcessSupervisor {
    api: ServerHandle,
    worker: ServerHandle,
    output_max_lines: usize,
}

impl ServerProcessSupervisor {
    pub fn new(api: ServerCommand, worker: ServerCommand, output_max_lines: usize) -> Self {
        Self {
            api: ServerHandle::new(ServerKind::Api, api, output_max_lines),
            worker: ServerHandle::new(ServerKind::Worker, worker, output_max_lines),
            output_max_lines,
        }
    }

    pub fn from_config(config: &ServersConfig) -> Self {
        Self::new(
            ServerCommand::from_config(&config.api),
            ServerCommand::from_config(&config.worker),
            config.output_max_lines,
        )
    }

    fn handle(&self, kind: ServerKind) -> &ServerHandle {
        match kind {
            ServerKind::Api => &self.api,
            ServerKind::Worker => &self.worker,
        }
    }

    fn handle_mut(&mut self, kind: ServerKind) -> &mut ServerHandle {
        match kind {
            ServerKind::Api => &mut self.api,
            ServerKind::Worker => &mut self.worker,
        }
    }

    /// Spawn the server and begin capturing its output.
    ///
    /// The API stays `Starting` until `record_health` sees a successful probe; the worker has no
    /// health endpoint and is `Online` as soon as the spawn succeeds.
    pub fn start(&mut self, kind: ServerKind) -> DashboardResult<ServerStatus> {
        let max_lines = self.output_max_lines;
        let handle = self.handle_mut(kind);
        if handle.status != ServerStatus::Offline {
            return Err(DashboardError::AlreadyRunning(kind));
        }

        info!(
            "Starting {} server in {}",
            kind,
            handle.command.working_dir.display()
        );
        handle.status = ServerStatus::Starting;

        let (output, writer) = output::buffer(max_lines);
        handle.output = output;

        let mut child = match handle.command.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!("Failed to spawn {} server: {}", kind, source);
                handle.status = ServerStatus::Offline;
                return Err(DashboardError::SpawnFailure { kind, source });
            }
        };

        if let Some(stdout) = child.stdout.take() {
            handle.capture_task = Some(tokio::spawn(capture_output(kind, stdout, writer)));
        }
        debug!("{} server spawned with pid {:?}", kind, child.id());
        handle.group = child.id();
        handle.process = Some(child);

        if !kind.has_health_probe() {
            handle.status = ServerStatus::Online;
        }

        Ok(handle.status)
    }

    /// Terminate the owned process group and return to `Offline`. Safe if the process already
    /// exited.
    pub async fn stop(&mut self, kind: ServerKind) -> DashboardResult<()> {
        let handle = self.handle_mut(kind);
        if handle.status == ServerStatus::Offline {
            return Err(DashboardError::NotRunning(kind));
        }

        handle.release().await;
        info!("{} server stopped", kind);
        Ok(())
    }

    /// Feed the result of a health probe. Only moves a starting API server to `Online`.
    pub fn record_health(&mut self, kind: ServerKind, healthy: bool) -> ServerStatus {
        let handle = self.handle_mut(kind);
        if healthy && handle.status == ServerStatus::Starting && kind.has_health_probe() {
            info!("{} server passed health check, now online", kind);
            handle.status = ServerStatus::Online;
        }
        handle.status
    }

    /// Detect a process that exited on its own and move it to `Offline`, keeping its output
    pub async fn refresh(&mut self, kind: ServerKind) -> ServerStatus {
        let handle = self.handle_mut(kind);
        let exited = match handle.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(Some(status))) => {
                warn!("{} server exited: {}", kind, status);
                true
            }
            Some(Err(e)) => {
                warn!("Failed to query {} server state: {}", kind, e);
                false
            }
            _ => false,
        };

        if exited {
            handle.release().await;
        }
        handle.status
    }

    pub async fn refresh_all(&mut self) {
        for kind in ServerKind::ALL {
            self.refresh(kind).await;
        }
    }

    pub fn status(&self, kind: ServerKind) -> ServerStatus {
        self.handle(kind).status
    }

    pub fn pid(&self, kind: ServerKind) -> Option<u32> {
        self.handle(kind).process.as_ref().and_then(|child| child.id())
    }

    /// Captured output so far; reading never clears it
    pub fn output_snapshot(&self, kind: ServerKind) -> String {
        self.handle(kind).output.snapshot()
    }

    pub fn output(&self, kind: ServerKind) -> OutputBuffer {
        self.handle(kind).output.clone()
    }

    /// Stop every running server
    pub async fn shutdown(&mut self) {
        for kind in ServerKind::ALL {
            if self.status(kind) != ServerStatus::Offline {
                if let Err(e) = self.stop(kind).await {
                    warn!("Failed to stop {} server during shutdown: {}", kind, e);
                }
            }
        }
    }
}

/// Read the stream line by line until it closes
async fn capture_output<R>(kind: ServerKind, stream: R, writer: OutputWriter)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                writer.push_line(line.trim_end_matches(['\r', '\n']).to_string());
            }
            Err(e) => {
                warn!("Error reading {} server output: {}", kind, e);
                break;
            }
        }
    }

    debug!("{} server output stream closed", kind);
}

async fn finish_capture(kind: ServerKind, mut task: JoinHandle<()>) {
    match tokio::time::timeout(CAPTURE_DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{} output capture task failed: {}", kind, e),
        Err(_) => {
            // a grandchild may still hold the pipe open
            warn!("{} output stream still open after stop, detaching reader", kind);
            task.abort();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn command(dir: &std::path::Path, start: &str) -> ServerCommand {
        ServerCommand {
            working_dir: dir.to_path_buf(),
            install_command: "true".to_string(),
            start_command: start.to_string(),
        }
    }

    #[test]
    fn test_script_merges_streams_and_execs_server() {
        let cmd = command(std::path::Path::new("."), "npm start");
        assert_eq!(cmd.script(), "exec 2>&1; true && exec npm start");

        let cmd = ServerCommand {
            install_command: "  ".to_string(),
            ..cmd
        };
        assert_eq!(cmd.script(), "exec 2>&1; exec npm start");
    }

    #[test]
    fn test_server_kind_parsing() {
        assert_eq!("API".parse::<ServerKind>().unwrap(), ServerKind::Api);
        assert!(matches!(
            "db".parse::<ServerKind>(),
            Err(DashboardError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_record_health_only_promotes_starting_api() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = ServerProcessSupervisor::new(
            command(dir.path(), "sleep 30"),
            command(dir.path(), "sleep 30"),
            100,
        );

        assert_eq!(
            supervisor.record_health(ServerKind::Api, true),
            ServerStatus::Offline
        );

        assert_eq!(supervisor.start(ServerKind::Api).unwrap(), ServerStatus::Starting);
        assert_eq!(
            supervisor.record_health(ServerKind::Api, false),
            ServerStatus::Starting
        );
        assert_eq!(
            supervisor.record_health(ServerKind::Api, true),
            ServerStatus::Online
        );

        supervisor.shutdown().await;
        assert_eq!(supervisor.status(ServerKind::Api), ServerStatus::Offline);
    }
}
