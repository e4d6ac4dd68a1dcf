//! Collaborator contracts consumed by the failpoints.
//!
//! The harness never owns a cluster. It drives whatever process manager,
//! debug-hook channel and peer proxy the surrounding test framework provides
//! through the traits below. Implementations must be thread-safe because the
//! cluster keeps serving client load while a failpoint is applied.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, HookError, ProcessError};

/// Lifecycle handle for one member process.
#[async_trait]
pub trait Process: Send + Sync {
    /// Returns whether the process is currently running.
    fn is_running(&self) -> bool;

    /// Sends a terminate signal to the process.
    fn kill(&self) -> std::result::Result<(), ProcessError>;

    /// Waits for the process to exit.
    ///
    /// A process that exits abnormally reports
    /// [`ProcessError::UnexpectedExitCode`]. Callers bound this wait with
    /// their own deadline, so implementations may block indefinitely.
    async fn wait(&self) -> std::result::Result<(), ProcessError>;

    /// Starts the process again after it stopped.
    async fn start(&self) -> std::result::Result<(), ProcessError>;
}

/// Remote control channel for the named breakpoints compiled into a member.
#[async_trait]
pub trait RemoteHooks: Send + Sync {
    /// Arms the breakpoint `name` with `action` (for example `"panic"`).
    async fn setup(&self, name: &str, action: &str) -> std::result::Result<(), HookError>;

    /// Returns the breakpoints this member can currently arm.
    fn available(&self) -> HashSet<String>;
}

/// Proxy sitting in front of a member's peer-to-peer traffic.
pub trait PeerProxy: Send + Sync {
    /// Drops all outbound peer traffic.
    fn blackhole_tx(&self);

    /// Drops all inbound peer traffic.
    fn blackhole_rx(&self);

    /// Restores outbound peer traffic.
    fn unblackhole_tx(&self);

    /// Restores inbound peer traffic.
    fn unblackhole_rx(&self);

    /// Delays outbound peer traffic by `latency` plus or minus `jitter`.
    fn delay_tx(&self, latency: Duration, jitter: Duration);

    /// Delays inbound peer traffic by `latency` plus or minus `jitter`.
    fn delay_rx(&self, latency: Duration, jitter: Duration);

    /// Removes the outbound delay.
    fn undelay_tx(&self);

    /// Removes the inbound delay.
    fn undelay_rx(&self);
}

/// Key-value revision as reported by the cluster.
pub type Revision = i64;

/// Dial settings for the short-lived clients opened by trigger actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Interval between keep-alive pings.
    pub keep_alive_time: Duration,
    /// How long to wait for a keep-alive answer before dropping the
    /// connection.
    pub keep_alive_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            keep_alive_time: Duration::from_millis(1),
            keep_alive_timeout: Duration::from_millis(5),
        }
    }
}

/// Minimal client used to provoke armed breakpoints.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Forces a defragmentation of the backend on `endpoint`.
    async fn defragment(&self, endpoint: &str) -> std::result::Result<(), ClientError>;

    /// Reads `key` and returns the revision the read was served at.
    async fn get(&self, key: &str) -> std::result::Result<Revision, ClientError>;

    /// Compacts the key-value history up to `revision`.
    async fn compact(&self, revision: Revision) -> std::result::Result<(), ClientError>;
}

/// One member of the cluster under test.
#[async_trait]
pub trait Member: Send + Sync {
    /// Stable member name used in logs and errors.
    fn name(&self) -> &str;

    /// The member's process handle.
    fn process(&self) -> &dyn Process;

    /// The member's breakpoint channel, if it was built with one.
    fn hooks(&self) -> Option<&dyn RemoteHooks>;

    /// The proxy in front of the member's peer traffic, if any.
    fn peer_proxy(&self) -> Option<&dyn PeerProxy>;

    /// Client endpoints served by the member.
    fn endpoints(&self) -> Vec<String>;

    /// Opens a client connected to this member only.
    async fn connect(
        &self,
        options: ClientOptions,
    ) -> std::result::Result<Box<dyn ClusterClient>, ClientError>;
}

/// The cluster under test.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Members in a stable order.
    fn members(&self) -> &[Arc<dyn Member>];

    /// Waits up to `timeout` for a leader and returns its index into
    /// [`members`](Cluster::members).
    async fn wait_leader(&self, timeout: Duration) -> Option<usize>;
}
