//! Error types for the failpoint harness.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::context::Interrupted;

/// Result type alias for failpoint operations.
pub type Result<T> = std::result::Result<T, FailpointError>;

/// Step of a failpoint during which a wait was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Looking up the member to disrupt.
    Resolve,
    /// Waiting for the member to exit.
    Stop,
    /// Starting the member again.
    Restart,
    /// Holding a network degradation in place.
    Disrupt,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Resolve => write!(f, "resolving its target"),
            Phase::Stop => write!(f, "stopping"),
            Phase::Restart => write!(f, "restarting"),
            Phase::Disrupt => write!(f, "disrupting"),
        }
    }
}

fn on_member(member: &Option<String>) -> String {
    member
        .as_deref()
        .map(|m| format!(" member {m}"))
        .unwrap_or_default()
}

/// Errors that can occur while applying a failpoint.
#[derive(Debug, Error)]
pub enum FailpointError {
    /// The cluster has no members to target.
    #[error("Cluster has no members")]
    EmptyCluster,

    /// No leader was elected within the resolver timeout.
    #[error("No leader found within {timeout:?}")]
    NoLeader {
        /// How long the election was waited for.
        timeout: Duration,
    },

    /// The member did not stop within the trigger timeout.
    #[error("Failpoint {fault} did not stop member {member} within {timeout:?}")]
    Timeout {
        /// Failpoint name.
        fault: String,
        /// Member that kept running.
        member: String,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// The caller's deadline passed outside the stop wait.
    #[error("Failpoint {fault} exceeded its {timeout:?} deadline while {phase}{}", on_member(.member))]
    DeadlineExceeded {
        /// Failpoint name.
        fault: String,
        /// Step that was in flight.
        phase: Phase,
        /// Member being disrupted, once resolved.
        member: Option<String>,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// The caller cancelled the context while the failpoint was in flight.
    #[error("Failpoint {fault} was cancelled while {phase}{}", on_member(.member))]
    Cancelled {
        /// Failpoint name.
        fault: String,
        /// Step that was in flight.
        phase: Phase,
        /// Member being disrupted, once resolved.
        member: Option<String>,
    },

    /// Waiting for the member to exit failed with something other than an
    /// abnormal exit.
    #[error("Failpoint {fault} failed to stop member {member} within {timeout:?}: {source}")]
    ProcessStop {
        /// Failpoint name.
        fault: String,
        /// Member that was being stopped.
        member: String,
        /// Trigger timeout in effect.
        timeout: Duration,
        /// Error reported by the process handle.
        #[source]
        source: ProcessError,
    },

    /// The member could not be restarted after being stopped.
    #[error("Failed to restart member {member} after {fault}: {source}")]
    Restart {
        /// Failpoint name.
        fault: String,
        /// Member left stopped.
        member: String,
        /// Error reported by the process handle.
        #[source]
        source: ProcessError,
    },

    /// A network failpoint found no member behind a peer proxy.
    #[error("None of the {members} members has a peer proxy for failpoint {fault}")]
    MissingProxy {
        /// Failpoint name.
        fault: String,
        /// Cluster size.
        members: usize,
    },

    /// None of the composite's candidates is available on every member.
    #[error("No eligible failpoint among {candidates} candidates")]
    NoEligibleFault {
        /// Number of candidates considered.
        candidates: usize,
    },

    /// A failpoint was requested by a name the catalog does not know.
    #[error("Unknown failpoint: {0}")]
    UnknownFault(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FailpointError {
    /// Checks if this error is a deadline or cancellation expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FailpointError::Timeout { .. }
                | FailpointError::DeadlineExceeded { .. }
                | FailpointError::Cancelled { .. }
        )
    }

    /// Checks if this error means the test setup cannot support the failpoint
    /// at all, so retrying is pointless.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            FailpointError::EmptyCluster
                | FailpointError::NoLeader { .. }
                | FailpointError::MissingProxy { .. }
                | FailpointError::NoEligibleFault { .. }
                | FailpointError::UnknownFault(_)
                | FailpointError::InvalidConfiguration(_)
                | FailpointError::ConfigParse(_)
                | FailpointError::Restart { .. }
        )
    }
}

/// Errors reported by a member's process handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The process exited with a non-zero status. Expected after a kill or
    /// an induced panic.
    #[error("unexpected exit code {code}")]
    UnexpectedExitCode {
        /// Exit status reported by the process.
        code: i32,
    },

    /// Delivering a signal failed.
    #[error("failed to signal process: {0}")]
    Signal(String),

    /// The process could not be started.
    #[error("failed to start process: {0}")]
    Start(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl ProcessError {
    /// Returns true for the abnormal exit a deliberately disrupted member is
    /// expected to report.
    pub fn is_unexpected_exit(&self) -> bool {
        matches!(self, ProcessError::UnexpectedExitCode { .. })
    }
}

/// Errors reported by a member's remote breakpoint channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The member is not reachable.
    #[error("hook endpoint unreachable: {0}")]
    Unreachable(String),

    /// The member does not know the breakpoint.
    #[error("unknown breakpoint: {0}")]
    UnknownBreakpoint(String),

    /// The member rejected the request.
    #[error("hook request rejected: {0}")]
    Rejected(String),
}

/// Errors reported by the cluster client used by trigger actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server closed the connection mid-call. Expected when the armed
    /// breakpoint panics the member while serving the request.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// The client could not be created.
    #[error("failed creating client: {0}")]
    Connect(String),

    /// The server answered with an error.
    #[error("rpc failed: {0}")]
    Rpc(String),
}

impl ClientError {
    /// Returns true when the server went away mid-call.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, ClientError::ConnectionClosed)
    }
}

/// Errors raised by a trigger action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// The client call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The trigger window ended before the call returned.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The member advertises no client endpoint.
    #[error("member {0} has no client endpoint")]
    NoEndpoint(String),
}
