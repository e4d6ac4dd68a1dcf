//! Failpoint implementations for the cluster under test.
//!
//! This module contains the concrete failpoints organized by category:
//!
//! - **process**: stop a member (kill, induced panic) and restart it
//! - **network**: degrade a member's peer link (blackhole, delay) and restore it
//! - **random**: pick one of the above that every member supports

pub mod network;
pub mod process;
pub mod random;

pub use network::{PeerBlackhole, PeerDelay};
pub use process::{InducedPanic, ProcessKill};
pub use random::RandomFault;

use crate::context::{FaultContext, Interrupted};
use crate::error::{FailpointError, Phase};

/// Maps an abandoned wait under `ctx` to the error reported for `fault`.
///
/// A deadline during [`Phase::Stop`] is the trigger timeout and reported as
/// [`FailpointError::Timeout`]; any other expiry carries the context's own
/// budget.
pub(crate) fn interrupted(
    fault: &str,
    phase: Phase,
    member: Option<&str>,
    ctx: &FaultContext,
    reason: Interrupted,
) -> FailpointError {
    let timeout = ctx.budget().unwrap_or_default();
    match (reason, phase, member) {
        (Interrupted::Cancelled, ..) => FailpointError::Cancelled {
            fault: fault.to_string(),
            phase,
            member: member.map(str::to_string),
        },
        (Interrupted::DeadlineExceeded, Phase::Stop, Some(member)) => FailpointError::Timeout {
            fault: fault.to_string(),
            member: member.to_string(),
            timeout,
        },
        (Interrupted::DeadlineExceeded, ..) => FailpointError::DeadlineExceeded {
            fault: fault.to_string(),
            phase,
            member: member.map(str::to_string),
            timeout,
        },
    }
}
