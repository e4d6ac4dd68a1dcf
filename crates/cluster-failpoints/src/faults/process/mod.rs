//! Process failpoint implementations.
//!
//! This module provides failpoints that stop a member and bring it back:
//!
//! - `ProcessKill`: Terminates the member with a signal
//! - `InducedPanic`: Arms a breakpoint inside the member so it panics

mod kill;
mod panic;

pub use kill::ProcessKill;
pub use panic::{InducedPanic, PANIC_ACTION};

use std::time::Duration;

use tracing::debug;

use crate::context::FaultContext;
use crate::error::{FailpointError, Phase, Result};
use crate::traits::Member;

use super::interrupted;

/// How long a member gets to exit once a stop was requested.
pub const DEFAULT_TRIGGER_TIMEOUT: Duration = Duration::from_secs(1);

/// Waits for one exit of `member` under `ctx`.
///
/// An abnormal exit is what a killed or panicked member reports, so it counts
/// as success.
pub(crate) async fn wait_for_exit(fault: &str, member: &dyn Member, ctx: &FaultContext) -> Result<()> {
    match ctx.run(member.process().wait()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.is_unexpected_exit() => {
            debug!(fault, member = member.name(), error = %err, "Member exited abnormally");
            Ok(())
        }
        Ok(Err(source)) => Err(FailpointError::ProcessStop {
            fault: fault.to_string(),
            member: member.name().to_string(),
            timeout: ctx.budget().unwrap_or_default(),
            source,
        }),
        Err(reason) => Err(interrupted(fault, Phase::Stop, Some(member.name()), ctx, reason)),
    }
}

/// Starts `member` again after it was confirmed stopped.
pub(crate) async fn restart(fault: &str, member: &dyn Member, ctx: &FaultContext) -> Result<()> {
    match ctx.run(member.process().start()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(FailpointError::Restart {
            fault: fault.to_string(),
            member: member.name().to_string(),
            source,
        }),
        Err(reason) => Err(interrupted(fault, Phase::Restart, Some(member.name()), ctx, reason)),
    }
}
