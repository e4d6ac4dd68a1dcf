//! Process kill failpoint implementation.
//!
//! Terminates a random member with a signal and restarts it once the
//! process is confirmed gone.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::context::{FaultContext, Injection};
use crate::error::Result;
use crate::target::random_member;
use crate::traits::{Cluster, Member};

use super::{restart, wait_for_exit, DEFAULT_TRIGGER_TIMEOUT};

/// Process kill failpoint that terminates a member and restarts it.
///
/// The target is any member, leader or not. Signals are resent until the
/// process stops reporting itself as running, all within one
/// `trigger_timeout` window.
///
/// # Example
///
/// ```ignore
/// use cluster_failpoints::faults::ProcessKill;
/// use std::time::Duration;
///
/// let kill = ProcessKill::new().trigger_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessKill {
    /// Time the member gets to exit after the first signal.
    trigger_timeout: Duration,
}

impl Default for ProcessKill {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessKill {
    /// Name reported for this failpoint.
    pub const NAME: &'static str = "Kill";

    /// Creates a kill failpoint with the default one second trigger timeout.
    pub fn new() -> Self {
        Self {
            trigger_timeout: DEFAULT_TRIGGER_TIMEOUT,
        }
    }

    /// Sets how long the member gets to exit.
    pub fn trigger_timeout(mut self, timeout: Duration) -> Self {
        self.trigger_timeout = timeout;
        self
    }

    /// Returns the configured trigger timeout.
    pub fn timeout(&self) -> Duration {
        self.trigger_timeout
    }

    /// Returns the failpoint name.
    pub fn name(&self) -> &str {
        Self::NAME
    }

    /// Every member can be killed.
    pub fn available(&self, _member: &dyn Member) -> bool {
        true
    }

    /// Kills a random member and restarts it.
    pub async fn apply(
        &self,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
        rng: &mut StdRng,
    ) -> Result<Injection> {
        let member = random_member(cluster, rng)?;
        let started = Instant::now();
        let kill_ctx = ctx.with_timeout(self.trigger_timeout);
        let process = member.process();

        info!(fault = Self::NAME, member = member.name(), "Killing member");

        while process.is_running() {
            if let Err(e) = process.kill() {
                warn!(member = member.name(), error = %e, "Sending kill signal failed");
            }
            wait_for_exit(Self::NAME, member.as_ref(), &kill_ctx).await?;
        }

        restart(Self::NAME, member.as_ref(), ctx).await?;

        info!(fault = Self::NAME, member = member.name(), "Member restarted");
        Ok(Injection::new(ctx, Self::NAME, member.name(), started))
    }
}
