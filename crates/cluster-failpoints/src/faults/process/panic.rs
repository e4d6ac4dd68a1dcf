//! Induced panic failpoint implementation.
//!
//! Arms a named breakpoint compiled into the member so that the next time the
//! code path runs the process panics, then restarts the member.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::context::{FaultContext, Injection};
use crate::error::{Phase, Result};
use crate::faults::interrupted;
use crate::target::Target;
use crate::traits::{Cluster, Member};
use crate::trigger::TriggerAction;

use super::{restart, wait_for_exit, DEFAULT_TRIGGER_TIMEOUT};

/// Breakpoint action that makes the member panic.
pub const PANIC_ACTION: &str = "panic";

/// How long a leader-targeted panic waits for an election.
pub const DEFAULT_LEADER_TIMEOUT: Duration = Duration::from_secs(5);

/// Failpoint that panics a member through a remote breakpoint.
///
/// # Example
///
/// ```ignore
/// use cluster_failpoints::faults::InducedPanic;
/// use cluster_failpoints::{Target, TriggerAction};
///
/// let panic = InducedPanic::new("defragBeforeCopy").with_trigger(TriggerAction::Defragment);
/// let leader = InducedPanic::new("raftBeforeLeaderSend").target(Target::Leader);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InducedPanic {
    breakpoint: String,
    trigger: Option<TriggerAction>,
    target: Target,
    trigger_timeout: Duration,
    leader_timeout: Duration,
}

impl InducedPanic {
    /// Creates a panic failpoint for `breakpoint` on any member.
    pub fn new(breakpoint: impl Into<String>) -> Self {
        Self {
            breakpoint: breakpoint.into(),
            trigger: None,
            target: Target::AnyMember,
            trigger_timeout: DEFAULT_TRIGGER_TIMEOUT,
            leader_timeout: DEFAULT_LEADER_TIMEOUT,
        }
    }

    /// Calls `action` after every arming attempt.
    pub fn with_trigger(mut self, action: TriggerAction) -> Self {
        self.trigger = Some(action);
        self
    }

    /// Sets which member is disrupted.
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Sets how long the member gets to panic.
    pub fn trigger_timeout(mut self, timeout: Duration) -> Self {
        self.trigger_timeout = timeout;
        self
    }

    /// Sets how long to wait for a leader when targeting one.
    pub fn leader_timeout(mut self, timeout: Duration) -> Self {
        self.leader_timeout = timeout;
        self
    }

    /// Returns the breakpoint name, which doubles as the failpoint name.
    pub fn name(&self) -> &str {
        &self.breakpoint
    }

    /// Returns the configured trigger action.
    pub fn trigger(&self) -> Option<TriggerAction> {
        self.trigger
    }

    /// Returns the configured target.
    pub fn target_kind(&self) -> Target {
        self.target
    }

    /// True when `member` exposes a breakpoint channel that can arm this
    /// breakpoint.
    pub fn available(&self, member: &dyn Member) -> bool {
        member
            .hooks()
            .is_some_and(|hooks| hooks.available().contains(&self.breakpoint))
    }

    /// Panics the target member and restarts it.
    pub async fn apply(
        &self,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
        rng: &mut StdRng,
    ) -> Result<Injection> {
        let member = ctx
            .run(self.target.resolve(cluster, rng, self.leader_timeout))
            .await
            .map_err(|reason| interrupted(&self.breakpoint, Phase::Resolve, None, ctx, reason))??;
        let started = Instant::now();
        let trigger_ctx = ctx.with_timeout(self.trigger_timeout);
        let process = member.process();

        info!(
            fault = %self.breakpoint,
            member = member.name(),
            target_kind = %self.target,
            "Triggering breakpoint panic"
        );

        while process.is_running() {
            match member.hooks() {
                Some(hooks) => {
                    match trigger_ctx.run(hooks.setup(&self.breakpoint, PANIC_ACTION)).await {
                        Ok(Ok(())) => {
                            debug!(fault = %self.breakpoint, member = member.name(), "Breakpoint armed");
                        }
                        Ok(Err(e)) => {
                            warn!(member = member.name(), error = %e, "Breakpoint setup failed");
                        }
                        Err(e) => {
                            warn!(member = member.name(), error = %e, "Breakpoint setup failed");
                        }
                    }
                }
                None => warn!(member = member.name(), "Member has no breakpoint channel"),
            }

            if let Some(action) = self.trigger {
                if let Err(e) = action.fire(&trigger_ctx, member.as_ref()).await {
                    warn!(
                        member = member.name(),
                        action = %action,
                        error = %e,
                        "Triggering breakpoint failed"
                    );
                }
            }

            wait_for_exit(&self.breakpoint, member.as_ref(), &trigger_ctx).await?;
        }

        restart(&self.breakpoint, member.as_ref(), ctx).await?;

        info!(fault = %self.breakpoint, member = member.name(), "Member restarted");
        Ok(Injection::new(ctx, self.breakpoint.as_str(), member.name(), started))
    }
}
