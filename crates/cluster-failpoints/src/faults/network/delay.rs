//! Peer delay failpoint implementation.
//!
//! Slows a member's peer traffic in both directions by a base latency plus a
//! randomized component, for a fixed duration.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::info;

use crate::context::{FaultContext, Injection};
use crate::error::{Phase, Result};
use crate::faults::interrupted;
use crate::traits::{Cluster, Member};

use super::{missing_proxy, proxied_member, DEFAULT_DISRUPTION};

/// Default latency added to every peer message.
pub const DEFAULT_BASE_LATENCY: Duration = Duration::from_millis(75);

/// Default randomized latency on top of the base.
pub const DEFAULT_RANDOMIZED_LATENCY: Duration = Duration::from_millis(50);

/// Network failpoint that delays a random member's peer traffic.
///
/// # Example
///
/// ```ignore
/// use cluster_failpoints::faults::PeerDelay;
/// use std::time::Duration;
///
/// let delay = PeerDelay::new()
///     .base_latency(Duration::from_millis(200))
///     .randomized_latency(Duration::from_millis(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDelay {
    /// How long traffic stays delayed.
    duration: Duration,
    /// Fixed latency added to each message.
    base_latency: Duration,
    /// Upper bound of the random latency on top of the base.
    randomized_latency: Duration,
}

impl Default for PeerDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDelay {
    /// Name reported for this failpoint.
    pub const NAME: &'static str = "delay";

    /// Creates a delay failpoint with 75ms +/- 50ms latency for one second.
    pub fn new() -> Self {
        Self {
            duration: DEFAULT_DISRUPTION,
            base_latency: DEFAULT_BASE_LATENCY,
            randomized_latency: DEFAULT_RANDOMIZED_LATENCY,
        }
    }

    /// Sets how long traffic stays delayed.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the fixed latency.
    pub fn base_latency(mut self, latency: Duration) -> Self {
        self.base_latency = latency;
        self
    }

    /// Sets the randomized latency.
    pub fn randomized_latency(mut self, latency: Duration) -> Self {
        self.randomized_latency = latency;
        self
    }

    /// Returns the configured disruption length.
    pub fn disruption(&self) -> Duration {
        self.duration
    }

    /// Returns the base and randomized latency.
    pub fn latency(&self) -> (Duration, Duration) {
        (self.base_latency, self.randomized_latency)
    }

    /// Returns the failpoint name.
    pub fn name(&self) -> &str {
        Self::NAME
    }

    /// True when `member` sits behind a peer proxy.
    pub fn available(&self, member: &dyn Member) -> bool {
        member.peer_proxy().is_some()
    }

    /// Delays a random member's traffic, waits, then removes the delay.
    pub async fn apply(
        &self,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
        rng: &mut StdRng,
    ) -> Result<Injection> {
        let member = proxied_member(Self::NAME, cluster, rng)?;
        let proxy = member
            .peer_proxy()
            .ok_or_else(|| missing_proxy(Self::NAME, cluster.members().len()))?;
        let started = Instant::now();

        proxy.delay_rx(self.base_latency, self.randomized_latency);
        proxy.delay_tx(self.base_latency, self.randomized_latency);
        info!(
            member = member.name(),
            base_latency = ?self.base_latency,
            randomized_latency = ?self.randomized_latency,
            duration = ?self.duration,
            "Delaying traffic from and to member"
        );

        let slept = ctx.sleep(self.duration).await;

        proxy.undelay_rx();
        proxy.undelay_tx();
        info!(member = member.name(), "Traffic delay removed");

        slept.map_err(|reason| {
            interrupted(Self::NAME, Phase::Disrupt, Some(member.name()), ctx, reason)
        })?;
        Ok(Injection::new(ctx, Self::NAME, member.name(), started))
    }
}
