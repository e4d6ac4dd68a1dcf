//! Peer blackhole failpoint implementation.
//!
//! Cuts a member off from its peers by dropping all traffic through its peer
//! proxy, in both directions, for a fixed duration.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::info;

use crate::context::{FaultContext, Injection};
use crate::error::{Phase, Result};
use crate::faults::interrupted;
use crate::traits::{Cluster, Member};

use super::{missing_proxy, proxied_member, DEFAULT_DISRUPTION};

/// Network failpoint that blackholes a random member's peer traffic.
///
/// Traffic is restored even when the context ends during the disruption.
///
/// # Example
///
/// ```ignore
/// use cluster_failpoints::faults::PeerBlackhole;
/// use std::time::Duration;
///
/// let blackhole = PeerBlackhole::new().duration(Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerBlackhole {
    duration: Duration,
}

impl Default for PeerBlackhole {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerBlackhole {
    /// Name reported for this failpoint.
    pub const NAME: &'static str = "blackhole";

    /// Creates a blackhole failpoint lasting one second.
    pub fn new() -> Self {
        Self {
            duration: DEFAULT_DISRUPTION,
        }
    }

    /// Sets how long traffic stays blackholed.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Returns the configured disruption length.
    pub fn disruption(&self) -> Duration {
        self.duration
    }

    /// Returns the failpoint name.
    pub fn name(&self) -> &str {
        Self::NAME
    }

    /// True when `member` sits behind a peer proxy.
    pub fn available(&self, member: &dyn Member) -> bool {
        member.peer_proxy().is_some()
    }

    /// Blackholes a random member, waits, then restores its traffic.
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

        proxy.blackhole_tx();
        proxy.blackhole_rx();
        info!(member = member.name(), duration = ?self.duration, "Blackholing traffic from and to member");

        let slept = ctx.sleep(self.duration).await;

        proxy.unblackhole_tx();
        proxy.unblackhole_rx();
        info!(member = member.name(), "Traffic restored");

        slept.map_err(|reason| {
            interrupted(Self::NAME, Phase::Disrupt, Some(member.name()), ctx, reason)
        })?;
        Ok(Injection::new(ctx, Self::NAME, member.name(), started))
    }
}
