//! Network failpoint implementations.
//!
//! This module provides failpoints that degrade a member's peer link through
//! its peer proxy, then restore it:
//!
//! - `PeerBlackhole`: Drops all peer traffic to and from the member
//! - `PeerDelay`: Adds latency to peer traffic in both directions

mod blackhole;
mod delay;

pub use blackhole::PeerBlackhole;
pub use delay::PeerDelay;

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{FailpointError, Result};
use crate::traits::{Cluster, Member};

/// How long a peer link stays degraded.
pub const DEFAULT_DISRUPTION: Duration = Duration::from_secs(1);

/// Picks a uniformly random member among those behind a peer proxy.
pub(crate) fn proxied_member<R: Rng + ?Sized>(
    fault: &str,
    cluster: &dyn Cluster,
    rng: &mut R,
) -> Result<Arc<dyn Member>> {
    let members = cluster.members();
    if members.is_empty() {
        return Err(FailpointError::EmptyCluster);
    }

    let proxied: Vec<&Arc<dyn Member>> = members
        .iter()
        .filter(|m| m.peer_proxy().is_some())
        .collect();
    proxied
        .choose(rng)
        .map(|&m| Arc::clone(m))
        .ok_or_else(|| missing_proxy(fault, members.len()))
}

pub(crate) fn missing_proxy(fault: &str, members: usize) -> FailpointError {
    FailpointError::MissingProxy {
        fault: fault.to_string(),
        members,
    }
}
