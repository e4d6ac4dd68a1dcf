//! The closed set of failpoints the harness can apply.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};
use rand::rngs::StdRng;

use crate::context::{FaultContext, Injection};
use crate::error::Result;
use crate::faults::{InducedPanic, PeerBlackhole, PeerDelay, ProcessKill, RandomFault};
use crate::traits::{Cluster, Member};

/// A failpoint: one reversible disruption of a running member.
///
/// Every variant is immutable configuration. Applying a fault performs the
/// disruption end to end, including the restart or undo, and resolves once
/// the cluster is whole again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Kill a random member and restart it.
    Kill(ProcessKill),
    /// Panic a member through a named breakpoint and restart it.
    Panic(InducedPanic),
    /// Drop a random member's peer traffic for a while.
    Blackhole(PeerBlackhole),
    /// Delay a random member's peer traffic for a while.
    Delay(PeerDelay),
    /// Pick one of several faults that every member supports.
    Random(RandomFault),
}

impl Fault {
    /// Stable identifier of the fault.
    pub fn name(&self) -> &str {
        match self {
            Fault::Kill(f) => f.name(),
            Fault::Panic(f) => f.name(),
            Fault::Blackhole(f) => f.name(),
            Fault::Delay(f) => f.name(),
            Fault::Random(f) => f.name(),
        }
    }

    /// Whether `member` has what the fault needs. Never touches the member.
    pub fn available(&self, member: &dyn Member) -> bool {
        match self {
            Fault::Kill(f) => f.available(member),
            Fault::Panic(f) => f.available(member),
            Fault::Blackhole(f) => f.available(member),
            Fault::Delay(f) => f.available(member),
            Fault::Random(f) => f.available(member),
        }
    }

    /// True for faults that delegate to another fault.
    pub fn is_composite(&self) -> bool {
        matches!(self, Fault::Random(_))
    }

    /// Applies the fault to `cluster`, drawing any random choice from `rng`.
    ///
    /// The returned [`Injection`] names the leaf fault that actually ran.
    pub fn apply<'a>(
        &'a self,
        ctx: &'a FaultContext,
        cluster: &'a dyn Cluster,
        rng: &'a mut StdRng,
    ) -> BoxFuture<'a, Result<Injection>> {
        match self {
            Fault::Kill(f) => f.apply(ctx, cluster, rng).boxed(),
            Fault::Panic(f) => f.apply(ctx, cluster, rng).boxed(),
            Fault::Blackhole(f) => f.apply(ctx, cluster, rng).boxed(),
            Fault::Delay(f) => f.apply(ctx, cluster, rng).boxed(),
            Fault::Random(f) => f.apply(ctx, cluster, rng).boxed(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ProcessKill> for Fault {
    fn from(fault: ProcessKill) -> Self {
        Fault::Kill(fault)
    }
}

impl From<InducedPanic> for Fault {
    fn from(fault: InducedPanic) -> Self {
        Fault::Panic(fault)
    }
}

impl From<PeerBlackhole> for Fault {
    fn from(fault: PeerBlackhole) -> Self {
        Fault::Blackhole(fault)
    }
}

impl From<PeerDelay> for Fault {
    fn from(fault: PeerDelay) -> Self {
        Fault::Delay(fault)
    }
}

impl From<RandomFault> for Fault {
    fn from(fault: RandomFault) -> Self {
        Fault::Random(fault)
    }
}
