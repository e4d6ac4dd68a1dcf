//! Composite failpoint that picks one of its candidates at random.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::context::{FaultContext, Injection};
use crate::error::{FailpointError, Result};
use crate::fault::Fault;
use crate::traits::{Cluster, Member};

/// Failpoint that applies one candidate supported by every member.
///
/// The qualifying set is computed at apply time, in candidate order, so the
/// choice is reproducible for a fixed RNG seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomFault {
    candidates: Vec<Fault>,
}

impl RandomFault {
    /// Name reported for this failpoint.
    pub const NAME: &'static str = "Random";

    /// Creates a composite over `candidates`.
    pub fn new(candidates: Vec<Fault>) -> Self {
        Self { candidates }
    }

    /// Returns the failpoint name.
    pub fn name(&self) -> &str {
        Self::NAME
    }

    /// Returns all candidates, qualifying or not.
    pub fn candidates(&self) -> &[Fault] {
        &self.candidates
    }

    /// Always true. Whether anything qualifies is only known at apply time.
    pub fn available(&self, _member: &dyn Member) -> bool {
        true
    }

    /// Candidates available on every member of `cluster`.
    pub fn qualifying(&self, cluster: &dyn Cluster) -> Vec<&Fault> {
        let members = cluster.members();
        self.candidates
            .iter()
            .filter(|fault| members.iter().all(|m| fault.available(m.as_ref())))
            .collect()
    }

    /// Picks one qualifying candidate.
    pub fn choose(&self, cluster: &dyn Cluster, rng: &mut StdRng) -> Result<&Fault> {
        let qualifying = self.qualifying(cluster);
        debug!(
            candidates = self.candidates.len(),
            qualifying = qualifying.len(),
            "Filtered failpoint candidates"
        );

        qualifying
            .choose(rng)
            .copied()
            .ok_or(FailpointError::NoEligibleFault {
                candidates: self.candidates.len(),
            })
    }

    /// Applies a randomly chosen qualifying candidate.
    pub async fn apply(
        &self,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
        rng: &mut StdRng,
    ) -> Result<Injection> {
        let chosen = self.choose(cluster, rng)?;
        info!(fault = chosen.name(), "Triggering failpoint");
        chosen.apply(ctx, cluster, rng).await
    }
}
