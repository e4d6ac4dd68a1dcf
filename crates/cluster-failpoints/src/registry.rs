//! The failpoint catalog.
//!
//! Built once from a [`HarnessConfig`] and then shared read-only. Holds every
//! known failpoint, split into the stable set used by the random failpoint
//! and an experimental set whose breakpoints cannot yet be hit reliably.

use std::collections::HashMap;

use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::{FailpointError, Result};
use crate::fault::Fault;
use crate::faults::{InducedPanic, PeerBlackhole, PeerDelay, ProcessKill, RandomFault};
use crate::target::Target;
use crate::trigger::TriggerAction;

/// Breakpoints that panic whichever member serves the next write.
pub const ANY_MEMBER_BREAKPOINTS: &[&str] = &[
    "beforeCommit",
    "afterCommit",
    "raftBeforeSave",
    "raftAfterSave",
    "commitBeforePreCommitHook",
    "commitAfterPreCommitHook",
    "beforeStartDBTxn",
    "afterStartDBTxn",
    "beforeWritebackBuf",
    "afterWritebackBuf",
];

/// Breakpoints reached by a defragmentation.
pub const DEFRAG_BREAKPOINTS: &[&str] = &["defragBeforeCopy", "defragBeforeRename"];

/// Breakpoints reached by a compaction.
pub const COMPACT_BREAKPOINTS: &[&str] = &[
    "compactBeforeCommitScheduledCompact",
    "compactAfterCommitScheduledCompact",
    "compactBeforeSetFinishedCompact",
    "compactAfterSetFinishedCompact",
    "compactBeforeCommitBatch",
    "compactAfterCommitBatch",
];

/// Breakpoints only reached by the leader.
pub const LEADER_BREAKPOINTS: &[&str] = &["raftBeforeLeaderSend"];

/// Breakpoints that are registered but never chosen at random.
pub const EXPERIMENTAL_BREAKPOINTS: &[&str] = &[
    "raftBeforeApplySnap",
    "raftAfterApplySnap",
    "raftAfterWALRelease",
    "raftBeforeFollowerSend",
    "raftBeforeSaveSnap",
    "raftAfterSaveSnap",
];

/// Catalog of named failpoints.
#[derive(Debug, Clone)]
pub struct FaultRegistry {
    stable: Vec<Fault>,
    experimental: Vec<Fault>,
    index: HashMap<String, usize>,
    random: Fault,
}

impl FaultRegistry {
    /// Builds the catalog with default settings.
    pub fn new() -> Self {
        // The default configuration selects no subset, which cannot fail.
        Self::build(&HarnessConfig::default(), None)
    }

    /// Builds the catalog from `config`.
    ///
    /// Fails if `random.include` names a failpoint the catalog does not
    /// have.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let include = &config.random.include;
        let registry = Self::build(config, None);
        if include.is_empty() {
            return Ok(registry);
        }

        let mut subset = Vec::with_capacity(include.len());
        for name in include {
            let fault = registry
                .lookup(name)
                .filter(|f| !f.is_composite())
                .ok_or_else(|| {
                    FailpointError::InvalidConfiguration(format!(
                        "random.include names unknown failpoint {name}"
                    ))
                })?;
            subset.push(fault.clone());
        }

        Ok(Self::build(config, Some(subset)))
    }

    fn build(config: &HarnessConfig, random_subset: Option<Vec<Fault>>) -> Self {
        let induced = |name: &str| {
            InducedPanic::new(name)
                .trigger_timeout(config.trigger_timeout())
                .leader_timeout(config.leader_timeout())
        };

        let mut stable = vec![Fault::from(
            ProcessKill::new().trigger_timeout(config.trigger_timeout()),
        )];
        stable.extend(ANY_MEMBER_BREAKPOINTS.iter().map(|&n| Fault::from(induced(n))));
        stable.extend(
            DEFRAG_BREAKPOINTS
                .iter()
                .map(|&n| Fault::from(induced(n).with_trigger(TriggerAction::Defragment))),
        );
        stable.extend(
            COMPACT_BREAKPOINTS
                .iter()
                .map(|&n| Fault::from(induced(n).with_trigger(TriggerAction::Compact))),
        );
        stable.extend(
            LEADER_BREAKPOINTS
                .iter()
                .map(|&n| Fault::from(induced(n).target(Target::Leader))),
        );
        stable.push(PeerBlackhole::new().duration(config.network.duration()).into());
        stable.push(
            PeerDelay::new()
                .duration(config.network.duration())
                .base_latency(config.network.base_latency())
                .randomized_latency(config.network.randomized_latency())
                .into(),
        );

        let experimental: Vec<Fault> = EXPERIMENTAL_BREAKPOINTS
            .iter()
            .map(|&n| Fault::from(induced(n)))
            .collect();

        let index = stable
            .iter()
            .chain(experimental.iter())
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();

        let candidates = random_subset.unwrap_or_else(|| stable.clone());
        debug!(
            stable = stable.len(),
            experimental = experimental.len(),
            random_candidates = candidates.len(),
            "Built failpoint catalog"
        );

        Self {
            stable,
            experimental,
            index,
            random: RandomFault::new(candidates).into(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Fault> {
        if name == RandomFault::NAME {
            return Some(&self.random);
        }
        let i = *self.index.get(name)?;
        self.stable
            .get(i)
            .or_else(|| self.experimental.get(i - self.stable.len()))
    }

    /// Looks up a failpoint by name, including `"Random"`.
    pub fn get(&self, name: &str) -> Result<&Fault> {
        self.lookup(name)
            .ok_or_else(|| FailpointError::UnknownFault(name.to_string()))
    }

    /// Names of all registered failpoints, stable ones first.
    pub fn names(&self) -> Vec<&str> {
        self.stable
            .iter()
            .chain(self.experimental.iter())
            .map(Fault::name)
            .chain(std::iter::once(RandomFault::NAME))
            .collect()
    }

    /// The composite that picks among the random candidates.
    pub fn random(&self) -> &Fault {
        &self.random
    }

    /// Failpoints eligible for random selection by default.
    pub fn stable(&self) -> &[Fault] {
        &self.stable
    }

    /// Failpoints that are only applied on request.
    pub fn experimental(&self) -> &[Fault] {
        &self.experimental
    }

    /// Number of registered failpoints, the composite included.
    pub fn len(&self) -> usize {
        self.stable.len() + self.experimental.len() + 1
    }

    /// Always false; the catalog has at least the composite.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for FaultRegistry {
    fn default() -> Self {
        Self::new()
    }
}
