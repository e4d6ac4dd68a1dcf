//! Serialized, reproducible failpoint injection.
//!
//! The injector owns the failpoint catalog and the seeded random number
//! generator every selection draws from. Failpoints are applied one at a
//! time: concurrent callers queue on the generator lock.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};

use crate::config::HarnessConfig;
use crate::context::{FaultContext, Injection};
use crate::error::Result;
use crate::fault::Fault;
use crate::registry::FaultRegistry;
use crate::traits::Cluster;

/// Counters of applied failpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectorStats {
    /// Failpoints applied and reverted successfully.
    pub succeeded: u64,
    /// Failpoints that returned an error.
    pub failed: u64,
}

/// Applies failpoints from a catalog against a cluster.
pub struct FailpointInjector {
    /// Known failpoints.
    registry: FaultRegistry,
    /// Source of every random choice.
    rng: Mutex<StdRng>,
    /// Seed the generator started from.
    seed: u64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl FailpointInjector {
    /// Creates an injector over `registry`.
    ///
    /// Without a seed one is drawn from entropy. Either way the seed is
    /// logged so a failing run can be replayed.
    pub fn new(registry: FaultRegistry, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
        info!(seed, failpoints = registry.len(), "Failpoint injector ready");

        Self {
            registry,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            seed,
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Validates `config` and builds the catalog and injector from it.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        let registry = FaultRegistry::from_config(config)?;
        Ok(Self::new(registry, config.seed))
    }

    /// The seed the generator started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The failpoint catalog.
    pub fn registry(&self) -> &FaultRegistry {
        &self.registry
    }

    /// Success and failure counts so far.
    pub fn stats(&self) -> InjectorStats {
        InjectorStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Applies `fault` to `cluster`, waiting for any in-flight failpoint to
    /// finish first.
    pub async fn inject(
        &self,
        fault: &Fault,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
    ) -> Result<Injection> {
        let mut rng = self.rng.lock().await;
        let span = info_span!(
            "failpoint",
            fault = fault.name(),
            session_id = %ctx.session_id
        );

        let result = fault.apply(ctx, cluster, &mut *rng).instrument(span).await;

        match &result {
            Ok(injection) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                info!(
                    fault = %injection.fault_name,
                    member = %injection.member,
                    elapsed = ?injection.elapsed,
                    "Failpoint applied"
                );
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(fault = fault.name(), error = %e, "Failpoint failed");
            }
        }

        result
    }

    /// Applies the failpoint registered as `name`.
    pub async fn inject_by_name(
        &self,
        name: &str,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
    ) -> Result<Injection> {
        let fault = self.registry.get(name)?;
        self.inject(fault, ctx, cluster).await
    }

    /// Applies one random failpoint that every member supports.
    pub async fn inject_random(
        &self,
        ctx: &FaultContext,
        cluster: &dyn Cluster,
    ) -> Result<Injection> {
        self.inject(self.registry.random(), ctx, cluster).await
    }
}

impl std::fmt::Debug for FailpointInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailpointInjector")
            .field("seed", &self.seed)
            .field("failpoints", &self.registry.len())
            .field("stats", &self.stats())
            .finish()
    }
}
