//! # Cluster Failpoints - Fault Injection for Replicated Clusters
//!
//! A harness that disrupts one member of a running replicated cluster while
//! client load keeps flowing, then puts the cluster back together. It is meant
//! to run next to a linearizability checker: the checker watches the client
//! history, the harness makes that history interesting.
//!
//! ## Overview
//!
//! - **Faults**: a closed set of failpoints ([`Fault`]) that kill a member,
//!   panic it through a named breakpoint, or degrade its peer link
//! - **Catalog**: every known failpoint, built once from configuration
//!   ([`FaultRegistry`])
//! - **Context**: cancellation and deadlines for every blocking step
//!   ([`FaultContext`])
//! - **Injector**: applies failpoints one at a time from a seeded generator
//!   ([`FailpointInjector`])
//!
//! The harness does not manage processes itself. The test framework hands it
//! a [`Cluster`] whose members implement the [`traits`] contracts.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cluster_failpoints::{FailpointInjector, FaultContext, HarnessConfig};
//!
//! async fn disrupt(cluster: &dyn cluster_failpoints::Cluster) -> cluster_failpoints::Result<()> {
//!     let config = HarnessConfig::from_file("failpoints.toml")?;
//!     cluster_failpoints::logging::init(&config.logging)?;
//!
//!     let injector = FailpointInjector::from_config(&config)?;
//!     let ctx = FaultContext::new();
//!
//!     let injection = injector.inject_random(&ctx, cluster).await?;
//!     println!("{} hit {}", injection.fault_name, injection.member);
//!     Ok(())
//! }
//! ```
//!
//! ## Available Failpoints
//!
//! - `Kill`: terminates a random member and restarts it
//! - Breakpoint panics (`beforeCommit`, `defragBeforeCopy`,
//!   `raftBeforeLeaderSend`, ...): arm a breakpoint with a panic action,
//!   optionally provoke it with a defragmentation or compaction, restart the
//!   member
//! - `blackhole`: drops a random member's peer traffic for a while
//! - `delay`: adds latency to a random member's peer traffic for a while
//! - `Random`: one of the above that every member supports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod context;
pub mod error;
pub mod fault;
pub mod faults;
pub mod injector;
pub mod logging;
pub mod registry;
pub mod target;
pub mod traits;
pub mod trigger;

#[cfg(test)]
mod testing;

// Re-export main types at crate root for convenience
pub use config::{HarnessConfig, LoggingConfig, NetworkConfig, RandomConfig};
pub use context::{FaultContext, FaultContextBuilder, Injection, Interrupted};
pub use error::{
    ClientError, FailpointError, HookError, Phase, ProcessError, Result, TriggerError,
};
pub use fault::Fault;
pub use injector::{FailpointInjector, InjectorStats};
pub use registry::FaultRegistry;
pub use target::Target;
pub use traits::{
    ClientOptions, Cluster, ClusterClient, Member, PeerProxy, Process, RemoteHooks, Revision,
};
pub use trigger::TriggerAction;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::context::{FaultContext, Injection};
    pub use crate::error::Result;
    pub use crate::fault::Fault;
    pub use crate::faults::{InducedPanic, PeerBlackhole, PeerDelay, ProcessKill, RandomFault};
    pub use crate::injector::FailpointInjector;
    pub use crate::registry::FaultRegistry;
    pub use crate::target::Target;
    pub use crate::traits::{Cluster, Member};
    pub use crate::trigger::TriggerAction;
}
