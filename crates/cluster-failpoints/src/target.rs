//! Target resolution: which member a failpoint disrupts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FailpointError, Result};
use crate::traits::{Cluster, Member};

/// Which member of the cluster a failpoint should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// A uniformly random member.
    AnyMember,
    /// Whichever member is currently the leader.
    Leader,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::AnyMember => write!(f, "AnyMember"),
            Target::Leader => write!(f, "Leader"),
        }
    }
}

impl Target {
    /// Resolves this target to a member of `cluster`.
    ///
    /// `Leader` waits at most `leader_timeout` for an election result.
    pub async fn resolve<R: Rng + ?Sized>(
        self,
        cluster: &dyn Cluster,
        rng: &mut R,
        leader_timeout: Duration,
    ) -> Result<Arc<dyn Member>> {
        let members = cluster.members();
        if members.is_empty() {
            return Err(FailpointError::EmptyCluster);
        }

        let index = match self {
            Target::AnyMember => rng.gen_range(0..members.len()),
            Target::Leader => {
                let leader = cluster
                    .wait_leader(leader_timeout)
                    .await
                    .ok_or(FailpointError::NoLeader {
                        timeout: leader_timeout,
                    })?;
                if leader >= members.len() {
                    return Err(FailpointError::InvalidConfiguration(format!(
                        "leader index {leader} out of range for {} members",
                        members.len()
                    )));
                }
                leader
            }
        };

        let member = Arc::clone(&members[index]);
        debug!(target_kind = %self, member = member.name(), "Resolved failpoint target");
        Ok(member)
    }
}

/// Picks a uniformly random member, as network and kill failpoints do.
pub(crate) fn random_member<R: Rng + ?Sized>(
    cluster: &dyn Cluster,
    rng: &mut R,
) -> Result<Arc<dyn Member>> {
    let members = cluster.members();
    if members.is_empty() {
        return Err(FailpointError::EmptyCluster);
    }
    Ok(Arc::clone(&members[rng.gen_range(0..members.len())]))
}
