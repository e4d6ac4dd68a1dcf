//! Trigger actions that drive a member into an armed breakpoint.
//!
//! Some breakpoints sit on code paths that ordinary client load rarely
//! reaches (defragmentation, compaction). After arming one of those, the
//! induced-panic failpoint calls the matching trigger so the breakpoint is
//! hit within the trigger window.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::FaultContext;
use crate::error::TriggerError;
use crate::traits::{ClientOptions, Member};

/// Key read by the compaction trigger to learn the current revision.
const REVISION_KEY: &str = "/";

/// Side action used to provoke an armed breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerAction {
    /// Forces a backend defragmentation on the member.
    Defragment,
    /// Compacts the key-value history at the member's current revision.
    Compact,
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerAction::Defragment => write!(f, "defragment"),
            TriggerAction::Compact => write!(f, "compact"),
        }
    }
}

impl TriggerAction {
    /// Runs the action against `member` under `ctx`.
    ///
    /// The member dropping the connection mid-call is the armed breakpoint
    /// firing, so it is reported as success.
    pub async fn fire(
        self,
        ctx: &FaultContext,
        member: &dyn Member,
    ) -> std::result::Result<(), TriggerError> {
        let client = ctx.run(member.connect(ClientOptions::default())).await??;

        let outcome = match self {
            TriggerAction::Defragment => {
                let endpoint = member
                    .endpoints()
                    .into_iter()
                    .next()
                    .ok_or_else(|| TriggerError::NoEndpoint(member.name().to_string()))?;
                ctx.run(client.defragment(&endpoint)).await?
            }
            TriggerAction::Compact => {
                let revision = ctx.run(client.get(REVISION_KEY)).await??;
                ctx.run(client.compact(revision)).await?
            }
        };

        match outcome {
            Err(e) if e.is_connection_closed() => {
                debug!(action = %self, member = member.name(), "Member closed the connection");
                Ok(())
            }
            other => other.map_err(TriggerError::from),
        }
    }
}
