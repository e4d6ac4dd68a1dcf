//! Cancellation context and injection reports.
//!
//! Every blocking step of a failpoint (waiting for a process to exit, arming a
//! breakpoint, sleeping through a network disruption) runs under a
//! [`FaultContext`], which carries a cancellation token and an optional
//! deadline. Child contexts derived with [`FaultContext::with_timeout`] are
//! cancelled together with their parent and never outlive its deadline.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a context-bound wait was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// The context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Context provided to every failpoint application.
#[derive(Debug, Clone)]
pub struct FaultContext {
    /// Identifier of the test session, attached to logs and reports.
    pub session_id: Uuid,

    cancel: CancellationToken,

    deadline: Option<Instant>,

    budget: Option<Duration>,
}

impl Default for FaultContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultContext {
    /// Creates a context with a fresh session, no deadline and its own
    /// cancellation token.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            deadline: None,
            budget: None,
        }
    }

    /// Creates a builder for constructing a fault context.
    pub fn builder() -> FaultContextBuilder {
        FaultContextBuilder::new()
    }

    /// Derives a child context that expires after `timeout`, or at the
    /// parent's deadline if that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let (deadline, budget) = match self.deadline {
            Some(parent) if parent < own => (parent, self.budget),
            _ => (own, Some(timeout)),
        };

        Self {
            session_id: self.session_id,
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
            budget,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The instant this context expires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The timeout that set the deadline, if any.
    ///
    /// For a child cut short by its parent this is the parent's timeout.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Time left until the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Drives `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<F>(&self, fut: F) -> std::result::Result<F::Output, Interrupted>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            () = expiry(self.deadline) => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration`, returning early if the context ends.
    pub async fn sleep(&self, duration: Duration) -> std::result::Result<(), Interrupted> {
        self.run(tokio::time::sleep(duration)).await
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Builder for constructing [`FaultContext`] instances.
#[derive(Debug, Default)]
pub struct FaultContextBuilder {
    session_id: Option<Uuid>,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl FaultContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session ID.
    pub fn session_id(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Ties the context to an externally owned cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sets an overall timeout, measured from `build()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the FaultContext.
    pub fn build(self) -> FaultContext {
        FaultContext {
            session_id: self.session_id.unwrap_or_else(Uuid::new_v4),
            cancel: self.cancel.unwrap_or_default(),
            deadline: self.timeout.map(|t| Instant::now() + t),
            budget: self.timeout,
        }
    }
}

/// Report of a failpoint that was applied and reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// Unique identifier for this injection.
    pub id: Uuid,

    /// Session the injection belonged to.
    pub session_id: Uuid,

    /// Name of the leaf failpoint that actually ran.
    pub fault_name: String,

    /// Name of the member that was disrupted.
    pub member: String,

    /// Time from the start of the disruption until the member was restored.
    pub elapsed: Duration,
}

impl Injection {
    pub(crate) fn new(
        ctx: &FaultContext,
        fault_name: impl Into<String>,
        member: impl Into<String>,
        started: Instant,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: ctx.session_id,
            fault_name: fault_name.into(),
            member: member.into(),
            elapsed: started.elapsed(),
        }
    }
}
