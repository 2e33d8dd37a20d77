//! Interrupt guard: run compensation when a protected block is interrupted.
//!
//! When the protected block fails with a matched signal, the guard runs the
//! compensating action (typically: cancel the remote operation the block
//! started). The action itself may be interrupted again, e.g. by an impatient
//! user pressing Ctrl-C repeatedly; the guard retries it up to
//! `retry_limit` more times.
//!
//! The outcome is asymmetric:
//!
//! - compensation eventually succeeds: the *original* signal is returned;
//! - compensation keeps being interrupted past the limit: the signal from the
//!   last attempt is returned and the original is dropped.
//!
//! Errors that are not matched signals are never retried and never replaced.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut guard = InterruptGuard::keyboard(|| abort_operation(&client, &op_id));
//! guard.run(|| wait_for_operation(&client, &op_id))?;
//! ```

use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::signal::{Signal, SignalKind};

/// Retry limit used when none is configured.
pub const DEFAULT_RETRY_LIMIT: u32 = 10;

/// Configuration of an [`InterruptGuard`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardPolicy {
    /// Signal kinds the guard intercepts.
    pub kinds: Vec<SignalKind>,
    /// When false the guard is a transparent pass-through.
    pub enabled: bool,
    /// How many interrupted compensation attempts are tolerated before
    /// giving up.
    pub retry_limit: u32,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            kinds: vec![SignalKind::Interrupt],
            enabled: true,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

impl GuardPolicy {
    /// Create the default policy: intercept interrupts, retry up to
    /// [`DEFAULT_RETRY_LIMIT`] times.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that intercepts nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Replace the intercepted signal kinds.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = SignalKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Enable or disable the guard.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the retry limit.
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Returns true if `err` is a signal this policy intercepts.
    pub fn matches<E: Signal>(&self, err: &E) -> bool {
        err.signal_kind()
            .is_some_and(|kind| self.kinds.contains(&kind))
    }
}

/// Bookkeeping for one compensation phase.
struct Compensation<'a, E> {
    policy: &'a GuardPolicy,
    /// The signal that started compensation; returned if compensation
    /// succeeds.
    trigger: E,
    /// Interrupted attempts so far.
    failures: u32,
}

impl<'a, E: Signal> Compensation<'a, E> {
    fn new(policy: &'a GuardPolicy, trigger: E) -> Self {
        tracing::debug!(
            signal = ?trigger.signal_kind(),
            retry_limit = policy.retry_limit,
            "protected block interrupted, compensating"
        );
        Self {
            policy,
            trigger,
            failures: 0,
        }
    }

    /// Feed the outcome of one compensation attempt. `Continue` means try
    /// again, `Break` carries the error to hand back to the caller.
    fn settle(mut self, outcome: Result<(), E>) -> ControlFlow<E, Self> {
        match outcome {
            Ok(()) => ControlFlow::Break(self.trigger),
            Err(err) if self.policy.matches(&err) => {
                self.failures += 1;
                if self.failures <= self.policy.retry_limit {
                    tracing::debug!(
                        attempt = self.failures,
                        "compensating action interrupted, retrying"
                    );
                    ControlFlow::Continue(self)
                } else {
                    tracing::warn!(
                        attempts = self.failures,
                        "compensating action interrupted too many times, giving up"
                    );
                    ControlFlow::Break(err)
                }
            }
            Err(err) => ControlFlow::Break(err),
        }
    }
}

/// Runs a protected block and compensates when it is interrupted.
///
/// `C` is the compensating action: a closure returning `Result<(), E>` for
/// [`run`](Self::run), or a closure returning such a future for
/// [`run_async`](Self::run_async).
pub struct InterruptGuard<C> {
    policy: GuardPolicy,
    action: C,
}

impl<C> fmt::Debug for InterruptGuard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<C> InterruptGuard<C> {
    /// Create a guard with an explicit policy.
    pub fn new(policy: GuardPolicy, action: C) -> Self {
        Self { policy, action }
    }

    /// Create a guard that compensates only for user interrupts.
    pub fn keyboard(action: C) -> Self {
        Self::new(
            GuardPolicy::default().with_kinds([SignalKind::Interrupt]),
            action,
        )
    }

    /// The guard's policy.
    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Run `block` under the guard.
    pub fn run<T, E, B>(&mut self, block: B) -> Result<T, E>
    where
        B: FnOnce() -> Result<T, E>,
        C: FnMut() -> Result<(), E>,
        E: Signal,
    {
        if !self.policy.enabled {
            return block();
        }

        let trigger = match block() {
            Err(err) if self.policy.matches(&err) => err,
            other => return other,
        };

        let mut pending = Compensation::new(&self.policy, trigger);
        loop {
            let outcome = (self.action)();
            pending = match pending.settle(outcome) {
                ControlFlow::Continue(next) => next,
                ControlFlow::Break(err) => return Err(err),
            };
        }
    }

    /// Await `block` under the guard, with an async compensating action.
    pub async fn run_async<T, E, B, F>(&mut self, block: B) -> Result<T, E>
    where
        B: Future<Output = Result<T, E>>,
        C: FnMut() -> F,
        F: Future<Output = Result<(), E>>,
        E: Signal,
    {
        if !self.policy.enabled {
            return block.await;
        }

        let trigger = match block.await {
            Err(err) if self.policy.matches(&err) => err,
            other => return other,
        };

        let mut pending = Compensation::new(&self.policy, trigger);
        loop {
            let outcome = (self.action)().await;
            pending = match pending.settle(outcome) {
                ControlFlow::Continue(next) => next,
                ControlFlow::Break(err) => return Err(err),
            };
        }
    }
}

/// Run `block` once under a throwaway guard.
pub fn run<T, E, B, C>(
    enabled: bool,
    kinds: impl IntoIterator<Item = SignalKind>,
    action: C,
    retry_limit: u32,
    block: B,
) -> Result<T, E>
where
    B: FnOnce() -> Result<T, E>,
    C: FnMut() -> Result<(), E>,
    E: Signal,
{
    let policy = GuardPolicy::new()
        .with_kinds(kinds)
        .with_enabled(enabled)
        .with_retry_limit(retry_limit);
    InterruptGuard::new(policy, action).run(block)
}
