//! Signal kinds and error classification.
//!
//! An interruption is modelled as an error value. [`InterruptGuard`] decides
//! what to do with an error by asking it for its [`SignalKind`]; anything
//! that is not a signal, or is a signal the guard was not configured for,
//! passes through untouched.
//!
//! [`InterruptGuard`]: crate::guard::InterruptGuard

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A kind of interruption a guard can be configured to intercept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// User interrupt (Ctrl-C / SIGINT).
    Interrupt,
    /// Termination request (SIGTERM).
    Terminate,
    /// Cooperative cancellation requested by the caller.
    Cancelled,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Interrupt => "interrupt",
            SignalKind::Terminate => "terminate",
            SignalKind::Cancelled => "cancellation",
        };
        f.write_str(name)
    }
}

/// Classifies an error as a signal.
pub trait Signal {
    /// The signal kind this error represents, or `None` for ordinary errors.
    fn signal_kind(&self) -> Option<SignalKind>;
}

/// Run `fut`, turning a Ctrl-C delivered while it is pending into
/// [`Error::Interrupted`].
///
/// The inner future is dropped when the interrupt wins. Wrap the work done
/// inside a scope, never the scope itself: a dropped
/// [`EphemeralScope`](crate::EphemeralScope) only schedules its removal, and
/// the error would reach the caller first.
/// [`with_interruptible_resource`](crate::with_interruptible_resource) does
/// this wrapping.
pub async fn interruptible<T, F>(fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // No handler means no interrupt can ever arrive.
            tracing::warn!(error = %e, "failed to listen for interrupts");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = fut => result,
        () = interrupt => {
            tracing::debug!("interrupt received while waiting");
            Err(Error::Interrupted(SignalKind::Interrupt))
        }
    }
}
