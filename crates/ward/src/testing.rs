//! In-memory transport for tests.
//!
//! [`RecordingTransport`] keeps a set of live objects, records every call in
//! order and can be scripted to fail the next create/remove or to answer a
//! command with a fixed value.
//!
//! ```rust,ignore
//! let transport = Arc::new(RecordingTransport::new());
//! with_ephemeral_resource(Arc::clone(&transport), &EphemeralSpec::new(), |_id| async {
//!     Ok::<_, Error>(())
//! })
//! .await?;
//! assert_eq!(transport.removals().len(), 1);
//! ```

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::{EphemeralSpec, Params, Transport};

/// One recorded transport call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// `request(command, params)`.
    Request {
        /// Command name.
        command: String,
        /// Parameters as sent.
        params: Params,
    },
    /// `create_ephemeral_resource(spec)`.
    Create(EphemeralSpec),
    /// `remove_resource(id, force)`.
    Remove {
        /// Removed identifier.
        id: String,
        /// Whether removal was forced.
        force: bool,
    },
}

/// A [`Transport`] that records calls and simulates object lifetimes.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    live: Mutex<BTreeSet<String>>,
    responses: Mutex<HashMap<String, Value>>,
    create_failures: Mutex<VecDeque<TransportError>>,
    remove_failures: Mutex<VecDeque<TransportError>>,
    remove_stalls: Mutex<usize>,
    request_failures: Mutex<HashMap<String, TransportError>>,
    next_id: AtomicU64,
}

/// Lock a mutex, ignoring poisoning: a panicking test must not hide the
/// calls recorded before it panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `value` from now on.
    pub fn respond(&self, command: impl Into<String>, value: Value) {
        lock(&self.responses).insert(command.into(), value);
    }

    /// Fail every `command` request with `err` from now on.
    pub fn fail_request(&self, command: impl Into<String>, err: TransportError) {
        lock(&self.request_failures).insert(command.into(), err);
    }

    /// Fail the next create call.
    pub fn fail_next_create(&self, err: TransportError) {
        lock(&self.create_failures).push_back(err);
    }

    /// Fail the next remove call. The object is left in place.
    pub fn fail_next_remove(&self, err: TransportError) {
        lock(&self.remove_failures).push_back(err);
    }

    /// Make the next remove call hang forever after it is recorded.
    pub fn stall_next_remove(&self) {
        *lock(&self.remove_stalls) += 1;
    }

    /// Pretend an object already exists.
    pub fn insert(&self, id: impl Into<String>) {
        lock(&self.live).insert(id.into());
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// `(command, params)` of every request so far.
    pub fn requests(&self) -> Vec<(String, Params)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                Call::Request { command, params } => Some((command.clone(), params.clone())),
                _ => None,
            })
            .collect()
    }

    /// `(id, force)` of every remove call so far.
    pub fn removals(&self) -> Vec<(String, bool)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                Call::Remove { id, force } => Some((id.clone(), *force)),
                _ => None,
            })
            .collect()
    }

    /// Returns true if the object currently exists.
    pub fn exists(&self, id: &str) -> bool {
        lock(&self.live).contains(id)
    }

    /// Number of objects that currently exist.
    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

/// Deliver SIGINT to the current process, as a user pressing Ctrl-C would.
///
/// The tokio handler for SIGINT is installed first, so the process is not
/// killed. Must be called from within a tokio runtime with signals enabled.
#[cfg(unix)]
pub fn send_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    drop(signal(SignalKind::interrupt())?);
    let status = std::process::Command::new("kill")
        .args(["-INT", &std::process::id().to_string()])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("kill exited with {status}")))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn request(&self, command: &str, params: Params) -> Result<Value, TransportError> {
        self.record(Call::Request {
            command: command.to_string(),
            params,
        });
        if let Some(err) = lock(&self.request_failures).get(command) {
            return Err(err.clone());
        }
        Ok(lock(&self.responses)
            .get(command)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn create_ephemeral_resource(
        &self,
        spec: &EphemeralSpec,
    ) -> Result<String, TransportError> {
        self.record(Call::Create(spec.clone()));
        if let Some(err) = lock(&self.create_failures).pop_front() {
            return Err(err);
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}/{}{:04}",
            spec.location.as_deref().unwrap_or("//tmp"),
            spec.prefix.as_deref().unwrap_or("tmp-"),
            n
        );
        lock(&self.live).insert(id.clone());
        Ok(id)
    }

    async fn remove_resource(&self, id: &str, force: bool) -> Result<(), TransportError> {
        self.record(Call::Remove {
            id: id.to_string(),
            force,
        });
        let stall = {
            let mut stalls = lock(&self.remove_stalls);
            let stall = *stalls > 0;
            *stalls = stalls.saturating_sub(1);
            stall
        };
        if stall {
            std::future::pending::<()>().await;
        }
        if let Some(err) = lock(&self.remove_failures).pop_front() {
            return Err(err);
        }

        let existed = lock(&self.live).remove(id);
        if existed || force {
            Ok(())
        } else {
            Err(TransportError::not_found(id))
        }
    }
}
