//! Ephemeral remote objects bound to a scope.
//!
//! [`with_ephemeral_resource`] creates an object, hands its identifier to a
//! body and removes the object when the body finishes, however it finishes:
//!
//! | body outcome            | removal    | returned                                  |
//! |-------------------------|------------|-------------------------------------------|
//! | `Ok(v)`                 | ok         | `Ok(v)`                                   |
//! | `Ok(v)`                 | fails      | the removal error                         |
//! | `Err(e)`                | either     | `Err(e)` (a removal failure is logged)    |
//! | panic                   | either     | the panic resumes after removal           |
//! | future dropped mid-body | spawned    | n/a                                       |
//!
//! Removal is requested exactly once per created object. If creation fails
//! the body never runs.
//!
//! Dropping the scope future only schedules the removal, so a process that
//! exits right after may leak the object. Use [`with_interruptible_resource`]
//! to turn Ctrl-C into a body error instead: the removal is then awaited
//! before [`Error::Interrupted`] reaches the caller.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::{Error, TransportError};
use crate::signal::interruptible;
use crate::transport::{EphemeralSpec, Transport};

/// RAII handle for one ephemeral object.
///
/// Call [`release`](Self::release) to remove the object and observe the
/// result. If the handle is dropped instead (for example because the task
/// owning it was cancelled), the removal is spawned onto the current tokio
/// runtime.
pub struct EphemeralScope<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    id: String,
    force: bool,
    /// Cleared once a removal has completed or been handed to the runtime.
    armed: bool,
}

impl<T: Transport + ?Sized + 'static> fmt::Debug for EphemeralScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralScope")
            .field("id", &self.id)
            .field("force", &self.force)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized + 'static> EphemeralScope<T> {
    /// Create the object described by `spec`.
    pub async fn create(transport: Arc<T>, spec: &EphemeralSpec) -> Result<Self, TransportError> {
        let id = transport.create_ephemeral_resource(spec).await?;
        tracing::debug!(resource = %id, "created ephemeral resource");
        Ok(Self {
            transport,
            id,
            force: spec.force,
            armed: true,
        })
    }

    /// Identifier of the object. Only meaningful while the scope is alive.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the object now.
    ///
    /// If this future is dropped before the removal finishes, the scope is
    /// still armed and its drop handler retries the removal.
    pub async fn release(mut self) -> Result<(), TransportError> {
        let result = self.transport.remove_resource(&self.id, self.force).await;
        self.armed = false;
        match &result {
            Ok(()) => tracing::debug!(resource = %self.id, "removed ephemeral resource"),
            Err(e) => tracing::warn!(
                resource = %self.id,
                error = %e,
                "failed to remove ephemeral resource"
            ),
        }
        result
    }
}

impl<T: Transport + ?Sized + 'static> Drop for EphemeralScope<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(resource = %id, "scope dropped, removing in background");
                let transport = Arc::clone(&self.transport);
                let force = self.force;
                handle.spawn(async move {
                    if let Err(e) = transport.remove_resource(&id, force).await {
                        tracing::warn!(
                            resource = %id,
                            error = %e,
                            "background removal of ephemeral resource failed"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    resource = %id,
                    "scope dropped outside a tokio runtime, ephemeral resource leaked"
                );
            }
        }
    }
}

/// Run `body` with a freshly created ephemeral object, removing it afterwards.
///
/// See the [module docs](self) for which error wins when both the body and
/// the removal fail.
pub async fn with_ephemeral_resource<T, F, Fut, R, E>(
    transport: Arc<T>,
    spec: &EphemeralSpec,
    body: F,
) -> Result<R, E>
where
    T: Transport + ?Sized + 'static,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: From<TransportError>,
{
    let scope = EphemeralScope::create(transport, spec).await?;
    let id = scope.id().to_string();

    // The call itself happens inside the future so a panic while building
    // the body future is caught too.
    let outcome = AssertUnwindSafe(async move { body(id).await })
        .catch_unwind()
        .await;
    let removal = scope.release().await;

    match outcome {
        Ok(Ok(value)) => {
            removal?;
            Ok(value)
        }
        // Removal failure was already logged by `release`.
        Ok(Err(err)) => Err(err),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Like [`with_ephemeral_resource`], but a Ctrl-C delivered while `body` is
/// pending ends the body with [`Error::Interrupted`].
///
/// Only the body races the interrupt, so the object is removed before the
/// error is returned.
pub async fn with_interruptible_resource<T, F, Fut, R>(
    transport: Arc<T>,
    spec: &EphemeralSpec,
    body: F,
) -> Result<R, Error>
where
    T: Transport + ?Sized + 'static,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<R, Error>>,
{
    with_ephemeral_resource(transport, spec, |id| interruptible(body(id))).await
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ValidationError;
    use crate::signal::SignalKind;
    use crate::testing::{Call, RecordingTransport};

    fn spec() -> EphemeralSpec {
        EphemeralSpec::new().location("//tmp").prefix("scope-")
    }

    #[tokio::test]
    async fn test_removed_after_normal_exit() {
        let transport = Arc::new(RecordingTransport::new());

        let seen = with_ephemeral_resource(Arc::clone(&transport), &spec(), |id| {
            let transport = Arc::clone(&transport);
            async move {
                assert!(transport.exists(&id));
                Ok::<_, Error>(id)
            }
        })
        .await
        .unwrap();

        assert!(seen.starts_with("//tmp/scope-"));
        assert!(!transport.exists(&seen));
        assert_eq!(transport.removals(), vec![(seen, true)]);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_removed_before_body_error_propagates() {
        let transport = Arc::new(RecordingTransport::new());

        let result: Result<(), Error> =
            with_ephemeral_resource(Arc::clone(&transport), &spec(), |_id| async {
                Err(Error::Validation(ValidationError::EmptyPermissions))
            })
            .await;

        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::EmptyPermissions))
        ));
        assert_eq!(transport.removals().len(), 1);
        assert_eq!(transport.live_count(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_skips_body_and_removal() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_next_create(TransportError::new("no quota"));

        let mut ran = false;
        let result: Result<(), Error> =
            with_ephemeral_resource(Arc::clone(&transport), &spec(), |_id| {
                ran = true;
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(Error::Transport(ref e)) if e.message == "no quota"));
        assert!(!ran);
        assert!(transport.removals().is_empty());
    }

    #[tokio::test]
    async fn test_removal_error_surfaces_after_success() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_next_remove(TransportError::new("master unavailable"));

        let result: Result<u8, Error> =
            with_ephemeral_resource(Arc::clone(&transport), &spec(), |_id| async { Ok(1) }).await;

        assert!(matches!(result, Err(Error::Transport(ref e)) if e.message == "master unavailable"));
        assert_eq!(transport.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_body_error_wins_over_removal_error() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_next_remove(TransportError::new("master unavailable"));

        let result: Result<(), Error> =
            with_ephemeral_resource(Arc::clone(&transport), &spec(), |_id| async {
                Err(Error::Interrupted(SignalKind::Interrupt))
            })
            .await;

        assert!(matches!(result, Err(Error::Interrupted(_))));
        assert_eq!(transport.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_removed_when_body_panics() {
        let transport = Arc::new(RecordingTransport::new());
        let spec = spec();

        let scoped = with_ephemeral_resource(Arc::clone(&transport), &spec, |_id| async {
            if true {
                panic!("body blew up");
            }
            Ok::<(), Error>(())
        });
        let result = AssertUnwindSafe(scoped).catch_unwind().await;

        assert!(result.is_err());
        assert_eq!(transport.removals().len(), 1);
        assert_eq!(transport.live_count(), 0);
    }

    #[tokio::test]
    async fn test_removal_uses_configured_force() {
        let transport = Arc::new(RecordingTransport::new());

        with_ephemeral_resource(Arc::clone(&transport), &spec().force(false), |_id| async {
            Ok::<_, Error>(())
        })
        .await
        .unwrap();

        let removals = transport.removals();
        assert_eq!(removals.len(), 1);
        assert!(!removals[0].1);
    }

    #[tokio::test]
    async fn test_cancelled_scope_still_removes() {
        let transport = Arc::new(RecordingTransport::new());
        let spec = spec();

        let scoped = with_ephemeral_resource(Arc::clone(&transport), &spec, |_id| {
            std::future::pending::<Result<(), Error>>()
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(20), scoped).await;
        assert!(timed_out.is_err());

        for _ in 0..10 {
            if !transport.removals().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.removals().len(), 1);
        assert_eq!(transport.live_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_scope_release() {
        let transport = Arc::new(RecordingTransport::new());
        let scope = EphemeralScope::create(Arc::clone(&transport), &spec())
            .await
            .unwrap();
        let id = scope.id().to_string();
        assert!(transport.exists(&id));

        scope.release().await.unwrap();
        assert!(!transport.exists(&id));
        assert_eq!(transport.removals().len(), 1);
        assert!(matches!(transport.calls().last(), Some(Call::Remove { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_release_is_retried_on_drop() {
        let transport = Arc::new(RecordingTransport::new());
        let scope = EphemeralScope::create(Arc::clone(&transport), &spec())
            .await
            .unwrap();
        let id = scope.id().to_string();
        transport.stall_next_remove();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), scope.release()).await;
        assert!(timed_out.is_err());

        for _ in 0..10 {
            if transport.removals().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.removals(), vec![(id.clone(), true), (id.clone(), true)]);
        assert!(!transport.exists(&id));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupted_body_is_removed_before_returning() {
        let transport = Arc::new(RecordingTransport::new());
        let spec = spec();

        let result: Result<(), Error> =
            with_interruptible_resource(Arc::clone(&transport), &spec, |_id| async {
                crate::testing::send_interrupt().unwrap();
                std::future::pending::<Result<(), Error>>().await
            })
            .await;

        // Checked before yielding: nothing was left to a background task.
        assert!(matches!(
            result,
            Err(Error::Interrupted(SignalKind::Interrupt))
        ));
        assert_eq!(transport.removals().len(), 1);
        assert_eq!(transport.live_count(), 0);
    }

    #[tokio::test]
    async fn test_interruptible_resource_passes_through_completion() {
        let transport = Arc::new(RecordingTransport::new());

        let id = with_interruptible_resource(Arc::clone(&transport), &spec(), |id| async move {
            Ok(id)
        })
        .await
        .unwrap();

        assert_eq!(transport.removals(), vec![(id, true)]);
    }

    #[test]
    fn test_drop_outside_runtime_does_not_panic() {
        let transport = Arc::new(RecordingTransport::new());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let scope = runtime
            .block_on(EphemeralScope::create(Arc::clone(&transport), &spec()))
            .unwrap();
        drop(runtime);

        drop(scope);
        assert!(transport.removals().is_empty());
    }
}
