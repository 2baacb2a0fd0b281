//! Cancellation for calibration phases.
//!
//! The Ctrl+C handler holds an [`AbortHandle`]; the sampler and the operator
//! prompt hold an [`AbortSignal`] and consult it between samples and while
//! waiting for the operator.

use tokio::sync::watch;

use crate::error::{JoystickError, Result};

/// Creates a connected handle/signal pair.
///
/// # Examples
///
/// ```
/// use joystick_cal::calibration::abort::abort_pair;
///
/// let (handle, signal) = abort_pair();
/// assert!(!signal.is_aborted());
/// handle.abort();
/// assert!(signal.is_aborted());
/// ```
#[must_use]
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Raises the abort.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests that the running calibration stop.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Creates another signal observing this handle.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes the abort.
///
/// If every [`AbortHandle`] is dropped without aborting, the signal never
/// fires.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Returns `true` once an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns `OperatorAbort` if an abort has been requested.
    ///
    /// # Errors
    ///
    /// `OperatorAbort` after [`AbortHandle::abort`] was called.
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(JoystickError::OperatorAbort)
        } else {
            Ok(())
        }
    }

    /// Completes once an abort has been requested.
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            // All handles dropped: nobody can abort any more.
            std::future::pending::<()>().await;
        }
    }
}
