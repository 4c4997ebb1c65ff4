//! Cancellable delayed actions where the newest schedule always wins.

use std::{future::Future, time::Duration};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Runs at most one delayed action at a time.
///
/// Every [`Scheduler::schedule`] call cancels the action issued before it,
/// whether that action is still waiting out its delay or already running.
/// Cancellation drops the action's future at its next await point, so a
/// superseded action never completes.
#[derive(Debug)]
pub struct Scheduler {
    root: CancellationToken,
    current: Mutex<Option<CancellationToken>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self { root: CancellationToken::new(), current: Mutex::new(None) }
    }

    /// Spawn `action` after `delay`, superseding the previous action.
    ///
    /// Must be called from within a tokio runtime. After [`Scheduler::shutdown`]
    /// the returned token is already cancelled and nothing is spawned.
    pub fn schedule<F>(&self, delay: Duration, action: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();

        {
            let mut current = self.current.lock();
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }

        if self.root.is_cancelled() {
            return token;
        }

        let guard = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = guard.cancelled() => {
                    tracing::trace!("scheduled action cancelled");
                }
                _ = async {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    action.await;
                } => {}
            }
        });

        token
    }

    /// Cancel the pending or running action, if any.
    pub fn cancel(&self) {
        if let Some(current) = self.current.lock().take() {
            current.cancel();
        }
    }

    /// Cancel everything, now and for every later `schedule` call.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.cancel();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
