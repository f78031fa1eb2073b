// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! Trailing-edge debouncer
//!
//! Each call to [`Debouncer::schedule`] cancels the pending timer, if any, and
//! starts a new one. Only the ticket of the last call fires; earlier tickets
//! resolve as superseded.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::RunError;

/// Handle to one scheduled firing
#[derive(Debug)]
pub struct Ticket {
    rx: oneshot::Receiver<()>,
}

impl Ticket {
    /// Wait for the timer to elapse
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Superseded`] if the timer was cancelled or replaced.
    pub async fn wait(self) -> Result<(), RunError> {
        self.rx.await.map_err(|_| RunError::Superseded)
    }
}

/// Debounce timer owned by a single driver
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create an idle debouncer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending timer and start a new one
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, delay: Duration) -> Ticket {
        let (tx, rx) = oneshot::channel();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(());
        });
        if let Some(previous) = self.slot().replace(timer) {
            previous.abort();
        }
        Ticket { rx }
    }

    /// Cancel the pending timer, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    /// Check if a timer is waiting to fire
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|timer| !timer.is_finished())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_single_ticket_fires() {
        let debouncer = Debouncer::new();
        let ticket = debouncer.schedule(DELAY);
        assert!(debouncer.is_pending());
        assert!(ticket.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_reschedule_supersedes_previous() {
        let debouncer = Debouncer::new();
        let first = debouncer.schedule(DELAY);
        let second = debouncer.schedule(DELAY);

        assert!(matches!(first.wait().await, Err(RunError::Superseded)));
        assert!(second.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel() {
        let debouncer = Debouncer::new();
        let ticket = debouncer.schedule(DELAY);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(matches!(ticket.wait().await, Err(RunError::Superseded)));
    }

    #[tokio::test]
    async fn test_debouncers_are_independent() {
        let a = Debouncer::new();
        let b = Debouncer::new();
        let ta = a.schedule(DELAY);
        let tb = b.schedule(DELAY);
        assert!(ta.wait().await.is_ok());
        assert!(tb.wait().await.is_ok());
    }
}
