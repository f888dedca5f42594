// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Auth-state change notification.
//!
//! Stores publish the current session on a `watch` channel. Observers get
//! an [`AuthStateSubscription`] that wakes on every sign-in and sign-out and
//! stops for good once its [`CancelHandle`] is triggered.

use std::sync::Arc;

use shifa_core::Session;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Stops an [`AuthStateSubscription`].
///
/// Clones share the same cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Cancels the subscription. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A live view of the auth state.
#[derive(Debug)]
pub struct AuthStateSubscription {
    session: watch::Receiver<Option<Session>>,
    cancelled: watch::Receiver<bool>,
    handle: CancelHandle,
}

impl AuthStateSubscription {
    /// Subscribes to a session channel.
    pub fn new(mut session: watch::Receiver<Option<Session>>) -> Self {
        session.mark_unchanged();
        let (tx, cancelled) = watch::channel(false);
        Self {
            session,
            cancelled,
            handle: CancelHandle { tx: Arc::new(tx) },
        }
    }

    /// Session at this moment.
    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// A handle that cancels this subscription.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Cancels this subscription.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Waits for the next auth-state change.
    ///
    /// Returns `None` once cancelled or when the store is gone.
    pub async fn next(&mut self) -> Option<Option<Session>> {
        loop {
            if *self.cancelled.borrow_and_update() {
                return None;
            }
            tokio::select! {
                biased;
                res = self.cancelled.changed() => {
                    if res.is_err() {
                        return None;
                    }
                }
                res = self.session.changed() => {
                    return match res {
                        Ok(()) => Some(self.session.borrow_and_update().clone()),
                        Err(_) => None,
                    };
                }
            }
        }
    }

    /// Calls `listener` on every change until cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_listener<F>(mut self, mut listener: F) -> (CancelHandle, JoinHandle<()>)
    where
        F: FnMut(Option<Session>) + Send + 'static,
    {
        let handle = self.cancel_handle();
        let task = tokio::spawn(async move {
            while let Some(session) = self.next().await {
                listener(session);
            }
            debug!("Auth-state listener stopped");
        });
        (handle, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_next_reports_changes() {
        let (tx, rx) = watch::channel(None);
        let mut sub = AuthStateSubscription::new(rx);

        tx.send_replace(Some(Session::new("u-1")));
        let change = sub.next().await;
        assert_eq!(
            change.flatten().map(|s| s.user_id.as_str().to_string()),
            Some("u-1".to_string())
        );

        tx.send_replace(None);
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_cancel_stops_pending_next() {
        let (_tx, rx) = watch::channel(None);
        let mut sub = AuthStateSubscription::new(rx);
        let handle = sub.cancel_handle();

        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::task::yield_now().await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_closed_source_ends_subscription() {
        let (tx, rx) = watch::channel(None);
        let mut sub = AuthStateSubscription::new(rx);
        drop(tx);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_listener_stops_after_cancel() {
        let (tx, rx) = watch::channel(None);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let (handle, task) = AuthStateSubscription::new(rx).spawn_listener(move |s| {
            sink.lock().push(s.is_some());
        });

        tx.send_replace(Some(Session::new("u-1")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
        task.await.unwrap();

        tx.send_replace(None);
        assert_eq!(*seen.lock(), vec![true]);
    }
}
