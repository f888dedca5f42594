// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] turns SIGINT/SIGTERM (Ctrl+C on Windows) into a
//! single shutdown notification that any number of tasks can wait on. The
//! HTTP server takes [`ShutdownCoordinator::signal`] as its graceful
//! shutdown future.

use std::future::Future;

use tokio::sync::watch;
use tracing::info;

use crate::error::{BinError, BinResult};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Coordinates graceful shutdown across tasks.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// Creates a new coordinator.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Initiates shutdown. Idempotent.
    pub fn initiate_shutdown(&self) {
        let changed = self.sender.send_if_modified(|initiated| {
            let first = !*initiated;
            *initiated = true;
            first
        });
        if changed {
            info!("Shutdown initiated");
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        *self.sender.borrow()
    }

    /// A future that resolves once shutdown is initiated.
    pub fn signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            // Err means the coordinator is gone, which also ends the wait.
            let _ = receiver.wait_for(|initiated| *initiated).await;
        }
    }

    /// Waits for an OS shutdown signal or a manual initiation, then marks
    /// shutdown as initiated.
    pub async fn wait_for_shutdown(&self) -> BinResult<()> {
        if self.is_shutdown_initiated() {
            return Ok(());
        }

        tokio::select! {
            result = os_signal() => {
                result?;
                self.initiate_shutdown();
            }
            _ = self.signal() => {}
        }
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn os_signal() -> BinResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let register = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| BinError::init(format!("Failed to register {name} handler: {e}")))
    };
    let mut sigterm = register(SignalKind::terminate(), "SIGTERM")?;
    let mut sigint = register(SignalKind::interrupt(), "SIGINT")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn os_signal() -> BinResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BinError::init(format!("Failed to register Ctrl+C handler: {e}")))?;
    info!("Received Ctrl+C");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal_resolves_after_initiation() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.initiate_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), signal)
            .await
            .expect("shutdown signal should resolve");
        assert!(coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_signal_after_shutdown_resolves_immediately() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        tokio::time::timeout(Duration::from_millis(50), coordinator.signal())
            .await
            .expect("already initiated");
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_returns_on_manual_initiation() {
        let coordinator = ShutdownCoordinator::new();
        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.initiate_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), coordinator.wait_for_shutdown())
            .await
            .expect("should not hang")
            .unwrap();
    }
}
