use std::time::Duration;

use tokio::sync::watch;

use crate::provider::ProviderError;

/// Cancellation scope passed to every provider operation.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Option<watch::Receiver<bool>>,
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancelled: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self { cancelled: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled. Never resolves for a
    /// background context or after the handle is dropped uncancelled.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.cancelled else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        let result = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if result.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), ProviderError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(ProviderError::Cancelled),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
