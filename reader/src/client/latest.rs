//! Superseding requests
//!
//! A [`LatestRequest`] owns the in-flight request for one piece of view
//! state (the open chapter, the search box). Starting a new request cancels
//! the previous one, and results are published through a `watch` channel
//! tagged with a generation number, so a response that arrives late can
//! never overwrite newer state.

use crate::error::{AppError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Observable state of a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
    /// Nothing requested yet, or the request was cancelled
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> FetchState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => FetchState::Loaded(value),
            Err(e) => FetchState::Failed(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            FetchState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Fetch state stamped with the request that produced it
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    pub generation: u64,
    pub state: FetchState<T>,
}

/// The single live request for one slot of state
pub struct LatestRequest<T> {
    tx: Arc<watch::Sender<Tracked<T>>>,
    generation: u64,
    current: Option<CancellationToken>,
}

impl<T> Default for LatestRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Tracked {
            generation: 0,
            state: FetchState::Idle,
        });

        Self {
            tx: Arc::new(tx),
            generation: 0,
            current: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Tracked<T>> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> FetchState<T> {
        self.tx.borrow().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel whatever is in flight and run `request` in its place
    pub fn start<F>(&mut self, request: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.current = Some(token.clone());

        self.tx.send_replace(Tracked {
            generation,
            state: FetchState::Loading,
        });

        let tx = Arc::clone(&self.tx);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(generation, "Request superseded before completion");
                    return;
                }
                outcome = request => outcome,
            };

            let published = tx.send_if_modified(|current| {
                if current.generation != generation {
                    return false;
                }
                current.state = FetchState::from_result(outcome);
                true
            });

            if !published {
                tracing::debug!(generation, "Dropped stale response");
            }
        })
    }

    /// Cancel the in-flight request, returning the slot to `Idle`
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
            let generation = self.generation;
            self.tx.send_if_modified(|current| {
                if current.generation == generation && current.state.is_loading() {
                    current.state = FetchState::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Wait until the latest request has settled and return its state
    pub async fn settled(&self) -> FetchState<T> {
        let generation = self.generation;
        let mut rx = self.subscribe();

        loop {
            {
                let current = rx.borrow_and_update();
                if current.generation == generation && !current.state.is_loading() {
                    return current.state.clone();
                }
            }

            if rx.changed().await.is_err() {
                return FetchState::Failed(AppError::Cancelled.to_string());
            }
        }
    }
}

impl<T> Drop for LatestRequest<T> {
    fn drop(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn delayed(value: u32, ms: u64) -> Result<u32> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let request: LatestRequest<u32> = LatestRequest::new();
        assert_eq!(request.state(), FetchState::Idle);
    }

    #[tokio::test]
    async fn test_publishes_result() {
        let mut request = LatestRequest::new();

        request.start(delayed(7, 5));
        assert!(request.state().is_loading());

        assert_eq!(request.settled().await, FetchState::Loaded(7));
    }

    #[tokio::test]
    async fn test_newer_request_wins_over_slow_older_one() {
        let mut request = LatestRequest::new();

        let slow = request.start(delayed(1, 200));
        request.start(delayed(2, 10));

        assert_eq!(request.settled().await, FetchState::Loaded(2));

        // The superseded task exits without publishing
        slow.await.unwrap();
        assert_eq!(request.state(), FetchState::Loaded(2));
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let mut request: LatestRequest<u32> = LatestRequest::new();

        request.start(async { Err(AppError::Generic("offline".to_string())) });

        assert_eq!(
            request.settled().await,
            FetchState::Failed("offline".to_string())
        );
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle() {
        let mut request = LatestRequest::new();

        let handle = request.start(delayed(3, 200));
        request.cancel();
        handle.await.unwrap();

        assert_eq!(request.state(), FetchState::Idle);
    }
}
