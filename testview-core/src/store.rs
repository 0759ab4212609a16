// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared report state: load tracking, cancellation and polling.
//!
//! The store owns the latest report document behind an async mutex. Loads
//! are numbered; a load that finishes after a newer one has started gets
//! discarded instead of clobbering fresher state. Cancellation is
//! cooperative and keeps the last good report around for display.

use crate::errors::FetchError;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use testview_report::TestReport;
use tokio::{
    sync::{Mutex, Notify},
    time::MissedTickBehavior,
};
use tracing::{debug, warn};

/// Cooperative cancellation shared between a load and its initiator.
///
/// Cloning the token shares the underlying flag. Cancellation is one-shot:
/// once cancelled, a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Cancels the token and wakes everyone waiting on it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        // Register before checking the flag so a cancel landing in between
        // still wakes us.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Where the store is in its load lifecycle.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LoadState {
    /// No load attempted yet.
    #[default]
    Idle,
    /// A load is in flight.
    Loading,
    /// The last load completed and its report is current.
    Loaded,
    /// The last load failed. Holds the rendered error.
    Failed(String),
    /// The last load was cancelled before it completed.
    Cancelled,
}

/// The latest report document plus load bookkeeping.
#[derive(Debug, Default)]
pub struct ReportStore {
    generation: AtomicU64,
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    state: LoadState,
    report: Option<Arc<TestReport>>,
}

impl ReportStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        ReportStore::default()
    }

    /// The current load state.
    pub async fn state(&self) -> LoadState {
        self.inner.lock().await.state.clone()
    }

    /// The most recently loaded report, if any. Stale reports stay
    /// available through failures and cancellations.
    pub async fn report(&self) -> Option<Arc<TestReport>> {
        self.inner.lock().await.report.clone()
    }

    /// Installs a locally produced report, superseding in-flight loads.
    pub async fn install(&self, report: TestReport) -> Arc<TestReport> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let report = Arc::new(report);
        let mut inner = self.inner.lock().await;
        inner.state = LoadState::Loaded;
        inner.report = Some(Arc::clone(&report));
        report
    }

    /// Runs `fetch` to completion and installs its result, unless the load
    /// is cancelled or a newer load finishes first.
    ///
    /// On cancellation and supersession the previously loaded report is
    /// left in place.
    pub async fn load_with<F, Fut>(
        &self,
        cancel: &CancelToken,
        fetch: F,
    ) -> Result<Arc<TestReport>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TestReport, FetchError>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.lock().await.state = LoadState::Loading;
        debug!("report load {generation} started");

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            fetched = fetch() => fetched,
        };

        let mut inner = self.inner.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer load owns the state now; drop this result.
            debug!("report load {generation} superseded");
            return Err(FetchError::Superseded);
        }
        match outcome {
            Ok(report) => {
                let report = Arc::new(report);
                inner.state = LoadState::Loaded;
                inner.report = Some(Arc::clone(&report));
                debug!("report load {generation} finished");
                Ok(report)
            }
            Err(FetchError::Cancelled) => {
                inner.state = LoadState::Cancelled;
                debug!("report load {generation} cancelled");
                Err(FetchError::Cancelled)
            }
            Err(error) => {
                inner.state = LoadState::Failed(error.to_string());
                Err(error)
            }
        }
    }

    /// Reloads through `fetch` on a fixed interval until `cancel` fires.
    ///
    /// Individual failures are logged and do not stop the loop; the next
    /// tick retries.
    pub async fn poll_with<F, Fut>(&self, every: Duration, cancel: &CancelToken, mut fetch: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TestReport, FetchError>>,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.load_with(cancel, &mut fetch).await {
                Ok(_) => {}
                Err(FetchError::Cancelled) => break,
                Err(FetchError::Superseded) => {}
                Err(error) => warn!("report poll failed: {error}"),
            }
        }
    }
}
