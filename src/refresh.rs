//! Periodic refresh task
//!
//! Re-resolves prices and open-trade marks on a fixed interval while a
//! wallet session is live. One tokio task drives the loop: ticks run
//! strictly in sequence, so a slow refresh cannot stack on top of itself,
//! and `MissedTickBehavior::Skip` drops the backlog instead of bursting.
//! The task ends on disconnect, on an empty trade set, or when `stop`
//! aborts it; no timer survives a session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::reconcile::Reconciler;
use crate::session::{SessionHandle, SessionStore};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to the background refresh loop for one session
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Start the loop for a session
    ///
    /// Callers start this only once the session holds a non-empty trade
    /// set; the loop tears itself down if that stops being true.
    pub fn spawn(
        interval: Duration,
        reconciler: Arc<Reconciler>,
        store: SessionStore,
        session: SessionHandle,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick of tokio's interval fires immediately; swallow it
            // so the initial snapshot isn't refreshed twice
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if !store.is_current(&session).await {
                    debug!("session for {} ended; stopping refresh", session.wallet());
                    break;
                }

                let mut snapshot = store.snapshot().await;
                if snapshot.trades.is_empty() {
                    debug!("trade set empty; stopping refresh for {}", session.wallet());
                    break;
                }

                reconciler.refresh_marks(&mut snapshot).await;

                // A disconnect between the read and the write surfaces here
                if !store.apply(&session, snapshot).await {
                    break;
                }
                debug!("refreshed marks for {}", session.wallet());
            }
        });

        info!("started refresh loop ({}s interval)", interval.as_secs());
        RefreshTask { handle }
    }

    /// Tear the loop down; the interval is fully cleared
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
