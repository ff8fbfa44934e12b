//! Wallet session lifecycle
//!
//! A generation-tagged session value replaces any singleton wallet state:
//! every reconciliation carries the handle it was started under, and the
//! store rejects writes from a stale generation. A disconnect bumps the
//! generation and clears trade/position state immediately, so completions
//! racing a disconnect can never land in the next session.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::WalletSnapshot;

/// Identity of one wallet connection; cheap to clone and thread through calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    wallet: String,
    generation: u64,
}

impl SessionHandle {
    pub fn wallet(&self) -> &str {
        &self.wallet
    }
}

#[derive(Default)]
struct Inner {
    generation: u64,
    wallet: Option<String>,
    snapshot: WalletSnapshot,
}

/// Owner of the per-session trade/position state
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for a wallet, invalidating any previous one
    pub async fn connect(&self, wallet: &str) -> SessionHandle {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.wallet = Some(wallet.to_string());
        inner.snapshot = WalletSnapshot::default();
        SessionHandle {
            wallet: wallet.to_string(),
            generation: inner.generation,
        }
    }

    /// End the current session and clear its state immediately
    pub async fn disconnect(&self) {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.wallet = None;
        inner.snapshot = WalletSnapshot::default();
    }

    /// Write a snapshot for a session; returns false (and writes nothing)
    /// when the handle's generation is no longer current
    pub async fn apply(&self, handle: &SessionHandle, snapshot: WalletSnapshot) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != handle.generation {
            debug!(
                "discarding stale snapshot for {} (generation {})",
                handle.wallet, handle.generation
            );
            return false;
        }
        inner.snapshot = snapshot;
        true
    }

    pub async fn is_current(&self, handle: &SessionHandle) -> bool {
        self.inner.read().await.generation == handle.generation
    }

    pub async fn snapshot(&self) -> WalletSnapshot {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn wallet(&self) -> Option<String> {
        self.inner.read().await.wallet.clone()
    }
}
