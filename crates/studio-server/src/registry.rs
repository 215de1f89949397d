use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use sitegen::CancelToken;

use crate::protocol::ProtocolMessage;

const CHANNEL_CAPACITY: usize = 512;

// ─── SessionStreamEntry ───────────────────────────────────────────────────

/// Live per-app stream state: the broadcast side of the protocol stream,
/// the prompt that started it, and the turn's cancel token.
struct SessionStreamEntry {
    sender: broadcast::Sender<ProtocolMessage>,
    prompt: String,
    cancel: CancelToken,
    token: ClaimToken,
}

/// Ownership proof handed out by [`StreamRegistry::claim`]. Only the
/// holder of the current token can release the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimToken(u64);

// ─── StreamRegistry ───────────────────────────────────────────────────────

/// Process-wide map from app id to its active protocol stream.
///
/// Last writer wins: `claim` replaces any existing entry for the app and
/// cancels the displaced turn. `release` is compare-and-swap on the claim
/// token, so a turn that has already been displaced cannot evict its
/// successor's entry when it finally winds down.
#[derive(Default)]
pub struct StreamRegistry {
    inner: Mutex<HashMap<String, SessionStreamEntry>>,
    next_token: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh stream for `app_id`, displacing (and cancelling)
    /// any turn already registered there. Returns the ownership token and
    /// the broadcast sender; subscribe before spawning the producer so no
    /// frame is missed.
    pub async fn claim(
        &self,
        app_id: &str,
        prompt: &str,
        cancel: CancelToken,
    ) -> (ClaimToken, broadcast::Sender<ProtocolMessage>) {
        let token = ClaimToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        let displaced = {
            let mut map = self.inner.lock().await;
            map.insert(
                app_id.to_owned(),
                SessionStreamEntry {
                    sender: sender.clone(),
                    prompt: prompt.to_owned(),
                    cancel,
                    token,
                },
            )
        };

        if let Some(old) = displaced {
            info!(app_id = %app_id, "displacing in-flight stream");
            old.cancel.cancel();
        } else {
            debug!(app_id = %app_id, "registered stream");
        }

        (token, sender)
    }

    /// Remove the entry for `app_id` only if `token` still owns it.
    /// Returns whether the entry was removed.
    pub async fn release(&self, app_id: &str, token: ClaimToken) -> bool {
        let mut map = self.inner.lock().await;
        match map.get(app_id) {
            Some(entry) if entry.token == token => {
                map.remove(app_id);
                debug!(app_id = %app_id, "released stream");
                true
            }
            _ => false,
        }
    }

    /// Unconditionally drop the entry for `app_id`.
    pub async fn delete(&self, app_id: &str) {
        self.inner.lock().await.remove(app_id);
    }

    /// The prompt of the active stream, if one exists.
    pub async fn prompt(&self, app_id: &str) -> Option<String> {
        let map = self.inner.lock().await;
        map.get(app_id).map(|e| e.prompt.clone())
    }

    /// Subscribe to the active stream's frames.
    pub async fn subscribe(
        &self,
        app_id: &str,
    ) -> Option<broadcast::Receiver<ProtocolMessage>> {
        let map = self.inner.lock().await;
        map.get(app_id).map(|e| e.sender.subscribe())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
