use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};

/// Nonce-keyed one-shot pairing table for the signaling rendezvous. `T` is
/// whatever the gateway's socket type is — the hub doesn't need to know.
pub struct Rendezvous<T> {
    slots: Mutex<HashMap<String, oneshot::Sender<T>>>,
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Park a waiter under `nonce`, returning the receiver side for the
    /// viewer to await with its own timeout.
    pub async fn register(&self, nonce: String) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(nonce, tx);
        rx
    }

    /// Deliver the room's dial-back socket into a pending slot. `Err(value)`
    /// means the nonce is unknown or already used — the caller should close
    /// the socket it tried to deliver.
    pub async fn deliver(&self, nonce: &str, value: T) -> Result<(), T> {
        let tx = self.slots.lock().await.remove(nonce);
        match tx {
            Some(tx) => tx.send(value),
            None => {
                tracing::debug!(nonce, "rendezvous: dial-back for unknown or already-used nonce");
                Err(value)
            },
        }
    }

    /// Remove a slot that timed out waiting for a dial-back. Idempotent —
    /// a slot already consumed by `deliver` is simply not found.
    pub async fn evict(&self, nonce: &str) {
        self.slots.lock().await.remove(nonce);
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}
