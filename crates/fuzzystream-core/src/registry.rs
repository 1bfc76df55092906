//! Live set of connected clients.
//!
//! Each client is represented by the sending half of its bounded outbound
//! queue. The transport owns the receiving half and the socket; the registry
//! only decides who gets the next message.
//!
//! Membership is tied to a [`Registration`] guard: dropping the guard removes
//! the entry, so deregistration happens on every exit path of a handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outbound queue of one client. Payloads are shared between recipients.
pub type ClientSender = mpsc::Sender<Arc<str>>;

/// Registry-local identity of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Connections in the snapshot taken for this message.
    pub recipients: usize,
    /// Recipients whose queue was full or already closed.
    pub failed: usize,
}

/// Thread-safe set of open connections.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ClientSender>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ClientSender>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection and return the guard that keeps it registered.
    pub fn register(self: &Arc<Self>, sender: ClientSender) -> Registration {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let total = {
            let mut conns = self.lock();
            conns.insert(id, sender);
            conns.len()
        };
        info!("client connected ({total} total)");
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Remove a connection. Removing an absent id is a no-op. Returns whether
    /// an entry was removed.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let (removed, total) = {
            let mut conns = self.lock();
            let removed = conns.remove(&id).is_some();
            (removed, conns.len())
        };
        if removed {
            info!("client disconnected ({total} total)");
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current members. Later registrations and removals do not
    /// affect the returned list.
    pub fn snapshot(&self) -> Vec<(ConnectionId, ClientSender)> {
        self.lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    /// Queue `payload` for every member of a snapshot. A full or closed queue
    /// only affects that member; the closed entry is reconciled when its
    /// handler drops the [`Registration`].
    pub fn broadcast(&self, payload: &str) -> Delivery {
        let members = self.snapshot();
        let payload: Arc<str> = Arc::from(payload);
        let mut failed = 0;
        for (id, tx) in &members {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    failed += 1;
                    debug!("{id}: outbound queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    failed += 1;
                    debug!("{id}: outbound queue closed");
                }
            }
        }
        Delivery {
            recipients: members.len(),
            failed,
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one connection registered for as long as it lives.
#[must_use = "dropping the registration deregisters the connection"]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Registration {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(capacity: usize) -> (ClientSender, mpsc::Receiver<Arc<str>>) {
        mpsc::channel(capacity)
    }

    #[test]
    fn register_and_drop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, _rx) = client(4);
        let reg = registry.register(tx);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(reg.id()));
        drop(reg);
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let registry = Arc::new(ConnectionRegistry::new());
        let regs: Vec<_> = (0..10).map(|_| registry.register(client(1).0)).collect();
        let mut ids: Vec<_> = regs.iter().map(Registration::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let reg = registry.register(client(1).0);
        let id = reg.id();
        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));
        // The guard's own removal is now a no-op too.
        drop(reg);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_accepts_and_closes() {
        const N: usize = 64;
        const M: usize = 40;

        let registry = Arc::new(ConnectionRegistry::new());
        let handles: Vec<_> = (0..N)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let (tx, rx) = client(1);
                    let reg = registry.register(tx);
                    if i < M {
                        drop(reg);
                        None
                    } else {
                        Some((reg, rx))
                    }
                })
            })
            .collect();

        let survivors: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(survivors.len(), N - M);
        assert_eq!(registry.len(), N - M);

        drop(survivors);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member_with_same_payload() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        let mut regs = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = client(4);
            regs.push(registry.register(tx));
            receivers.push(rx);
        }

        let delivery = registry.broadcast("a1f9");
        assert_eq!(delivery, Delivery { recipients: 5, failed: 0 });

        for rx in &mut receivers {
            assert_eq!(rx.recv().await.as_deref(), Some("a1f9"));
        }
    }

    #[tokio::test]
    async fn failed_member_does_not_block_others() {
        let registry = Arc::new(ConnectionRegistry::new());

        let (closed_tx, closed_rx) = client(4);
        let _closed = registry.register(closed_tx);
        drop(closed_rx);

        let (full_tx, _full_rx) = client(1);
        let _full = registry.register(full_tx);
        registry.broadcast("0000");

        let (ok_tx, mut ok_rx) = client(4);
        let _ok = registry.register(ok_tx);

        let delivery = registry.broadcast("beef");
        assert_eq!(delivery.recipients, 3);
        assert_eq!(delivery.failed, 2);
        assert_eq!(ok_rx.recv().await.as_deref(), Some("beef"));
        // Closed queues stay registered until their handler lets go.
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn broadcast_to_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.broadcast("abcd"), Delivery::default());
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = Arc::new(ConnectionRegistry::new());
        let reg = registry.register(client(1).0);
        let snap = registry.snapshot();
        drop(reg);
        assert_eq!(snap.len(), 1);
        assert!(registry.is_empty());
    }
}
