//! Transport seam
//!
//! Connection management lives outside the library. A [`Transport`] only sends whole
//! messages and invokes subscribed listeners with whatever arrives.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TetrecsError};

/// Callback invoked for every received message
pub type MessageListener = Box<dyn Fn(&str) + Send + Sync>;

/// Handle returned by [`Transport::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Message transport used by the multiplayer adapter
pub trait Transport: Send + Sync {
    /// Send one message
    fn send(&self, message: &str) -> Result<()>;

    /// Register a listener for incoming messages
    fn subscribe(&self, listener: MessageListener) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered.
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

#[derive(Default)]
struct LoopbackInner {
    listeners: Mutex<BTreeMap<ListenerId, Arc<MessageListener>>>,
    next_id: AtomicU64,
    sent: Mutex<Option<flume::Sender<String>>>,
}

/// In-memory transport
///
/// Sent messages are readable from [`LoopbackTransport::outbox`]; incoming messages
/// are injected with [`LoopbackTransport::deliver`]. Clones share the same state.
#[derive(Clone)]
pub struct LoopbackTransport {
    inner: Arc<LoopbackInner>,
    outbox: flume::Receiver<String>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (sent_tx, outbox) = flume::unbounded();
        let inner = LoopbackInner {
            sent: Mutex::new(Some(sent_tx)),
            ..Default::default()
        };
        Self {
            inner: Arc::new(inner),
            outbox,
        }
    }

    /// Receiver of every message passed to [`Transport::send`]
    pub fn outbox(&self) -> flume::Receiver<String> {
        self.outbox.clone()
    }

    /// Hand a message to every subscribed listener
    pub fn deliver(&self, message: &str) {
        // Listeners run outside the lock so they may (un)subscribe
        let listeners: Vec<_> = lock(&self.inner.listeners).values().cloned().collect();
        tracing::trace!("Loopback delivering '{}' to {} listeners", message, listeners.len());
        for listener in listeners {
            listener(message);
        }
    }

    /// Stop accepting sends, as if the connection dropped
    pub fn close(&self) {
        lock(&self.inner.sent).take();
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, message: &str) -> Result<()> {
        let sent = lock(&self.inner.sent);
        let Some(tx) = sent.as_ref() else {
            return Err(TetrecsError::ChannelClosed("loopback transport closed".to_string()));
        };
        tx.send(message.to_string())
            .map_err(|_| TetrecsError::ChannelClosed("loopback outbox dropped".to_string()))
    }

    fn subscribe(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).insert(id, Arc::new(listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        lock(&self.inner.listeners).remove(&id).is_some()
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("listeners", &self.listener_count())
            .field("outbox", &self.outbox.len())
            .finish()
    }
}

/// Lock, ignoring poisoning; the guarded data stays consistent across panics
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_records_outbox() {
        let transport = LoopbackTransport::new();
        transport.send("PIECE").unwrap();
        transport.send("SCORE 10").unwrap();
        let outbox: Vec<_> = transport.outbox().drain().collect();
        assert_eq!(outbox, vec!["PIECE", "SCORE 10"]);

        transport.close();
        assert!(matches!(
            transport.send("PIECE"),
            Err(TetrecsError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_subscribe_deliver_unsubscribe() {
        let transport = LoopbackTransport::new();
        let (tx, rx) = flume::unbounded();
        let id = transport.subscribe(Box::new(move |msg| {
            let _ = tx.send(msg.to_string());
        }));
        assert_eq!(transport.listener_count(), 1);

        transport.deliver("PIECE 4");
        assert_eq!(rx.try_recv().unwrap(), "PIECE 4");

        assert!(transport.unsubscribe(id));
        assert!(!transport.unsubscribe(id));
        transport.deliver("PIECE 5");
        assert!(rx.try_recv().is_err());
    }
}
