//! Per-sheet relay state: a text mirror and an ordered broadcast bus.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use eecalc_core::SyncEvent;
use eecalc_core::sheet::{CellList, MAX_CELLS};

/// Identifies one client connection for the lifetime of the relay.
pub type ConnId = u64;

/// Default capacity of each namespace's broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// An event tagged with the connection that sent it.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub from: ConnId,
    pub event: SyncEvent,
}

/// One sheet namespace.
///
/// The mirror lock is held across both the mirror update and the broadcast
/// send, so every member observes events in the same order the mirror did.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    mirror: Mutex<CellList>,
    tx: broadcast::Sender<Relayed>,
}

impl Namespace {
    pub fn new(name: &str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Namespace {
            name: name.to_string(),
            mirror: Mutex::new(CellList::new()),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe and take a snapshot atomically.
    ///
    /// Every event published after the snapshot is delivered to the returned
    /// receiver; nothing before it is. A member whose receiver lagged joins
    /// again to resynchronise.
    pub fn join(&self) -> (Vec<String>, broadcast::Receiver<Relayed>) {
        let mirror = self.mirror.lock();
        let rx = self.tx.subscribe();
        (mirror.texts(), rx)
    }

    /// Apply `event` to the mirror and fan it out.
    pub fn publish(&self, from: ConnId, event: SyncEvent) {
        let mut mirror = self.mirror.lock();
        match &event {
            SyncEvent::EditCell { number, content } => {
                if !mirror.insert_at_or_grow(*number, content) {
                    tracing::warn!(
                        sheet = %self.name,
                        conn = from,
                        number,
                        "edit past the cell limit dropped"
                    );
                    return;
                }
            }
            SyncEvent::DeleteCell { number } => {
                if !mirror.delete_now(*number) {
                    tracing::debug!(sheet = %self.name, number, "mirror ignored delete");
                }
            }
            SyncEvent::Sheet { .. } => {
                tracing::warn!(sheet = %self.name, conn = from, "client sent a snapshot; dropped");
                return;
            }
        }
        mirror.drain_signals();
        // No receivers is not an error: the sender may be the only member left.
        let _ = self.tx.send(Relayed { from, event });
    }

    pub fn texts(&self) -> Vec<String> {
        self.mirror.lock().texts()
    }

    pub fn member_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// All namespaces known to one relay, created on first join.
#[derive(Debug)]
pub struct Namespaces {
    map: DashMap<String, Arc<Namespace>>,
    capacity: usize,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Namespaces {
            map: DashMap::new(),
            capacity,
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<Namespace> {
        self.map
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(sheet = %name, "created namespace");
                Arc::new(Namespace::new(name, self.capacity))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.map.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new()
    }
}
