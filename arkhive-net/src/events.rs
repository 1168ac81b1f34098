//! Typed broadcast channels replacing the reflection-based event
//! emitter: each event kind gets its own channel, so a mismatched
//! message type is a compile error rather than a runtime panic.

use crate::status::ResourceSnapshot;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Fired on every status transition, every progress update (batched to
/// at most once per 64KiB), on transition to `Downloaded`
/// (`available`), and on transition to `Aborting` (`removing`).
pub struct ResourceEvents {
    status_updated: broadcast::Sender<ResourceSnapshot>,
    progress_updated: broadcast::Sender<ResourceSnapshot>,
    available: broadcast::Sender<ResourceSnapshot>,
    removing: broadcast::Sender<ResourceSnapshot>,
}

impl Default for ResourceEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceEvents {
    pub fn new() -> Self {
        Self {
            status_updated: broadcast::channel(CHANNEL_CAPACITY).0,
            progress_updated: broadcast::channel(CHANNEL_CAPACITY).0,
            available: broadcast::channel(CHANNEL_CAPACITY).0,
            removing: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<ResourceSnapshot> {
        self.status_updated.subscribe()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ResourceSnapshot> {
        self.progress_updated.subscribe()
    }

    pub fn subscribe_available(&self) -> broadcast::Receiver<ResourceSnapshot> {
        self.available.subscribe()
    }

    pub fn subscribe_removing(&self) -> broadcast::Receiver<ResourceSnapshot> {
        self.removing.subscribe()
    }

    /// A send with no subscribers is not an error: `broadcast::Sender`
    /// returns `Err` when nobody is listening, which is the normal case
    /// for a resource nobody is watching.
    pub(crate) fn emit_status(&self, snapshot: ResourceSnapshot) {
        let _ = self.status_updated.send(snapshot);
    }

    pub(crate) fn emit_progress(&self, snapshot: ResourceSnapshot) {
        let _ = self.progress_updated.send(snapshot);
    }

    pub(crate) fn emit_available(&self, snapshot: ResourceSnapshot) {
        let _ = self.available.send(snapshot);
    }

    pub(crate) fn emit_removing(&self, snapshot: ResourceSnapshot) {
        let _ = self.removing.send(snapshot);
    }
}
