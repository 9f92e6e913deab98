//! Node lifecycle notifications.
//!
//! Listeners are invoked synchronously at the invalidate/restore call
//! sites and are purely observational: nothing they do feeds back into the
//! storage core. The call list is owned by the index, not by any global
//! state.

/// Observer of the lazy-load protocol.
pub trait NodeLifecycleListener: Send + Sync {
    /// A node's children were marked stale.
    fn node_invalidated(&self, _node_id: u32) {}

    /// A node refetched its children from storage.
    fn node_restored(&self, _node_id: u32) {}
}

/// The index's listener list.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Box<dyn NodeLifecycleListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn NodeLifecycleListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_invalidated(&self, node_id: u32) {
        for listener in &self.listeners {
            listener.node_invalidated(node_id);
        }
    }

    pub fn notify_restored(&self, node_id: u32) {
        for listener in &self.listeners {
            listener.node_restored(node_id);
        }
    }
}
