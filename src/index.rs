//! The trie's binding to the storage core.
//!
//! [`PersistedTrie`] owns the root node, the entry manager the trie edits
//! flow through, and the lifecycle listener list. Matching and query
//! execution live above this layer; here the only traversal concern is
//! the lazy-load/invalidate protocol of [`node::PersistedTrieNode`].

pub mod entry_manager;
pub mod events;
pub mod node;
pub mod persisted;

use std::sync::Arc;

use crate::storage::error::StorageResult;

pub use entry_manager::EntryManager;
pub use events::{EventDispatcher, NodeLifecycleListener};
pub use node::{ItemReference, PersistedTrieNode};
pub use persisted::PersistedEntryManager;

/// Node id of the trie root.
pub const ROOT_NODE_ID: u32 = 0;

pub struct PersistedTrie<M: EntryManager> {
    manager: M,
    root: Arc<PersistedTrieNode>,
    events: EventDispatcher,
}

impl<M: EntryManager> PersistedTrie<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            root: PersistedTrieNode::new(ROOT_NODE_ID),
            events: EventDispatcher::new(),
        }
    }

    pub fn root(&self) -> Arc<PersistedTrieNode> {
        Arc::clone(&self.root)
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }

    pub fn subscribe(&mut self, listener: Box<dyn NodeLifecycleListener>) {
        self.events.subscribe(listener);
    }

    /// Marks `node`'s children stale, firing the lifecycle hooks.
    pub fn invalidate(&self, node: &PersistedTrieNode) {
        node.invalidate(&self.events);
    }

    pub fn children_of(
        &mut self,
        node: &PersistedTrieNode,
    ) -> StorageResult<Vec<(char, Arc<PersistedTrieNode>)>> {
        node.children(&mut self.manager, &self.events)
    }

    pub fn child_of(
        &mut self,
        node: &PersistedTrieNode,
        matched_char: char,
    ) -> StorageResult<Option<Arc<PersistedTrieNode>>> {
        node.child(matched_char, &mut self.manager, &self.events)
    }

    pub fn item_references_of(
        &mut self,
        node: &PersistedTrieNode,
    ) -> StorageResult<Vec<ItemReference>> {
        node.item_references(&mut self.manager, &self.events)
    }
}
