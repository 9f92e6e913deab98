//! Lazily persisted trie nodes.
//!
//! A persisted node binds a trie node to its node id in the store. Its
//! children and item references are not held in memory until a traversal
//! needs them; `invalidate` marks them stale without discarding the node
//! object, and the first traversal afterwards refetches everything with a
//! single entry-manager query.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::index::entry_manager::EntryManager;
use crate::index::events::EventDispatcher;
use crate::storage::error::StorageResult;
use crate::storage::page::Entry;

/// One occurrence of an indexed item under a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemReference {
    pub item_id: u32,
    pub word_position: u32,
}

pub struct PersistedTrieNode {
    node_id: u32,
    state: RwLock<NodeState>,
}

#[derive(Default)]
struct NodeState {
    loaded: bool,
    children: HashMap<char, Arc<PersistedTrieNode>>,
    item_references: Vec<ItemReference>,
}

impl PersistedTrieNode {
    pub fn new(node_id: u32) -> Arc<Self> {
        Arc::new(Self {
            node_id,
            state: RwLock::new(NodeState::default()),
        })
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    /// Marks the node's children stale. The node object itself, and the
    /// child objects it already built, are kept for reuse on restore.
    pub fn invalidate(&self, events: &EventDispatcher) {
        self.state.write().loaded = false;
        events.notify_invalidated(self.node_id);
    }

    /// The node's child edges, fetching from storage when stale.
    pub fn children(
        &self,
        manager: &mut dyn EntryManager,
        events: &EventDispatcher,
    ) -> StorageResult<Vec<(char, Arc<PersistedTrieNode>)>> {
        self.ensure_loaded(manager, events)?;
        let state = self.state.read();
        let mut children: Vec<_> = state
            .children
            .iter()
            .map(|(&c, node)| (c, Arc::clone(node)))
            .collect();
        children.sort_by_key(|(c, _)| *c);
        Ok(children)
    }

    /// The child reached through `matched_char`, if any.
    pub fn child(
        &self,
        matched_char: char,
        manager: &mut dyn EntryManager,
        events: &EventDispatcher,
    ) -> StorageResult<Option<Arc<PersistedTrieNode>>> {
        self.ensure_loaded(manager, events)?;
        Ok(self.state.read().children.get(&matched_char).cloned())
    }

    /// The item references stored under this node, fetching when stale.
    pub fn item_references(
        &self,
        manager: &mut dyn EntryManager,
        events: &EventDispatcher,
    ) -> StorageResult<Vec<ItemReference>> {
        self.ensure_loaded(manager, events)?;
        Ok(self.state.read().item_references.clone())
    }

    /// Issues exactly one entry-manager query per invalidation: partitions
    /// the returned entries into child edges and item references, reusing
    /// any still-valid child node objects.
    fn ensure_loaded(
        &self,
        manager: &mut dyn EntryManager,
        events: &EventDispatcher,
    ) -> StorageResult<()> {
        if self.state.read().loaded {
            return Ok(());
        }

        let entries = manager.get_index_node_entries(self.node_id)?;

        let mut state = self.state.write();
        let mut children = HashMap::new();
        state.item_references.clear();
        for entry in entries {
            match entry {
                Entry::NodeReference {
                    child_node_id,
                    matched_char,
                    ..
                } => {
                    let node = state
                        .children
                        .get(&matched_char)
                        .filter(|existing| existing.node_id == child_node_id)
                        .cloned()
                        .unwrap_or_else(|| PersistedTrieNode::new(child_node_id));
                    children.insert(matched_char, node);
                }
                Entry::ItemReference {
                    item_id,
                    word_position,
                    ..
                } => {
                    state.item_references.push(ItemReference {
                        item_id,
                        word_position,
                    });
                }
                Entry::ItemKey { .. } => {}
            }
        }
        state.children = children;
        state.loaded = true;
        drop(state);

        events.notify_restored(self.node_id);
        Ok(())
    }
}
