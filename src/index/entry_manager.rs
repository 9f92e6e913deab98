//! The contract between the trie and entry storage.

use crate::storage::error::StorageResult;
use crate::storage::page::Entry;

/// Persistence operations the trie consumes.
///
/// The trie decides *which* edits to make; an implementation of this trait
/// only guarantees that the edits are durably and correctly persisted.
pub trait EntryManager {
    /// Returns a fresh, never-reused item id.
    fn allocate_new_item_id(&mut self) -> StorageResult<u32>;

    /// Returns a fresh, never-reused trie node id.
    fn allocate_new_index_node_id(&mut self) -> StorageResult<u32>;

    /// Every stored entry owned by `node_id`: its child edges and its item
    /// references.
    fn get_index_node_entries(&mut self, node_id: u32) -> StorageResult<Vec<Entry>>;

    fn add_index_node_reference_entry(
        &mut self,
        owner_id: u32,
        child_node_id: u32,
        matched_char: char,
    ) -> StorageResult<()>;

    fn remove_index_node_reference_entry(
        &mut self,
        owner_id: u32,
        child_node_id: u32,
        matched_char: char,
    ) -> StorageResult<()>;

    fn add_node_item_entry(
        &mut self,
        owner_id: u32,
        item_id: u32,
        word_position: u32,
    ) -> StorageResult<()>;

    fn remove_node_item_entry(
        &mut self,
        owner_id: u32,
        item_id: u32,
        word_position: u32,
    ) -> StorageResult<()>;

    /// Binds `item_id` to its external key in the item catalog.
    fn add_item_index_entry(&mut self, item_id: u32, key: &str) -> StorageResult<()>;

    /// Removes `item_id` from the item catalog.
    fn remove_item_entry(&mut self, item_id: u32) -> StorageResult<()>;

    fn item_indexed(&self, key: &str) -> bool;

    fn get_id_for_item(&self, key: &str) -> Option<u32>;

    fn get_item_for_id(&self, item_id: u32) -> Option<String>;
}
