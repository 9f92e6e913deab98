//! The persisted entry manager: the page manager gluing the storage core
//! together behind the [`EntryManager`] contract.
//!
//! Owns the data and log files, the page cache, and one header chain per
//! page category. Every mutating operation runs as its own transaction:
//! affected pages are registered, their before-images logged, the new
//! bytes flushed, and the log marked committed. Crash recovery runs once
//! in [`open`](PersistedEntryManager::open), before any other access.

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::index::entry_manager::EntryManager;
use crate::recovery::{run_rollback, RollbackOutcome};
use crate::storage::buffer::BufferPool;
use crate::storage::cache::PageCache;
use crate::storage::disk::{
    self, page_offset, FileAccessor, ManagerHeader, FIRST_PAGE_OFFSET, MANAGER_HEADER_OFFSET,
    MANAGER_HEADER_SIZE, PAGE_SIZE,
};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{
    DataPage, DataPageCollection, Entry, PageHeader, PageType, SharedDataPage, SharedPageHeader,
    PAGE_HEADER_SIZE,
};
use crate::storage::wal::{AffectedLevel, LogFileAccessor, TransactionLog};

pub const DATA_FILE_NAME: &str = "index.dat";
pub const LOG_FILE_NAME: &str = "index.log";

pub struct PersistedEntryManager {
    data: Arc<FileAccessor>,
    wal: Arc<Mutex<LogFileAccessor>>,
    cache: PageCache,
    node_pages: DataPageCollection,
    item_pages: DataPageCollection,
    item_key_pages: DataPageCollection,
    header_block: ManagerHeader,
    items_by_key: HashMap<String, u32>,
    keys_by_item: HashMap<u32, String>,
    next_transaction_id: u64,
    open_rollback: RollbackOutcome,
}

impl PersistedEntryManager {
    /// Opens (or creates) the store under `dir`.
    ///
    /// Recovery runs first: an interrupted transaction found in the log is
    /// rolled back before anything reads the data file. Afterwards every
    /// page header is loaded eagerly and the per-category chains and the
    /// item catalog are rebuilt.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        let buffers = BufferPool::new();
        let data = Arc::new(FileAccessor::open(
            &dir.join(DATA_FILE_NAME),
            Arc::clone(&buffers),
        )?);
        let mut wal_accessor = LogFileAccessor::open(&dir.join(LOG_FILE_NAME), buffers)?;

        let open_rollback = run_rollback(&mut wal_accessor, &data)?;
        let wal = Arc::new(Mutex::new(wal_accessor));

        if data.is_empty() {
            data.extend(FIRST_PAGE_OFFSET)?;
            let header_block = ManagerHeader::new();
            let mut writer = data.get_writer(0, FIRST_PAGE_OFFSET as usize)?;
            disk::encode_data_file_header(&mut writer)?;
            header_block.encode(&mut writer)?;
            writer.commit()?;
            info!("created new store in {}", dir.display());

            return Ok(Self {
                data,
                wal,
                cache: PageCache::new(),
                node_pages: DataPageCollection::new(),
                item_pages: DataPageCollection::new(),
                item_key_pages: DataPageCollection::new(),
                header_block,
                items_by_key: HashMap::new(),
                keys_by_item: HashMap::new(),
                next_transaction_id: 1,
                open_rollback,
            });
        }

        let mut reader = data.get_reader(0, FIRST_PAGE_OFFSET as usize)?;
        disk::decode_data_file_header(&mut reader)?;
        let header_block = ManagerHeader::decode(&mut reader)?;
        drop(reader);

        // Headers stay cached for the lifetime of the store.
        let cache = PageCache::new();
        for page_number in 0..header_block.page_count {
            let mut reader = data.get_reader(page_offset(page_number), PAGE_HEADER_SIZE)?;
            let header = PageHeader::decode(page_number, &mut reader)?;
            cache.cache_header(Arc::new(RwLock::new(header)));
        }

        let page_count = header_block.page_count;
        let node_pages = restore_chain(&cache, header_block.node_chain_first, page_count)?;
        let item_pages = restore_chain(&cache, header_block.item_chain_first, page_count)?;
        let item_key_pages = restore_chain(&cache, header_block.item_key_chain_first, page_count)?;
        debug!(
            "opened store: {} pages ({} node, {} item, {} item-key)",
            page_count,
            node_pages.len(),
            item_pages.len(),
            item_key_pages.len()
        );

        let mut manager = Self {
            data,
            wal,
            cache,
            node_pages,
            item_pages,
            item_key_pages,
            header_block,
            items_by_key: HashMap::new(),
            keys_by_item: HashMap::new(),
            next_transaction_id: 1,
            open_rollback,
        };
        manager.rebuild_item_catalog()?;
        Ok(manager)
    }

    /// What recovery found and did when this store was opened.
    pub fn open_rollback_outcome(&self) -> RollbackOutcome {
        self.open_rollback
    }

    pub fn page_count(&self) -> u32 {
        self.header_block.page_count
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    fn collection(&self, page_type: PageType) -> &DataPageCollection {
        match page_type {
            PageType::NodeReference => &self.node_pages,
            PageType::ItemReference => &self.item_pages,
            PageType::ItemKey => &self.item_key_pages,
        }
    }

    fn collection_mut(&mut self, page_type: PageType) -> &mut DataPageCollection {
        match page_type {
            PageType::NodeReference => &mut self.node_pages,
            PageType::ItemReference => &mut self.item_pages,
            PageType::ItemKey => &mut self.item_key_pages,
        }
    }

    fn update_chain_heads(&mut self) {
        self.header_block.node_chain_first = self.node_pages.first_page_number();
        self.header_block.item_chain_first = self.item_pages.first_page_number();
        self.header_block.item_key_chain_first = self.item_key_pages.first_page_number();
    }

    fn begin_transaction(&mut self) -> StorageResult<TransactionLog> {
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id += 1;
        TransactionLog::begin(
            transaction_id,
            self.header_block.page_count,
            Arc::clone(&self.wal),
            Arc::clone(&self.data),
        )
    }

    /// Logs the collected before-images, applies the transaction's writes
    /// to the data file, and marks the log committed.
    fn commit(&mut self, mut txn: TransactionLog) -> StorageResult<()> {
        txn.log_existing_data_for_affected_pages()?;

        if txn.page_manager_header_written() {
            let mut writer = self
                .data
                .get_writer(MANAGER_HEADER_OFFSET, MANAGER_HEADER_SIZE)?;
            self.header_block.encode(&mut writer)?;
            writer.commit()?;
        }

        let full_flush: Vec<u32> = txn
            .created_page_numbers()
            .chain(txn.body_affected_page_numbers())
            .collect();
        for &page_number in &full_flush {
            if let Some(page) = txn.try_get_page(page_number) {
                self.flush_page(&page)?;
            }
        }
        for page_number in txn.header_affected_page_numbers() {
            if full_flush.contains(&page_number) {
                continue;
            }
            self.flush_page_header(page_number)?;
        }

        txn.mark_as_committed()
    }

    fn flush_page(&self, page: &SharedDataPage) -> StorageResult<()> {
        let page = page.read();
        let size = page.current_size_bytes();
        let mut writer = self.data.get_writer(page_offset(page.page_number()), size)?;
        page.encode(&mut writer)?;
        writer.commit()
    }

    fn flush_page_header(&self, page_number: u32) -> StorageResult<()> {
        let header = self.cache.get_header(page_number)?;
        let mut writer = self
            .data
            .get_writer(page_offset(page_number), PAGE_HEADER_SIZE)?;
        header.read().encode(&mut writer)?;
        writer.commit()
    }

    fn load_page(&self, header: &SharedPageHeader) -> StorageResult<SharedDataPage> {
        let data = &self.data;
        self.cache.get_cached_page(header, |h| {
            let (page_number, size) = {
                let h = h.read();
                (h.page_number, h.current_size_bytes as usize)
            };
            let mut reader = data.get_reader(page_offset(page_number), size)?;
            DataPage::decode(Arc::clone(h), &mut reader)
        })
    }

    fn load_page_by_number(&self, page_number: u32) -> StorageResult<SharedDataPage> {
        let header = self.cache.get_header(page_number)?;
        self.load_page(&header)
    }

    /// Allocates a fresh page slot, links it into its category's chain
    /// (after `after`, or at the end of the chain), and registers it with
    /// the transaction.
    fn allocate_page(
        &mut self,
        page_type: PageType,
        txn: &mut TransactionLog,
        after: Option<u32>,
    ) -> StorageResult<SharedDataPage> {
        let page_number = self.header_block.page_count;
        self.header_block.page_count += 1;
        self.data
            .extend(page_offset(page_number) + PAGE_SIZE as u64)?;

        let page = Arc::new(RwLock::new(DataPage::new(page_type, page_number)));
        let header = page.read().shared_header();
        self.cache.cache_header(Arc::clone(&header));
        self.cache.cache_page(Arc::clone(&page));

        {
            let collection = self.collection_mut(page_type);
            match after {
                Some(previous) => collection.insert_after(previous, Arc::clone(&header))?,
                None => collection.insert_last(Arc::clone(&header)),
            }
        }
        self.update_chain_heads();

        txn.mark_page_manager_header_written();
        txn.register_affected_page(&page, AffectedLevel::Created);

        // Linking mutated the neighbors' headers.
        let (previous, next) = {
            let h = header.read();
            (h.previous_page, h.next_page)
        };
        for neighbor in previous.into_iter().chain(next) {
            let neighbor_page = self.load_page_by_number(neighbor)?;
            txn.register_affected_page(&neighbor_page, AffectedLevel::Header);
        }

        debug!("allocated page {} ({:?})", page_number, page_type);
        Ok(page)
    }

    /// Splits an overflowing page: allocates a new page right after it in
    /// the chain and moves the upper half of the entries across.
    fn split_page(
        &mut self,
        page: &SharedDataPage,
        txn: &mut TransactionLog,
    ) -> StorageResult<SharedDataPage> {
        let (page_number, page_type, entry_count) = {
            let p = page.read();
            (p.page_number(), p.page_type(), p.entry_count())
        };
        let new_page = self.allocate_page(page_type, txn, Some(page_number))?;

        let keep = entry_count / 2;
        let mut seen = 0usize;
        {
            let mut source = page.write();
            let mut dest = new_page.write();
            dest.move_entries_from(&mut source, |_| {
                seen += 1;
                seen > keep
            })?;
        }
        txn.register_affected_page(page, AffectedLevel::Body);
        txn.register_affected_page(&new_page, AffectedLevel::Body);
        debug!(
            "split page {} into page {}",
            page_number,
            new_page.read().page_number()
        );
        Ok(new_page)
    }

    /// Inserts one entry, splitting the target page when it overflows.
    fn insert_entry(&mut self, entry: Entry) -> StorageResult<()> {
        let page_type = entry.page_type();
        let owner_id = entry.owner_id();
        let mut txn = self.begin_transaction()?;

        let closest = self
            .collection(page_type)
            .find_closest_page_for_entry(owner_id);
        let target = match closest {
            Some(header) => self.load_page(&header)?,
            None => self.allocate_page(page_type, &mut txn, None)?,
        };
        txn.register_affected_page(&target, AffectedLevel::Body);

        // Bind each attempt's result so the page write guard is released
        // before the overflow handling runs.
        let attempt = { target.write().add_entry(entry.clone()) };
        match attempt {
            Ok(()) => {}
            Err(StorageError::EntryWillNotFit { .. }) => {
                let upper = self.split_page(&target, &mut txn)?;
                let boundary = target.read().shared_header().read().last_entry_id;
                let (first_choice, fallback) = if owner_id <= boundary {
                    (&target, &upper)
                } else {
                    (&upper, &target)
                };
                let retry = { first_choice.write().add_entry(entry.clone()) };
                match retry {
                    Ok(()) => {}
                    Err(StorageError::EntryWillNotFit { .. }) => {
                        fallback.write().add_entry(entry)?;
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }

        self.commit(txn)
    }

    /// Removes every entry for `owner_id` matching `predicate` across the
    /// pages that may hold it; unlinks pages left empty.
    fn remove_matching(
        &mut self,
        page_type: PageType,
        owner_id: u32,
        predicate: impl Fn(&Entry) -> bool,
    ) -> StorageResult<bool> {
        let mut txn = self.begin_transaction()?;
        let headers = self.collection(page_type).find_pages_for_entry(owner_id);

        let mut removed_any = false;
        let mut emptied = Vec::new();
        for header in headers {
            let page = self.load_page(&header)?;
            if page.write().remove_entries(&predicate) {
                removed_any = true;
                txn.register_affected_page(&page, AffectedLevel::Body);
                if page.read().entry_count() == 0 {
                    emptied.push(page.read().page_number());
                }
            }
        }
        for page_number in emptied {
            self.unlink_page(page_type, page_number, &mut txn)?;
        }

        self.commit(txn)?;
        Ok(removed_any)
    }

    /// Unlinks an emptied page from its chain. The slot itself is not
    /// reused; only the chain forgets it.
    fn unlink_page(
        &mut self,
        page_type: PageType,
        page_number: u32,
        txn: &mut TransactionLog,
    ) -> StorageResult<()> {
        let header = self.cache.get_header(page_number)?;
        let (previous, next) = {
            let h = header.read();
            (h.previous_page, h.next_page)
        };

        self.collection_mut(page_type).remove(page_number);
        self.update_chain_heads();
        txn.mark_page_manager_header_written();

        for neighbor in previous.into_iter().chain(next) {
            let neighbor_page = self.load_page_by_number(neighbor)?;
            txn.register_affected_page(&neighbor_page, AffectedLevel::Header);
        }

        // The body is gone from every chain; no reason to keep it cached.
        self.cache.purge_pages(&[page_number]);
        debug!("unlinked empty page {}", page_number);
        Ok(())
    }

    /// Persists the header block alone, as its own transaction.
    fn persist_header_block(&mut self) -> StorageResult<()> {
        let mut txn = self.begin_transaction()?;
        txn.mark_page_manager_header_written();
        self.commit(txn)
    }

    fn rebuild_item_catalog(&mut self) -> StorageResult<()> {
        let headers: Vec<SharedPageHeader> = self.item_key_pages.iter().cloned().collect();
        for header in headers {
            let page = self.load_page(&header)?;
            let page = page.read();
            for entry in page.entries() {
                if let Entry::ItemKey { item_id, key } = entry {
                    self.items_by_key.insert(key.clone(), *item_id);
                    self.keys_by_item.insert(*item_id, key.clone());
                }
            }
        }
        Ok(())
    }
}

fn restore_chain(
    cache: &PageCache,
    first: Option<u32>,
    page_count: u32,
) -> StorageResult<DataPageCollection> {
    let mut headers = Vec::new();
    let mut cursor = first;
    while let Some(page_number) = cursor {
        if headers.len() > page_count as usize {
            return Err(StorageError::CorruptPage {
                detail: format!("page chain starting at {first:?} contains a cycle"),
            });
        }
        let header = cache.get_header(page_number)?;
        cursor = header.read().next_page;
        headers.push(header);
    }
    Ok(DataPageCollection::from_restored(headers))
}

impl EntryManager for PersistedEntryManager {
    fn allocate_new_item_id(&mut self) -> StorageResult<u32> {
        let id = self.header_block.next_item_id;
        self.header_block.next_item_id += 1;
        self.persist_header_block()?;
        Ok(id)
    }

    fn allocate_new_index_node_id(&mut self) -> StorageResult<u32> {
        let id = self.header_block.next_node_id;
        self.header_block.next_node_id += 1;
        self.persist_header_block()?;
        Ok(id)
    }

    fn get_index_node_entries(&mut self, node_id: u32) -> StorageResult<Vec<Entry>> {
        let mut entries = Vec::new();
        for page_type in [PageType::NodeReference, PageType::ItemReference] {
            for header in self.collection(page_type).find_pages_for_entry(node_id) {
                let page = self.load_page(&header)?;
                let page = page.read();
                entries.extend(page.entries_for_owner(node_id).cloned());
            }
        }
        Ok(entries)
    }

    fn add_index_node_reference_entry(
        &mut self,
        owner_id: u32,
        child_node_id: u32,
        matched_char: char,
    ) -> StorageResult<()> {
        self.insert_entry(Entry::NodeReference {
            owner_id,
            child_node_id,
            matched_char,
        })
    }

    fn remove_index_node_reference_entry(
        &mut self,
        owner_id: u32,
        child_node_id: u32,
        matched_char: char,
    ) -> StorageResult<()> {
        self.remove_matching(PageType::NodeReference, owner_id, |entry| {
            matches!(
                entry,
                Entry::NodeReference {
                    owner_id: o,
                    child_node_id: c,
                    matched_char: m,
                } if *o == owner_id && *c == child_node_id && *m == matched_char
            )
        })?;
        Ok(())
    }

    fn add_node_item_entry(
        &mut self,
        owner_id: u32,
        item_id: u32,
        word_position: u32,
    ) -> StorageResult<()> {
        self.insert_entry(Entry::ItemReference {
            owner_id,
            item_id,
            word_position,
        })
    }

    fn remove_node_item_entry(
        &mut self,
        owner_id: u32,
        item_id: u32,
        word_position: u32,
    ) -> StorageResult<()> {
        self.remove_matching(PageType::ItemReference, owner_id, |entry| {
            matches!(
                entry,
                Entry::ItemReference {
                    owner_id: o,
                    item_id: i,
                    word_position: w,
                } if *o == owner_id && *i == item_id && *w == word_position
            )
        })?;
        Ok(())
    }

    fn add_item_index_entry(&mut self, item_id: u32, key: &str) -> StorageResult<()> {
        self.insert_entry(Entry::ItemKey {
            item_id,
            key: key.to_string(),
        })?;
        self.items_by_key.insert(key.to_string(), item_id);
        self.keys_by_item.insert(item_id, key.to_string());
        Ok(())
    }

    fn remove_item_entry(&mut self, item_id: u32) -> StorageResult<()> {
        let removed = self.remove_matching(PageType::ItemKey, item_id, |entry| {
            matches!(entry, Entry::ItemKey { item_id: i, .. } if *i == item_id)
        })?;
        if !removed {
            return Err(StorageError::ItemNotFound { item_id });
        }
        if let Some(key) = self.keys_by_item.remove(&item_id) {
            self.items_by_key.remove(&key);
        }
        Ok(())
    }

    fn item_indexed(&self, key: &str) -> bool {
        self.items_by_key.contains_key(key)
    }

    fn get_id_for_item(&self, key: &str) -> Option<u32> {
        self.items_by_key.get(key).copied()
    }

    fn get_item_for_id(&self, item_id: u32) -> Option<String> {
        self.keys_by_item.get(&item_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn node_entry(owner_id: u32, child_node_id: u32, matched_char: char) -> Entry {
        Entry::NodeReference {
            owner_id,
            child_node_id,
            matched_char,
        }
    }

    #[test]
    fn test_create_and_reopen_empty_store() {
        let dir = tempdir().unwrap();

        {
            let manager = PersistedEntryManager::open(dir.path()).unwrap();
            assert_eq!(manager.page_count(), 0);
            assert_eq!(manager.open_rollback_outcome(), RollbackOutcome::Clean);
        }

        let manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert_eq!(manager.page_count(), 0);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();

        {
            let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
            manager.add_index_node_reference_entry(0, 1, 'c').unwrap();
            manager.add_index_node_reference_entry(0, 2, 'd').unwrap();
            manager.add_node_item_entry(1, 10, 0).unwrap();
        }

        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert_eq!(manager.page_count(), 2);

        let root_entries = manager.get_index_node_entries(0).unwrap();
        assert_eq!(
            root_entries,
            vec![node_entry(0, 1, 'c'), node_entry(0, 2, 'd')]
        );
        let child_entries = manager.get_index_node_entries(1).unwrap();
        assert_eq!(
            child_entries,
            vec![Entry::ItemReference {
                owner_id: 1,
                item_id: 10,
                word_position: 0
            }]
        );
    }

    #[test]
    fn test_remove_entries() {
        let dir = tempdir().unwrap();
        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        manager.add_index_node_reference_entry(0, 1, 'a').unwrap();
        manager.add_index_node_reference_entry(0, 2, 'b').unwrap();

        manager.remove_index_node_reference_entry(0, 1, 'a').unwrap();

        let entries = manager.get_index_node_entries(0).unwrap();
        assert_eq!(entries, vec![node_entry(0, 2, 'b')]);
    }

    #[test]
    fn test_id_allocation_is_monotonic_and_durable() {
        let dir = tempdir().unwrap();

        {
            let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
            assert_eq!(manager.allocate_new_index_node_id().unwrap(), 1);
            assert_eq!(manager.allocate_new_index_node_id().unwrap(), 2);
            assert_eq!(manager.allocate_new_item_id().unwrap(), 1);
        }

        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert_eq!(manager.allocate_new_index_node_id().unwrap(), 3);
        assert_eq!(manager.allocate_new_item_id().unwrap(), 2);
    }

    #[test]
    fn test_item_catalog_round_trip() {
        let dir = tempdir().unwrap();

        {
            let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
            manager.add_item_index_entry(1, "docs/a.txt").unwrap();
            manager.add_item_index_entry(2, "docs/b.txt").unwrap();
            assert!(manager.item_indexed("docs/a.txt"));
        }

        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert!(manager.item_indexed("docs/a.txt"));
        assert_eq!(manager.get_id_for_item("docs/b.txt"), Some(2));
        assert_eq!(manager.get_item_for_id(1), Some("docs/a.txt".to_string()));

        manager.remove_item_entry(1).unwrap();
        assert!(!manager.item_indexed("docs/a.txt"));
        assert!(matches!(
            manager.remove_item_entry(1),
            Err(StorageError::ItemNotFound { item_id: 1 })
        ));
    }

    #[test]
    fn test_page_split_on_overflow() {
        let dir = tempdir().unwrap();
        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();

        // A reference page holds floor((8192 - 21) / 12) = 680 entries.
        for i in 0..700u32 {
            manager.add_index_node_reference_entry(i, i + 1, 'x').unwrap();
        }
        assert_eq!(manager.page_count(), 2);
        assert_eq!(manager.node_pages.len(), 2);

        // Every entry is still reachable after the split.
        for i in [0u32, 339, 340, 699] {
            let entries = manager.get_index_node_entries(i).unwrap();
            assert_eq!(entries, vec![node_entry(i, i + 1, 'x')]);
        }
    }

    #[test]
    fn test_split_state_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
            for i in 0..700u32 {
                manager.add_index_node_reference_entry(i, i + 1, 'x').unwrap();
            }
        }

        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert_eq!(manager.node_pages.len(), 2);
        for i in [0u32, 350, 699] {
            assert_eq!(
                manager.get_index_node_entries(i).unwrap(),
                vec![node_entry(i, i + 1, 'x')]
            );
        }
    }

    #[test]
    fn test_emptied_page_is_unlinked() {
        let dir = tempdir().unwrap();
        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();
        manager.add_node_item_entry(5, 1, 0).unwrap();
        assert_eq!(manager.item_pages.len(), 1);

        manager.remove_node_item_entry(5, 1, 0).unwrap();
        assert_eq!(manager.item_pages.len(), 0);
        // The slot still exists; only the chain forgets the page.
        assert_eq!(manager.page_count(), 1);

        // And the empty chain head survives a reopen.
        drop(manager);
        let manager = PersistedEntryManager::open(dir.path()).unwrap();
        assert_eq!(manager.item_pages.len(), 0);
    }

    #[test]
    fn test_mixed_page_types_use_separate_chains() {
        let dir = tempdir().unwrap();
        let mut manager = PersistedEntryManager::open(dir.path()).unwrap();

        manager.add_index_node_reference_entry(0, 1, 'a').unwrap();
        manager.add_node_item_entry(1, 7, 2).unwrap();
        manager.add_item_index_entry(7, "key").unwrap();

        assert_eq!(manager.page_count(), 3);
        assert_eq!(manager.node_pages.len(), 1);
        assert_eq!(manager.item_pages.len(), 1);
        assert_eq!(manager.item_key_pages.len(), 1);
    }
}
