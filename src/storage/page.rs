//! Pages: the fixed-size unit of on-disk storage.
//!
//! A page is a 21-byte header plus a variable count of entries kept sorted
//! ascending by owner id. Pages of one category are linked into a
//! doubly-linked chain through their headers; [`collection`] tracks one
//! such chain.

pub mod collection;
pub mod entry;
pub mod header;

use parking_lot::RwLock;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::storage::disk::PAGE_SIZE;
use crate::storage::error::{StorageError, StorageResult};

pub use collection::DataPageCollection;
pub use entry::Entry;
pub use header::{PageHeader, PAGE_HEADER_SIZE};

/// Category of a page; each page holds entries of its category only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    NodeReference,
    ItemReference,
    ItemKey,
}

impl PageType {
    pub fn as_u8(self) -> u8 {
        match self {
            PageType::NodeReference => 1,
            PageType::ItemReference => 2,
            PageType::ItemKey => 3,
        }
    }

    pub fn from_u8(raw: u8) -> StorageResult<Self> {
        match raw {
            1 => Ok(PageType::NodeReference),
            2 => Ok(PageType::ItemReference),
            3 => Ok(PageType::ItemKey),
            other => Err(StorageError::CorruptPage {
                detail: format!("unknown page type {other}"),
            }),
        }
    }
}

/// A page header shared between the page, the cache and the chain
/// collection, so a mutation through any of them is seen by all.
pub type SharedPageHeader = Arc<RwLock<PageHeader>>;

/// A cached page body, shared the same way.
pub type SharedDataPage = Arc<RwLock<DataPage>>;

/// A page body: the shared header plus the in-memory entry list.
pub struct DataPage {
    header: SharedPageHeader,
    entries: Vec<Entry>,
}

impl DataPage {
    pub fn new(page_type: PageType, page_number: u32) -> Self {
        Self {
            header: Arc::new(RwLock::new(PageHeader::new(page_type, page_number))),
            entries: Vec::new(),
        }
    }

    /// Rebuilds a page around a header restored from disk.
    pub fn from_parts(header: SharedPageHeader, entries: Vec<Entry>) -> Self {
        Self { header, entries }
    }

    pub fn shared_header(&self) -> SharedPageHeader {
        Arc::clone(&self.header)
    }

    pub fn page_number(&self) -> u32 {
        self.header.read().page_number
    }

    pub fn page_type(&self) -> PageType {
        self.header.read().page_type
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn current_size_bytes(&self) -> usize {
        self.header.read().current_size_bytes as usize
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_for_owner(&self, owner_id: u32) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |e| e.owner_id() == owner_id)
    }

    /// Inserts `entry` at its sorted position.
    ///
    /// An entry whose owner id ties the page's low boundary goes in front
    /// of the existing same-id entries; one tying the high boundary goes
    /// after them. This keeps a stable lowest-id-first read order without
    /// re-sorting.
    pub fn add_entry(&mut self, entry: Entry) -> StorageResult<()> {
        let mut header = self.header.write();

        if entry.page_type() != header.page_type {
            return Err(StorageError::EntryKindMismatch {
                page_type: header.page_type,
            });
        }

        let entry_size = entry.size_bytes();
        let current_size = header.current_size_bytes as usize;
        if current_size + entry_size > PAGE_SIZE {
            return Err(StorageError::EntryWillNotFit {
                page_number: header.page_number,
                entry_size,
                current_size,
                limit: PAGE_SIZE,
            });
        }

        let owner_id = entry.owner_id();
        let index = if self.entries.is_empty() {
            0
        } else if owner_id <= header.first_entry_id {
            0
        } else if owner_id >= header.last_entry_id {
            self.entries.len()
        } else {
            self.entries
                .iter()
                .position(|e| e.owner_id() > owner_id)
                .unwrap_or(self.entries.len())
        };
        self.entries.insert(index, entry);

        header.current_size_bytes = (current_size + entry_size) as u16;
        refresh_bounds(&mut header, &self.entries);
        Ok(())
    }

    /// Removes every entry matching `predicate`; returns whether any were
    /// removed.
    pub fn remove_entries(&mut self, predicate: impl Fn(&Entry) -> bool) -> bool {
        let mut removed_bytes = 0usize;
        self.entries.retain(|e| {
            if predicate(e) {
                removed_bytes += e.size_bytes();
                false
            } else {
                true
            }
        });

        if removed_bytes == 0 {
            return false;
        }

        let mut header = self.header.write();
        header.current_size_bytes -= removed_bytes as u16;
        refresh_bounds(&mut header, &self.entries);
        true
    }

    /// Moves every entry of `other` matching `predicate` to the end of this
    /// page's entry list, adjusting both pages' accounting.
    pub fn move_entries_from(
        &mut self,
        other: &mut DataPage,
        mut predicate: impl FnMut(&Entry) -> bool,
    ) -> StorageResult<()> {
        if Arc::ptr_eq(&self.header, &other.header) {
            return Err(StorageError::MoveFromSelf {
                page_number: self.page_number(),
            });
        }
        if other.page_type() != self.page_type() {
            return Err(StorageError::EntryKindMismatch {
                page_type: self.page_type(),
            });
        }

        let flags: Vec<bool> = other.entries.iter().map(|e| predicate(e)).collect();
        let moved_bytes: usize = other
            .entries
            .iter()
            .zip(&flags)
            .filter(|(_, &selected)| selected)
            .map(|(e, _)| e.size_bytes())
            .sum();

        {
            let mut header = self.header.write();
            let current_size = header.current_size_bytes as usize;
            if current_size + moved_bytes > PAGE_SIZE {
                return Err(StorageError::EntryWillNotFit {
                    page_number: header.page_number,
                    entry_size: moved_bytes,
                    current_size,
                    limit: PAGE_SIZE,
                });
            }

            let mut kept = Vec::with_capacity(other.entries.len());
            for (entry, selected) in other.entries.drain(..).zip(flags) {
                if selected {
                    self.entries.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            other.entries = kept;

            header.current_size_bytes = (current_size + moved_bytes) as u16;
            refresh_bounds(&mut header, &self.entries);
        }
        {
            let mut other_header = other.header.write();
            other_header.current_size_bytes -= moved_bytes as u16;
            refresh_bounds(&mut other_header, &other.entries);
        }
        Ok(())
    }

    /// Serializes the header followed by the packed entries.
    pub fn encode<W: Write>(&self, writer: &mut W) -> StorageResult<()> {
        self.header.read().encode(writer)?;
        for entry in &self.entries {
            entry.encode(writer)?;
        }
        Ok(())
    }

    /// Rebuilds a page body from a reader positioned at the start of the
    /// page slot, trusting the already-loaded `header` for the entry count.
    pub fn decode<R: Read>(header: SharedPageHeader, reader: &mut R) -> StorageResult<Self> {
        let (page_type, entry_count) = {
            let h = header.read();
            (h.page_type, h.entry_count)
        };

        let mut skipped = [0u8; PAGE_HEADER_SIZE];
        reader.read_exact(&mut skipped)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            entries.push(Entry::decode(page_type, reader)?);
        }
        Ok(Self { header, entries })
    }
}

fn refresh_bounds(header: &mut PageHeader, entries: &[Entry]) {
    header.entry_count = entries.len() as u16;
    match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => {
            header.first_entry_id = first.owner_id();
            header.last_entry_id = last.owner_id();
        }
        _ => {
            header.first_entry_id = 0;
            header.last_entry_id = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_entry(owner_id: u32, child_node_id: u32, matched_char: char) -> Entry {
        Entry::NodeReference {
            owner_id,
            child_node_id,
            matched_char,
        }
    }

    fn owner_ids(page: &DataPage) -> Vec<u32> {
        page.entries().iter().map(|e| e.owner_id()).collect()
    }

    #[test]
    fn test_add_entry_keeps_sort_order() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        for owner in [5, 1, 3, 9, 2] {
            page.add_entry(node_entry(owner, owner * 10, 'a')).unwrap();
        }

        assert_eq!(owner_ids(&page), vec![1, 2, 3, 5, 9]);
        let header = page.shared_header();
        assert_eq!(header.read().first_entry_id, 1);
        assert_eq!(header.read().last_entry_id, 9);
        assert_eq!(header.read().entry_count, 5);
    }

    #[test]
    fn test_size_accounting() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        page.add_entry(node_entry(1, 2, 'a')).unwrap();
        page.add_entry(node_entry(2, 3, 'b')).unwrap();

        assert_eq!(page.current_size_bytes(), PAGE_HEADER_SIZE + 2 * 12);
    }

    #[test]
    fn test_tie_at_low_boundary_goes_first() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        page.add_entry(node_entry(2, 5, 'a')).unwrap();
        page.add_entry(Entry::ItemReference {
            owner_id: 0,
            item_id: 0,
            word_position: 0,
        })
        .unwrap_err();
        page.add_entry(node_entry(4, 2, '\t')).unwrap();

        // A new entry tying the low boundary lands in front of its peers.
        page.add_entry(node_entry(2, 7, '\u{16}')).unwrap();

        assert_eq!(owner_ids(&page), vec![2, 2, 4]);
        let referenced: Vec<u32> = page.entries().iter().map(|e| e.referenced_id()).collect();
        assert_eq!(referenced, vec![7, 5, 2]);
    }

    #[test]
    fn test_tie_at_high_boundary_goes_last() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        page.add_entry(node_entry(2, 5, 'a')).unwrap();
        page.add_entry(node_entry(4, 2, 'b')).unwrap();

        page.add_entry(node_entry(4, 9, 'c')).unwrap();

        assert_eq!(owner_ids(&page), vec![2, 4, 4]);
        let referenced: Vec<u32> = page.entries().iter().map(|e| e.referenced_id()).collect();
        assert_eq!(referenced, vec![5, 2, 9]);
    }

    #[test]
    fn test_add_entry_rejects_overflow() {
        let mut page = DataPage::new(PageType::ItemKey, 0);
        let key = "k".repeat(4000);
        page.add_entry(Entry::ItemKey {
            item_id: 1,
            key: key.clone(),
        })
        .unwrap();
        page.add_entry(Entry::ItemKey {
            item_id: 2,
            key: key.clone(),
        })
        .unwrap();

        let result = page.add_entry(Entry::ItemKey { item_id: 3, key });
        assert!(matches!(result, Err(StorageError::EntryWillNotFit { .. })));
        assert_eq!(page.entry_count(), 2);
    }

    #[test]
    fn test_remove_entries_inverse_law() {
        let mut page = DataPage::new(PageType::ItemReference, 0);
        let entries: Vec<Entry> = (1..=4)
            .map(|i| Entry::ItemReference {
                owner_id: i,
                item_id: i * 7,
                word_position: i,
            })
            .collect();
        for entry in &entries {
            page.add_entry(entry.clone()).unwrap();
        }

        let size_before = page.current_size_bytes();
        let header = page.shared_header();
        let bounds_before = (header.read().first_entry_id, header.read().last_entry_id);

        assert!(page.remove_entries(|e| e.owner_id() % 2 == 0));
        assert_eq!(owner_ids(&page), vec![1, 3]);

        for entry in entries.iter().filter(|e| e.owner_id() % 2 == 0) {
            page.add_entry(entry.clone()).unwrap();
        }
        assert_eq!(page.current_size_bytes(), size_before);
        assert_eq!(
            (header.read().first_entry_id, header.read().last_entry_id),
            bounds_before
        );
        assert_eq!(header.read().entry_count, 4);
    }

    #[test]
    fn test_remove_all_entries_zeroes_bounds() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        page.add_entry(node_entry(3, 1, 'a')).unwrap();

        assert!(page.remove_entries(|_| true));
        assert!(!page.remove_entries(|_| true));

        let header = page.shared_header();
        assert_eq!(header.read().first_entry_id, 0);
        assert_eq!(header.read().last_entry_id, 0);
        assert_eq!(header.read().entry_count, 0);
        assert_eq!(page.current_size_bytes(), PAGE_HEADER_SIZE);
    }

    #[test]
    fn test_move_entries_from() {
        let mut source = DataPage::new(PageType::NodeReference, 0);
        let mut target = DataPage::new(PageType::NodeReference, 1);
        for owner in 1..=6 {
            source.add_entry(node_entry(owner, owner, 'a')).unwrap();
        }

        target
            .move_entries_from(&mut source, |e| e.owner_id() > 3)
            .unwrap();

        assert_eq!(owner_ids(&source), vec![1, 2, 3]);
        assert_eq!(owner_ids(&target), vec![4, 5, 6]);
        assert_eq!(source.current_size_bytes(), PAGE_HEADER_SIZE + 3 * 12);
        assert_eq!(target.current_size_bytes(), PAGE_HEADER_SIZE + 3 * 12);

        let target_header = target.shared_header();
        assert_eq!(target_header.read().first_entry_id, 4);
        assert_eq!(target_header.read().last_entry_id, 6);
    }

    #[test]
    fn test_move_entries_from_self_fails() {
        let mut page = DataPage::new(PageType::NodeReference, 0);
        page.add_entry(node_entry(1, 1, 'a')).unwrap();

        let header = page.shared_header();
        let mut alias = DataPage::from_parts(header, Vec::new());
        let result = alias.move_entries_from(&mut page, |_| true);
        assert!(matches!(result, Err(StorageError::MoveFromSelf { .. })));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut page = DataPage::new(PageType::ItemKey, 2);
        page.add_entry(Entry::ItemKey {
            item_id: 1,
            key: "alpha".into(),
        })
        .unwrap();
        page.add_entry(Entry::ItemKey {
            item_id: 2,
            key: "beta".into(),
        })
        .unwrap();

        let mut bytes = Vec::new();
        page.encode(&mut bytes).unwrap();
        assert_eq!(bytes.len(), page.current_size_bytes());

        let restored_header = Arc::new(RwLock::new(
            PageHeader::decode(2, &mut bytes.as_slice()).unwrap(),
        ));
        let decoded = DataPage::decode(restored_header, &mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.entries(), page.entries());
    }
}
