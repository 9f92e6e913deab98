//! Ordered collection of the page headers forming one chain.
//!
//! Every mutation repairs the neighboring headers' `previous_page` /
//! `next_page` links. The collection does not partition entry-id space
//! exactly: after a split, entries for one owner can spill across several
//! pages, so callers get both a single-result lookup and a multi-result
//! lookup over the header ranges.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::SharedPageHeader;

#[derive(Default)]
pub struct DataPageCollection {
    headers: Vec<SharedPageHeader>,
}

impl DataPageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the collection from headers restored off disk, already in
    /// chain order.
    pub fn from_restored(headers: Vec<SharedPageHeader>) -> Self {
        Self { headers }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedPageHeader> {
        self.headers.iter()
    }

    pub fn first(&self) -> Option<&SharedPageHeader> {
        self.headers.first()
    }

    pub fn last(&self) -> Option<&SharedPageHeader> {
        self.headers.last()
    }

    pub fn first_page_number(&self) -> Option<u32> {
        self.headers.first().map(|h| h.read().page_number)
    }

    pub fn contains(&self, page_number: u32) -> bool {
        self.position(page_number).is_some()
    }

    pub fn insert_first(&mut self, header: SharedPageHeader) {
        self.insert_at(0, header);
    }

    pub fn insert_last(&mut self, header: SharedPageHeader) {
        self.insert_at(self.headers.len(), header);
    }

    /// Inserts `header` right after the page numbered `after_page`.
    pub fn insert_after(&mut self, after_page: u32, header: SharedPageHeader) -> StorageResult<()> {
        let position = self.position(after_page).ok_or(
            StorageError::PageNotInCollection {
                page_number: after_page,
            },
        )?;
        self.insert_at(position + 1, header);
        Ok(())
    }

    /// Unlinks the page from the chain; returns whether it was present.
    pub fn remove(&mut self, page_number: u32) -> bool {
        let Some(position) = self.position(page_number) else {
            return false;
        };
        let removed = self.headers.remove(position);

        let previous = removed.read().previous_page;
        let next = removed.read().next_page;
        if position > 0 {
            self.headers[position - 1].write().next_page = next;
        }
        if position < self.headers.len() {
            self.headers[position].write().previous_page = previous;
        }

        let mut header = removed.write();
        header.previous_page = None;
        header.next_page = None;
        true
    }

    /// The nearest page whose `[first_entry_id, last_entry_id]` range could
    /// contain `entry_id`.
    ///
    /// Scans in chain order and returns the first page whose high boundary
    /// reaches the id; an id on the boundary between two adjacent pages
    /// therefore resolves to the earlier one. An id beyond every range
    /// falls through to the last page.
    pub fn find_closest_page_for_entry(&self, entry_id: u32) -> Option<SharedPageHeader> {
        for header in &self.headers {
            if header.read().last_entry_id >= entry_id {
                return Some(header.clone());
            }
        }
        self.headers.last().cloned()
    }

    /// Every page whose range contains `entry_id`, in chain order.
    pub fn find_pages_for_entry(&self, entry_id: u32) -> Vec<SharedPageHeader> {
        self.headers
            .iter()
            .filter(|header| {
                let h = header.read();
                h.first_entry_id <= entry_id && entry_id <= h.last_entry_id
            })
            .cloned()
            .collect()
    }

    fn position(&self, page_number: u32) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.read().page_number == page_number)
    }

    fn insert_at(&mut self, position: usize, header: SharedPageHeader) {
        {
            let mut h = header.write();
            h.previous_page = position
                .checked_sub(1)
                .map(|p| self.headers[p].read().page_number);
            h.next_page = self.headers.get(position).map(|n| n.read().page_number);
        }

        let page_number = header.read().page_number;
        if position > 0 {
            self.headers[position - 1].write().next_page = Some(page_number);
        }
        if let Some(next) = self.headers.get(position) {
            next.write().previous_page = Some(page_number);
        }
        self.headers.insert(position, header);
    }
}
