//! Per-transaction bookkeeping of affected and created pages.
//!
//! One `TransactionLog` exists per in-flight write transaction. It captures
//! the page count and data-file extent at transaction start, collects the
//! page numbers the transaction touches, and drives the WAL writer with the
//! before-images those pages held on disk. Logging is a one-shot operation
//! per transaction.

use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::storage::disk::{
    page_offset, FileAccessor, MANAGER_HEADER_OFFSET, MANAGER_HEADER_SIZE,
};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageHeader, SharedDataPage, PAGE_HEADER_SIZE};
use crate::storage::wal::{LogEntryKind, LogFileAccessor, LogState};

/// How deeply a transaction touched a page. Levels are cumulative and
/// independent: a page can be created, header-affected, and body-affected
/// at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedLevel {
    Created,
    Header,
    Body,
}

pub struct TransactionLog {
    transaction_id: u64,
    page_count_at_start: u32,
    start_extent: u64,
    wal: Arc<Mutex<LogFileAccessor>>,
    data: Arc<FileAccessor>,
    created_pages: BTreeSet<u32>,
    header_affected_pages: BTreeSet<u32>,
    body_affected_pages: BTreeSet<u32>,
    pages: HashMap<u32, SharedDataPage>,
    page_manager_header_written: bool,
    transaction_complete: bool,
}

impl TransactionLog {
    /// Starts a transaction: captures the data file's current extent and
    /// initializes a fresh WAL for it.
    pub fn begin(
        transaction_id: u64,
        page_count: u32,
        wal: Arc<Mutex<LogFileAccessor>>,
        data: Arc<FileAccessor>,
    ) -> StorageResult<Self> {
        let start_extent = data.len();
        wal.lock().initialize_new_log(&data)?;
        debug!(
            "transaction {} started: {} pages, extent {}",
            transaction_id, page_count, start_extent
        );

        Ok(Self {
            transaction_id,
            page_count_at_start: page_count,
            start_extent,
            wal,
            data,
            created_pages: BTreeSet::new(),
            header_affected_pages: BTreeSet::new(),
            body_affected_pages: BTreeSet::new(),
            pages: HashMap::new(),
            page_manager_header_written: false,
            transaction_complete: false,
        })
    }

    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    pub fn page_count_at_start(&self) -> u32 {
        self.page_count_at_start
    }

    pub fn start_extent(&self) -> u64 {
        self.start_extent
    }

    pub fn is_complete(&self) -> bool {
        self.transaction_complete
    }

    pub fn page_manager_header_written(&self) -> bool {
        self.page_manager_header_written
    }

    /// Records that this transaction will rewrite the page manager's header
    /// block.
    pub fn mark_page_manager_header_written(&mut self) {
        self.page_manager_header_written = true;
    }

    /// Records `page` as affected at `level` and retains the page object
    /// for [`try_get_page`](Self::try_get_page).
    pub fn register_affected_page(&mut self, page: &SharedDataPage, level: AffectedLevel) {
        let page_number = page.read().page_number();
        match level {
            AffectedLevel::Created => self.created_pages.insert(page_number),
            AffectedLevel::Header => self.header_affected_pages.insert(page_number),
            AffectedLevel::Body => self.body_affected_pages.insert(page_number),
        };
        self.pages
            .entry(page_number)
            .or_insert_with(|| Arc::clone(page));
    }

    /// The page object supplied by any `register_affected_page` call this
    /// transaction, avoiding a redundant disk read within it.
    pub fn try_get_page(&self, page_number: u32) -> Option<SharedDataPage> {
        self.pages.get(&page_number).cloned()
    }

    pub fn created_page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.created_pages.iter().copied()
    }

    pub fn header_affected_page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.header_affected_pages.iter().copied()
    }

    pub fn body_affected_page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.body_affected_pages.iter().copied()
    }

    /// Writes every before-image this transaction needs into the WAL and
    /// closes the entry stream. One-shot: a second call fails.
    ///
    /// Created pages whose slot lies entirely beyond the transaction-start
    /// extent held no prior data and log nothing. Created pages whose slot
    /// overlaps the pre-existing extent log only the slot's old header: the
    /// old body is irrelevant because the page is being replaced. Remaining
    /// header-affected pages log their header bytes, and body-affected
    /// pages log the whole page as it stands on disk, superseding any
    /// narrower header-only image.
    pub fn log_existing_data_for_affected_pages(&mut self) -> StorageResult<()> {
        if self.transaction_complete {
            return Err(StorageError::TransactionAlreadyLogged);
        }
        let mut wal = self.wal.lock();

        if self.page_manager_header_written {
            wal.log_data_from(
                LogEntryKind::PageManagerHeader,
                &self.data,
                MANAGER_HEADER_OFFSET,
                MANAGER_HEADER_SIZE,
            )?;
        }

        for &page_number in &self.created_pages {
            let offset = page_offset(page_number);
            if offset >= self.start_extent {
                continue;
            }
            wal.log_data_from(LogEntryKind::PageHeader, &self.data, offset, PAGE_HEADER_SIZE)?;
        }

        for &page_number in &self.header_affected_pages {
            if self.created_pages.contains(&page_number)
                || self.body_affected_pages.contains(&page_number)
            {
                continue;
            }
            wal.log_data_from(
                LogEntryKind::PageHeader,
                &self.data,
                page_offset(page_number),
                PAGE_HEADER_SIZE,
            )?;
        }

        for &page_number in &self.body_affected_pages {
            if self.created_pages.contains(&page_number) {
                continue;
            }
            let on_disk_size = self.on_disk_page_size(page_number)?;
            wal.log_data_from(
                LogEntryKind::FullPage,
                &self.data,
                page_offset(page_number),
                on_disk_size,
            )?;
        }

        wal.end_log()?;
        self.transaction_complete = true;
        debug!(
            "transaction {} logged: {} created, {} header-affected, {} body-affected",
            self.transaction_id,
            self.created_pages.len(),
            self.header_affected_pages.len(),
            self.body_affected_pages.len()
        );
        Ok(())
    }

    /// Moves the WAL to `TransactionCommitted`: the durability point past
    /// which rollback no longer undoes this transaction.
    pub fn mark_as_committed(&mut self) -> StorageResult<()> {
        self.wal.lock().set_log_state(LogState::TransactionCommitted)?;
        debug!("transaction {} committed", self.transaction_id);
        Ok(())
    }

    /// Size the page currently occupies on disk, read from its stored
    /// header. The in-memory page may already be mutated, so it cannot be
    /// consulted for the before-image extent.
    fn on_disk_page_size(&self, page_number: u32) -> StorageResult<usize> {
        let mut reader = self
            .data
            .get_reader(page_offset(page_number), PAGE_HEADER_SIZE)?;
        let header = PageHeader::decode(page_number, &mut reader)?;
        Ok(header.current_size_bytes as usize)
    }
}
