//! Bounded in-memory cache of page headers and page bodies.
//!
//! The two maps are independent: purging headers never touches cached
//! bodies for the same page numbers, and vice versa. Headers are loaded
//! eagerly by the page manager when the store opens and stay cached for
//! its lifetime, so a header miss without a loader is an internal
//! consistency violation, not a recoverable condition. Bodies are paged in
//! lazily through the loader passed to [`PageCache::get_cached_page`].

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{DataPage, SharedDataPage, SharedPageHeader};

#[derive(Default)]
pub struct PageCache {
    headers: DashMap<u32, SharedPageHeader>,
    pages: DashMap<u32, SharedDataPage>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches `header`, replacing any previous header for its page number.
    pub fn cache_header(&self, header: SharedPageHeader) {
        let page_number = header.read().page_number;
        self.headers.insert(page_number, header);
    }

    /// Caches `page`, replacing any previous body for its page number.
    pub fn cache_page(&self, page: SharedDataPage) {
        let page_number = page.read().page_number();
        self.pages.insert(page_number, page);
    }

    /// Returns the cached header for `page_number`.
    pub fn get_header(&self, page_number: u32) -> StorageResult<SharedPageHeader> {
        self.headers
            .get(&page_number)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::HeaderNotCached { page_number })
    }

    /// Returns the cached header, running `loader` to fill the slot on a
    /// miss.
    pub fn get_header_or_load(
        &self,
        page_number: u32,
        loader: impl FnOnce() -> StorageResult<SharedPageHeader>,
    ) -> StorageResult<SharedPageHeader> {
        if let Some(entry) = self.headers.get(&page_number) {
            return Ok(entry.value().clone());
        }
        let header = loader()?;
        self.headers.insert(page_number, header.clone());
        Ok(header)
    }

    /// Returns the cached body for `header`'s page, running `loader` to
    /// page it in on a miss.
    pub fn get_cached_page(
        &self,
        header: &SharedPageHeader,
        loader: impl FnOnce(&SharedPageHeader) -> StorageResult<DataPage>,
    ) -> StorageResult<SharedDataPage> {
        let page_number = header.read().page_number;
        if let Some(entry) = self.pages.get(&page_number) {
            return Ok(entry.value().clone());
        }
        let page = Arc::new(RwLock::new(loader(header)?));
        self.pages.insert(page_number, page.clone());
        Ok(page)
    }

    /// Drops cached headers for the given page numbers; unknown numbers
    /// are ignored. Cached bodies are untouched.
    pub fn purge_headers(&self, page_numbers: &[u32]) {
        for page_number in page_numbers {
            self.headers.remove(page_number);
        }
    }

    /// Drops cached bodies for the given page numbers; unknown numbers are
    /// ignored. Cached headers are untouched.
    pub fn purge_pages(&self, page_numbers: &[u32]) {
        for page_number in page_numbers {
            self.pages.remove(page_number);
        }
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{PageHeader, PageType};

    fn header(page_number: u32) -> SharedPageHeader {
        Arc::new(RwLock::new(PageHeader::new(
            PageType::NodeReference,
            page_number,
        )))
    }

    #[test]
    fn test_get_header_without_loader_fails_on_miss() {
        let cache = PageCache::new();
        let result = cache.get_header(4);
        assert!(matches!(
            result,
            Err(StorageError::HeaderNotCached { page_number: 4 })
        ));
    }

    #[test]
    fn test_get_header_returns_cached_instance() {
        let cache = PageCache::new();
        let h = header(1);
        cache.cache_header(h.clone());

        let cached = cache.get_header(1).unwrap();
        assert!(Arc::ptr_eq(&cached, &h));
    }

    #[test]
    fn test_cache_header_overwrites() {
        let cache = PageCache::new();
        cache.cache_header(header(1));
        let replacement = header(1);
        cache.cache_header(replacement.clone());

        assert!(Arc::ptr_eq(&cache.get_header(1).unwrap(), &replacement));
        assert_eq!(cache.header_count(), 1);
    }

    #[test]
    fn test_get_header_or_load_fills_on_miss() {
        let cache = PageCache::new();

        let loaded = cache.get_header_or_load(2, || Ok(header(2))).unwrap();
        // The second call must hit the cache, not the loader.
        let again = cache
            .get_header_or_load(2, || panic!("loader re-invoked"))
            .unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));
    }

    #[test]
    fn test_get_cached_page_loads_once() {
        let cache = PageCache::new();
        let h = header(3);

        let page = cache
            .get_cached_page(&h, |header| {
                Ok(DataPage::from_parts(header.clone(), Vec::new()))
            })
            .unwrap();
        let again = cache
            .get_cached_page(&h, |_| panic!("loader re-invoked"))
            .unwrap();
        assert!(Arc::ptr_eq(&page, &again));
    }

    #[test]
    fn test_purges_are_independent() {
        let cache = PageCache::new();
        let h = header(5);
        cache.cache_header(h.clone());
        cache
            .get_cached_page(&h, |header| {
                Ok(DataPage::from_parts(header.clone(), Vec::new()))
            })
            .unwrap();

        cache.purge_headers(&[5, 99]);
        assert!(cache.get_header(5).is_err());
        assert_eq!(cache.page_count(), 1);

        cache.cache_header(h);
        cache.purge_pages(&[5, 99]);
        assert!(cache.get_header(5).is_ok());
        assert_eq!(cache.page_count(), 0);
    }
}
