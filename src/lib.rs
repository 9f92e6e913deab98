//! triedb: durable page-based storage for a full-text search trie.
//!
//! The trie and its item references live on disk instead of in memory,
//! survive process crashes, and are paged in lazily on demand. The layers,
//! bottom up:
//!
//! - [`storage`]: raw file access, the buffer pool, pages and their header
//!   chains, the page cache, and the write-ahead log of before-images
//! - [`recovery`]: the rollback procedure run once at store open
//! - [`index`]: the persisted entry manager and the lazy trie-node
//!   binding over it

pub mod index;
pub mod recovery;
pub mod storage;
