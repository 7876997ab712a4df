//! Page I/O backend implementations.
//!
//! This module provides the [`Storage`] trait for page-granular I/O along
//! with its two implementations:
//!
//! - [`FileStorage`]: disk-backed storage over a single database file
//! - [`MemoryStorage`]: in-memory storage for tests and ephemeral databases

mod file;
mod memory;

pub use file::{DEFAULT_DATABASE_FILENAME, FileStorage};
pub use memory::MemoryStorage;

use super::error::StorageError;
use super::page::PageId;

/// Page I/O backend trait.
///
/// All I/O is page-sized; memory management is the caller's responsibility
/// (in practice the buffer pool's). This layer does no caching and knows
/// nothing about page contents.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the buffer pool shares one
/// instance across concurrent queries. Operations on one instance are
/// mutually exclusive; implementations serialize I/O internally.
pub trait Storage: Send + Sync {
    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if `page_id >= page_count()`.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn read_page(
        &self,
        page_id: PageId,
        buf: &mut [u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Writes a page from a caller-provided buffer and flushes userspace
    /// buffers. Durability to physical media requires [`Storage::sync_all`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if `page_id >= page_count()`.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn write_page(
        &self,
        page_id: PageId,
        buf: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Appends one zero page and returns its id.
    fn allocate_page(
        &self,
    ) -> impl std::future::Future<Output = Result<PageId, StorageError>> + Send;

    /// Appends zero pages until `page_id` is valid. No-op if it already is.
    fn extend_to(
        &self,
        page_id: PageId,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Returns the total number of pages.
    fn page_count(&self) -> impl std::future::Future<Output = usize> + Send;

    /// Syncs all pending writes to physical media (fsync).
    ///
    /// A no-op for [`MemoryStorage`].
    fn sync_all(&self) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
