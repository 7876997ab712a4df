//! Buffer pool for page caching.
//!
//! The buffer pool keeps a bounded number of pages in memory, hands out
//! latched access through RAII guards, and evicts with a scan-resistant
//! 2Q policy.
//!
//! # Example
//!
//! ```no_run
//! use hivedb::storage::buffer::{BufferPool, TwoQReplacer};
//! use hivedb::storage::{MemoryStorage, PageId};
//!
//! # async fn example() {
//! let pool = BufferPool::new(MemoryStorage::new(), TwoQReplacer::new(), 10);
//!
//! // Fix page 0 exclusively and write to it.
//! let mut guard = pool.fetch_page_mut(PageId::new(0)).await.unwrap();
//! guard[0..5].copy_from_slice(b"hello");
//! guard.mark_dirty();
//! drop(guard); // unfix
//!
//! // Fix it shared and read it back.
//! let guard = pool.fetch_page(PageId::new(0)).await.unwrap();
//! assert_eq!(&guard[0..5], b"hello");
//! # }
//! ```

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::BufferPoolError;
pub use frame::FrameId;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use pool::{BufferPool, DEFAULT_POOL_CAPACITY};
pub use replacer::{Replacer, TwoQReplacer};
