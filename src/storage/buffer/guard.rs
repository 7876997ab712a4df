//! RAII guards for buffer pool page access.
//!
//! A guard is the "fix" on a page: while it lives, the page is pinned in
//! memory and latched in the matching mode. Dropping the guard unfixes the
//! page; there is no way to unfix a page that was never fixed.
//!
//! Guards hold their frame latch in owned form (backed by the frame's
//! `Arc`), so they have no lifetime tie to the pool reference they were
//! created from. A scan can therefore keep its current page fixed across
//! `next` calls and carry the guard inside its own state.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};

use super::frame::FrameId;
use super::pool::PoolInner;
use super::replacer::Replacer;
use crate::storage::io::Storage;
use crate::storage::page::{PageData, PageId};

/// Shared (read) fix on a page.
///
/// Derefs to the page bytes. Multiple read guards for the same page may
/// exist at once; a write guard excludes them. Dropping the guard releases
/// the pin; a read fix never marks the page dirty.
pub struct PageReadGuard<S: Storage, R: Replacer> {
    pub(super) pool: Arc<PoolInner<S, R>>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) lock: OwnedRwLockReadGuard<PageData>,
}

impl<S: Storage, R: Replacer> PageReadGuard<S, R> {
    /// The id of the fixed page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<S: Storage, R: Replacer> Deref for PageReadGuard<S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.lock.as_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageReadGuard<S, R> {
    fn drop(&mut self) {
        self.pool.unpin(self.frame_id, false);
    }
}

/// Exclusive (write) fix on a page.
///
/// Derefs to the page bytes, mutably. Exactly one write guard for a page
/// can exist at a time, and it excludes all read guards. The page is only
/// marked dirty if the caller says so via [`PageWriteGuard::mark_dirty`];
/// dropping the guard releases the pin either way.
pub struct PageWriteGuard<S: Storage, R: Replacer> {
    pub(super) pool: Arc<PoolInner<S, R>>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) lock: OwnedRwLockWriteGuard<PageData>,
    pub(super) is_dirty: bool,
}

impl<S: Storage, R: Replacer> PageWriteGuard<S, R> {
    /// The id of the fixed page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Records that the page was modified, so it is written back on
    /// eviction or flush.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }
}

impl<S: Storage, R: Replacer> Deref for PageWriteGuard<S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.lock.as_slice()
    }
}

impl<S: Storage, R: Replacer> DerefMut for PageWriteGuard<S, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lock.as_mut_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageWriteGuard<S, R> {
    fn drop(&mut self) {
        self.pool.unpin(self.frame_id, self.is_dirty);
    }
}
