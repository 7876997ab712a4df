//! Frame slots for the buffer pool.
//!
//! A frame is a slot in the buffer pool that holds one page at a time.
//! The page bytes live behind a per-frame reader/writer latch; bookkeeping
//! (which page, pin count, dirtiness) lives in [`FrameMetadata`] under the
//! pool's metadata lock.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::page::{PageData, PageId};

/// Identifier for a frame in the buffer pool.
///
/// `FrameId` is distinct from `PageId`: a `PageId` names a logical page on
/// disk, a `FrameId` names a physical memory slot. Frame ids are valid only
/// within one pool instance and range from 0 to capacity-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new `FrameId`.
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the frame id as a `usize`.
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

/// A frame's page buffer behind its latch.
///
/// The latch is a `tokio::sync::RwLock`, so a fix that conflicts with the
/// current holders parks on the lock's wait queue instead of spinning.
/// The `Arc` lets guards hold the lock in owned form, which is what allows
/// a scan to keep a page pinned across `next` calls.
pub struct Frame {
    data: Arc<RwLock<PageData>>,
}

impl Frame {
    /// Creates a new empty frame.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(PageData::new())),
        }
    }

    /// The latched page buffer.
    pub(super) fn data(&self) -> &Arc<RwLock<PageData>> {
        &self.data
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Bookkeeping for one frame, guarded by the pool's metadata lock.
///
/// The page state machine of the pool maps onto this as:
/// `pin_count == 0` is Unfixed, a held write latch is Exclusive, and `n`
/// held read latches are Shared(n). Only unfixed frames are eviction
/// candidates.
pub(super) struct FrameMetadata {
    /// The page currently loaded in this frame, if any.
    pub(super) page_id: Option<PageId>,

    /// Number of outstanding fixes. A frame cannot be evicted while
    /// `pin_count > 0`.
    pub(super) pin_count: u32,

    /// Whether the page was modified since it was loaded. Dirty frames are
    /// written back before eviction and by `flush_all`.
    pub(super) is_dirty: bool,
}

impl FrameMetadata {
    pub(super) fn new() -> Self {
        Self {
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Returns the frame to the empty state after eviction.
    pub(super) fn reset(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}
