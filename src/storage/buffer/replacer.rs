//! Page replacement policies for the buffer pool.
//!
//! The replacer decides which resident frame to evict when the pool needs
//! a slot. It tracks access recency and which frames are currently
//! evictable (unpinned); the pool drives it under the metadata lock, so
//! implementations need no internal synchronization.

use std::collections::{HashSet, VecDeque};

use super::frame::FrameId;

/// Trait for page replacement policies.
///
/// The pool calls `record_access` on every fix, `pin`/`unpin` as a frame's
/// pin count leaves/reaches zero, and `victim` when it needs to free a
/// slot. Only frames marked evictable may be returned by `victim`.
pub trait Replacer: Send {
    /// Records an access to a frame, updating recency bookkeeping.
    fn record_access(&mut self, frame_id: FrameId);

    /// Marks a frame non-evictable. Called when its pin count leaves zero.
    fn pin(&mut self, frame_id: FrameId);

    /// Marks a frame evictable. Called when its pin count reaches zero.
    fn unpin(&mut self, frame_id: FrameId);

    /// Selects, removes, and returns an eviction victim, or `None` if every
    /// tracked frame is pinned.
    fn victim(&mut self) -> Option<FrameId>;

    /// Drops a frame from tracking entirely, evictable or not. Used when a
    /// frame leaves the pool through a path other than `victim`.
    fn remove(&mut self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

/// 2Q page replacement policy.
///
/// Maintains two ordered queues (head = oldest):
///
/// - **FIFO**: frames accessed exactly once since loading. These are the
///   natural first victims under a sequential scan.
/// - **LRU**: frames accessed more than once. A second access promotes a
///   frame out of FIFO, so popular pages survive a scan that floods the
///   FIFO queue with single-use pages.
///
/// Eviction scans the FIFO queue head-to-tail for the first evictable
/// frame, then the LRU queue the same way. Pinned prefixes are skipped in
/// place. This is the simplified two-queue form without a ghost queue: an
/// evicted frame that is reloaded later starts over as a first access.
///
/// Queues have no internal size caps; the pool's frame capacity is the
/// only bound. Membership scans are O(queue length), which is fine for the
/// pool sizes this engine targets.
pub struct TwoQReplacer {
    /// Frames seen exactly once, in arrival order.
    fifo: VecDeque<FrameId>,
    /// Re-referenced frames, least recently used first.
    lru: VecDeque<FrameId>,
    /// Frames currently allowed to be evicted (pin count zero).
    evictable: HashSet<FrameId>,
}

impl TwoQReplacer {
    /// Creates an empty 2Q replacer.
    pub fn new() -> Self {
        Self {
            fifo: VecDeque::new(),
            lru: VecDeque::new(),
            evictable: HashSet::new(),
        }
    }

    /// FIFO queue contents, head first. Exposed for tests.
    pub fn fifo_frames(&self) -> Vec<FrameId> {
        self.fifo.iter().copied().collect()
    }

    /// LRU queue contents, least recent first. Exposed for tests.
    pub fn lru_frames(&self) -> Vec<FrameId> {
        self.lru.iter().copied().collect()
    }

    fn is_tracked(&self, frame_id: FrameId) -> bool {
        self.fifo.contains(&frame_id) || self.lru.contains(&frame_id)
    }

    fn take_first_evictable(
        queue: &mut VecDeque<FrameId>,
        evictable: &mut HashSet<FrameId>,
    ) -> Option<FrameId> {
        let pos = queue.iter().position(|f| evictable.contains(f))?;
        let frame_id = queue.remove(pos).expect("position is in bounds");
        evictable.remove(&frame_id);
        Some(frame_id)
    }
}

impl Default for TwoQReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for TwoQReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        if let Some(pos) = self.fifo.iter().position(|&f| f == frame_id) {
            // Second access: promote from FIFO to the LRU tail.
            self.fifo.remove(pos);
            self.lru.push_back(frame_id);
        } else if let Some(pos) = self.lru.iter().position(|&f| f == frame_id) {
            // Already popular: move to most-recently-used.
            self.lru.remove(pos);
            self.lru.push_back(frame_id);
        } else {
            // First access: FIFO tail.
            self.fifo.push_back(frame_id);
        }
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.evictable.remove(&frame_id);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        if !self.is_tracked(frame_id) {
            self.fifo.push_back(frame_id);
        }
        self.evictable.insert(frame_id);
    }

    fn victim(&mut self) -> Option<FrameId> {
        Self::take_first_evictable(&mut self.fifo, &mut self.evictable)
            .or_else(|| Self::take_first_evictable(&mut self.lru, &mut self.evictable))
    }

    fn remove(&mut self, frame_id: FrameId) {
        if let Some(pos) = self.fifo.iter().position(|&f| f == frame_id) {
            self.fifo.remove(pos);
        } else if let Some(pos) = self.lru.iter().position(|&f| f == frame_id) {
            self.lru.remove(pos);
        }
        self.evictable.remove(&frame_id);
    }

    fn size(&self) -> usize {
        self.evictable.len()
    }
}
