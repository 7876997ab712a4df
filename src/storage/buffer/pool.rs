//! Buffer pool: a bounded in-memory cache of pages with latching.
//!
//! The pool sits between the executor and the storage backend, keeping a
//! fixed number of pages in memory and handing out latched access to them
//! through RAII guards.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::BufferPoolError;
use super::frame::{Frame, FrameId, FrameMetadata};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::Replacer;
use crate::storage::io::Storage;
use crate::storage::page::PageId;

/// Default number of frames in a buffer pool.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

/// A bounded in-memory cache of pages.
///
/// The pool owns `capacity` frames and maps disk pages onto them on
/// demand. When every frame is occupied, the replacement policy picks an
/// unpinned victim, which is written back first if dirty. Fixing a page at
/// or beyond the end of the file extends the file with zero pages.
///
/// # Concurrency
///
/// - One `Mutex` guards all pool metadata (page table, frame bookkeeping,
///   free list, replacer). Its critical sections are short and never span
///   an await point.
/// - Each frame's bytes sit behind their own `tokio::sync::RwLock`, held
///   for the lifetime of a guard. Conflicting fixes queue on the latch.
///
/// Lock order: the metadata mutex is never held while acquiring a frame
/// latch. Every fix transitions metadata first, drops the mutex, then
/// awaits the latch. (Short metadata sections while a latch is already
/// held are fine; the inverse wait can then never form a cycle.) On unfix
/// the metadata transition happens first and the latch is released after,
/// by guard field drop order.
///
/// Writes made under a write guard are visible to every later fix of the
/// same page through the latch's acquire/release semantics. Fixes of
/// different pages are unordered with respect to each other.
///
/// # Shutdown
///
/// Call [`BufferPool::flush_all`] before dropping the pool; dirty frames
/// are not written back by `Drop` (there is no async drop).
///
/// `BufferPool` is cheaply cloneable; clones share the same pool.
pub struct BufferPool<S: Storage, R: Replacer> {
    inner: Arc<PoolInner<S, R>>,
}

impl<S: Storage, R: Replacer> Clone for BufferPool<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Shared pool state referenced by the pool handle and by guards.
pub(super) struct PoolInner<S: Storage, R: Replacer> {
    /// The underlying storage backend.
    storage: S,

    /// Frame slots; each frame's bytes are behind their own latch. The
    /// vector itself is immutable after construction.
    frames: Vec<Frame>,

    /// Metadata lock: page table, per-frame bookkeeping, free list, and
    /// the replacement policy.
    state: Mutex<PoolState<R>>,

    /// Number of frames in the pool.
    capacity: usize,
}

struct PoolState<R> {
    /// Maps resident pages to their frames.
    page_table: HashMap<PageId, FrameId>,

    /// Bookkeeping per frame, indexed by `FrameId`.
    metadata: Vec<FrameMetadata>,

    /// Frames not currently holding any page.
    free_list: Vec<FrameId>,

    /// Replacement policy selecting eviction victims.
    replacer: R,
}

impl<S: Storage, R: Replacer> BufferPool<S, R> {
    /// Creates a buffer pool over `storage` with `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(storage: S, replacer: R, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be > 0");

        let frames: Vec<_> = (0..capacity).map(|_| Frame::new()).collect();
        let metadata: Vec<_> = (0..capacity).map(|_| FrameMetadata::new()).collect();
        let free_list: Vec<_> = (0..capacity).map(FrameId::new).collect();

        Self {
            inner: Arc::new(PoolInner {
                storage,
                frames,
                state: Mutex::new(PoolState {
                    page_table: HashMap::with_capacity(capacity),
                    metadata,
                    free_list,
                    replacer,
                }),
                capacity,
            }),
        }
    }

    /// Fixes a page in shared mode.
    ///
    /// The page is loaded from storage if not resident, pinned, and
    /// latched for reading. The returned guard keeps the fix until it is
    /// dropped. If the page is currently fixed exclusively, this waits in
    /// the latch queue.
    ///
    /// # Errors
    ///
    /// - `BufferPoolError::AllPinned` if no frame can be freed
    /// - `BufferPoolError::Storage` if I/O fails (pool state unchanged)
    pub async fn fetch_page(
        &self,
        page_id: PageId,
    ) -> Result<PageReadGuard<S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load(page_id).await?;

        let lock = self.inner.frames[frame_id.as_usize()]
            .data()
            .clone()
            .read_owned()
            .await;

        Ok(PageReadGuard {
            pool: Arc::clone(&self.inner),
            frame_id,
            page_id,
            lock,
        })
    }

    /// Fixes a page in exclusive mode.
    ///
    /// Like [`BufferPool::fetch_page`], but the guard grants mutable
    /// access and waits for every shared holder to release first. Call
    /// [`PageWriteGuard::mark_dirty`] after modifying the bytes.
    pub async fn fetch_page_mut(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load(page_id).await?;

        let lock = self.inner.frames[frame_id.as_usize()]
            .data()
            .clone()
            .write_owned()
            .await;

        Ok(PageWriteGuard {
            pool: Arc::clone(&self.inner),
            frame_id,
            page_id,
            lock,
            is_dirty: false,
        })
    }

    /// Writes a page back to storage if it is resident and dirty.
    pub async fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let frame_id = {
            let state = self.inner.state.lock();
            match state.page_table.get(&page_id) {
                Some(&fid) if state.metadata[fid.as_usize()].is_dirty => Some(fid),
                _ => None,
            }
        };

        if let Some(frame_id) = frame_id {
            self.inner.write_back(frame_id, page_id).await?;
        }

        Ok(())
    }

    /// Writes back every dirty resident page and syncs the storage.
    ///
    /// This is the shutdown protocol: call it before dropping the pool.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; later pages stay unflushed.
    pub async fn flush_all(&self) -> Result<(), BufferPoolError> {
        let dirty: Vec<(FrameId, PageId)> = {
            let state = self.inner.state.lock();
            state
                .metadata
                .iter()
                .enumerate()
                .filter_map(|(i, meta)| {
                    if meta.is_dirty {
                        meta.page_id.map(|page_id| (FrameId::new(i), page_id))
                    } else {
                        None
                    }
                })
                .collect()
        };

        for (frame_id, page_id) in dirty {
            self.inner.write_back(frame_id, page_id).await?;
        }

        self.inner.storage.sync_all().await.map_err(Into::into)
    }

    /// Appends one zero page to the file and returns its id.
    pub async fn extend(&self) -> Result<PageId, BufferPoolError> {
        self.inner.storage.allocate_page().await.map_err(Into::into)
    }

    /// Number of pages in the backing file.
    pub async fn page_count(&self) -> usize {
        self.inner.storage.page_count().await
    }

    /// Number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of pages currently resident in the pool.
    pub fn resident_pages(&self) -> usize {
        self.inner.state.lock().page_table.len()
    }
}

impl<S: Storage, R: Replacer> PoolInner<S, R> {
    /// Returns the frame holding `page_id`, loading the page on a miss.
    /// The frame's pin count is incremented; the caller must pair this
    /// with `unpin` (done by the guards).
    async fn get_or_load(&self, page_id: PageId) -> Result<FrameId, BufferPoolError> {
        // Fast path: page resident.
        {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.page_table.get(&page_id).copied() {
                state.pin_resident(frame_id);
                return Ok(frame_id);
            }
        }

        // Pages are created on demand: a fix beyond the end of the file
        // extends it with zero pages up to and including the target.
        if page_id.page_num() >= self.storage.page_count().await as u64 {
            tracing::debug!(page = page_id.page_num(), "extending file for fix");
            self.storage.extend_to(page_id).await?;
        }

        let frame_id = self.allocate_frame().await?;

        let read_result = {
            let mut data = self.frames[frame_id.as_usize()].data().write().await;
            self.storage.read_page(page_id, data.as_mut_slice()).await
        };

        // On a failed load the chosen frame goes back to the free list and
        // the pool is left as it was.
        if let Err(e) = read_result {
            let mut state = self.state.lock();
            state.free_list.push(frame_id);
            return Err(e.into());
        }

        let mut state = self.state.lock();

        // Another task may have loaded the same page while we did I/O.
        // Use its frame and recycle ours.
        if let Some(existing) = state.page_table.get(&page_id).copied() {
            state.free_list.push(frame_id);
            state.pin_resident(existing);
            return Ok(existing);
        }

        state.page_table.insert(page_id, frame_id);
        let meta = &mut state.metadata[frame_id.as_usize()];
        meta.page_id = Some(page_id);
        meta.pin_count = 1;
        meta.is_dirty = false;
        state.replacer.record_access(frame_id);

        Ok(frame_id)
    }

    /// Obtains an empty frame, evicting an unpinned page if necessary.
    async fn allocate_frame(&self) -> Result<FrameId, BufferPoolError> {
        {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.free_list.pop() {
                return Ok(frame_id);
            }
        }

        loop {
            let victim = self.state.lock().replacer.victim();
            let Some(frame_id) = victim else {
                return Err(BufferPoolError::AllPinned);
            };

            let (old_page_id, is_dirty) = {
                let state = self.state.lock();
                let meta = &state.metadata[frame_id.as_usize()];
                (meta.page_id, meta.is_dirty)
            };

            // Write back outside the metadata lock; the victim is still in
            // the page table, so a concurrent fix can re-pin or re-dirty
            // it meanwhile. Both cases are detected below and the victim
            // is re-tracked.
            if let (Some(old_page_id), true) = (old_page_id, is_dirty) {
                let write_result = {
                    let data = self.frames[frame_id.as_usize()].data().read().await;
                    let result = self.storage.write_page(old_page_id, data.as_slice()).await;
                    if result.is_ok() {
                        // The read latch is still held, so the bytes just
                        // written are current and the flag can be cleared.
                        // A writer queued on the latch re-dirties after us.
                        self.state.lock().metadata[frame_id.as_usize()].is_dirty = false;
                    }
                    result
                };
                if let Err(e) = write_result {
                    let mut state = self.state.lock();
                    state.replacer.record_access(frame_id);
                    if state.metadata[frame_id.as_usize()].pin_count == 0 {
                        state.replacer.unpin(frame_id);
                    }
                    return Err(e.into());
                }
            }

            let mut state = self.state.lock();
            let meta = &state.metadata[frame_id.as_usize()];
            if meta.pin_count > 0 || meta.is_dirty {
                // Re-pinned or re-dirtied during the write-back window:
                // keep the page resident and pick another victim.
                let pinned = meta.pin_count > 0;
                state.replacer.record_access(frame_id);
                if !pinned {
                    state.replacer.unpin(frame_id);
                }
                continue;
            }

            if let Some(old_page_id) = old_page_id {
                tracing::debug!(
                    page = old_page_id.page_num(),
                    dirty = is_dirty,
                    "evicting page"
                );
                state.page_table.remove(&old_page_id);
            }
            state.metadata[frame_id.as_usize()].reset();

            return Ok(frame_id);
        }
    }

    /// Writes one frame's page back and clears the dirty flag, verifying
    /// that the frame still holds the same page around the I/O.
    async fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<(), BufferPoolError> {
        let data = self.frames[frame_id.as_usize()].data().read().await;

        {
            let state = self.state.lock();
            if state.metadata[frame_id.as_usize()].page_id != Some(page_id) {
                return Ok(());
            }
        }

        self.storage.write_page(page_id, data.as_slice()).await?;

        let mut state = self.state.lock();
        if state.metadata[frame_id.as_usize()].page_id == Some(page_id) {
            state.metadata[frame_id.as_usize()].is_dirty = false;
        }
        Ok(())
    }

    /// Releases one fix (called from guard `Drop`).
    ///
    /// # Panics
    ///
    /// Panics if the frame is not pinned; that means a guard was released
    /// twice, which is a pool bug.
    pub(super) fn unpin(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();

        let meta = &mut state.metadata[frame_id.as_usize()];
        assert!(meta.pin_count > 0, "unpin without a matching pin");
        meta.pin_count -= 1;
        if is_dirty {
            meta.is_dirty = true;
        }

        if meta.pin_count == 0 {
            state.replacer.unpin(frame_id);
        }
    }
}

impl<R> PoolState<R>
where
    R: Replacer,
{
    /// Pins an already-resident frame and records the access.
    fn pin_resident(&mut self, frame_id: FrameId) {
        let meta = &mut self.metadata[frame_id.as_usize()];
        meta.pin_count += 1;
        if meta.pin_count == 1 {
            self.replacer.pin(frame_id);
        }
        self.replacer.record_access(frame_id);
    }
}
