//! Record insertion.

use crate::heap::{Field, HeapError, MAX_RECORD_SIZE, Record, SlottedPage};
use crate::storage::PageId;
use crate::storage::buffer::{BufferPool, Replacer};
use crate::storage::io::Storage;

use super::error::ExecutorError;

/// How many freshly extended pages to try before giving up. A new page
/// can only reject a fitting record if a concurrent writer fills it
/// between our extension and our fix.
const FRESH_PAGE_ATTEMPTS: usize = 3;

/// Sink operator that stores one pending record.
///
/// This is not a composable tree node: it has no input, and data-loading
/// paths drive it directly by alternating [`InsertNode::set_record`] and
/// `next`. Each successful `next` performs exactly one insert and
/// consumes the pending record; with nothing pending, `next` returns
/// false.
///
/// Placement is first-fit: every existing page is tried in order under an
/// exclusive fix, then the file is extended by one page.
pub struct InsertNode<S: Storage, R: Replacer> {
    pool: BufferPool<S, R>,
    pending: Option<Record>,
}

impl<S: Storage, R: Replacer> InsertNode<S, R> {
    /// Creates an insert sink over the pool.
    pub fn new(pool: BufferPool<S, R>) -> Self {
        Self {
            pool,
            pending: None,
        }
    }

    /// Sets the record the next `next` call will insert.
    pub fn set_record(&mut self, record: Record) {
        self.pending = Some(record);
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }

    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        let Some(record) = &self.pending else {
            return Ok(false);
        };
        let text = record.serialize();
        let bytes = text.as_bytes();

        let page_count = self.pool.page_count().await as u64;
        for page_num in 0..page_count {
            if self.try_insert_into(PageId::new(page_num), bytes).await? {
                self.pending = None;
                return Ok(true);
            }
        }

        if bytes.len() > MAX_RECORD_SIZE {
            return Err(ExecutorError::RecordTooLarge {
                size: bytes.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        for _ in 0..FRESH_PAGE_ATTEMPTS {
            let page_id = self.pool.extend().await?;
            if self.try_insert_into(page_id, bytes).await? {
                self.pending = None;
                return Ok(true);
            }
            tracing::debug!(
                page = page_id.page_num(),
                "freshly extended page was already full, retrying"
            );
        }

        Err(ExecutorError::Heap(HeapError::PageFull {
            required: bytes.len(),
            available: 0,
        }))
    }

    /// Tries one page; true on success, false if the page had no room.
    async fn try_insert_into(
        &self,
        page_id: PageId,
        bytes: &[u8],
    ) -> Result<bool, ExecutorError> {
        let mut guard = self.pool.fetch_page_mut(page_id).await?;
        let inserted = SlottedPage::new(&mut guard[..]).insert(bytes);
        match inserted {
            Ok(_) => {
                guard.mark_dirty();
                Ok(true)
            }
            Err(HeapError::PageFull { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn close(&mut self) {
        self.pending = None;
    }

    /// Insert produces no rows.
    pub fn output(&self) -> Option<&[Field]> {
        None
    }
}
