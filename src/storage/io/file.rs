//! File-backed storage implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{PAGE_SIZE, PageId};

/// Default database file name, used when the caller does not supply a path.
pub const DEFAULT_DATABASE_FILENAME: &str = "buzzdb.dat";

/// Disk-backed storage over a single database file.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (4KB)     | Page 1 (4KB)     | Page 2 (4KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 4096      ^ offset 8192
/// ```
///
/// The file length is always a whole number of pages. Extension appends
/// zero pages; a zeroed page parses as an empty slotted page.
///
/// # Concurrency
///
/// An async mutex around the file handle serializes every read, write, and
/// extension, so operations are mutually exclusive.
///
/// # Durability
///
/// `write_page` flushes userspace buffers only. [`FileStorage::sync_all`]
/// reaches physical media; there is no per-write fsync and no write-ahead
/// log, so a crash can lose recent writes.
pub struct FileStorage {
    /// Path to the database file.
    path: PathBuf,
    /// File handle wrapped in an async mutex for serialized access.
    file: Mutex<File>,
    /// Number of pages currently in the file.
    page_count: AtomicU64,
}

impl FileStorage {
    /// Opens or creates a database file at the given path.
    ///
    /// If `truncate` is set, any existing contents are discarded. The file
    /// always ends up with at least one page, so page 0 exists from the
    /// start.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` if the existing file's length is
    /// not a multiple of `PAGE_SIZE`.
    pub async fn open(path: impl Into<PathBuf>, truncate: bool) -> Result<Self, StorageError> {
        let path = path.into();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&path)
            .await?;

        let file_size = file.metadata().await?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        let mut page_count = file_size / PAGE_SIZE as u64;
        if page_count == 0 {
            file.write_all(&[0u8; PAGE_SIZE]).await?;
            file.flush().await?;
            page_count = 1;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_count: AtomicU64::new(page_count),
        })
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut file = self.file.lock().await;
        if page_id.page_num() >= self.page_count.load(Ordering::Acquire) {
            return Err(StorageError::PageNotFound(page_id));
        }

        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.read_exact(buf).await?;

        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut file = self.file.lock().await;
        if page_id.page_num() >= self.page_count.load(Ordering::Acquire) {
            return Err(StorageError::PageNotFound(page_id));
        }

        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(buf).await?;
        file.flush().await?;

        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut file = self.file.lock().await;

        let page_num = self.page_count.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);

        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(&[0u8; PAGE_SIZE]).await?;
        file.flush().await?;

        self.page_count.store(page_num + 1, Ordering::Release);

        Ok(page_id)
    }

    async fn extend_to(&self, page_id: PageId) -> Result<(), StorageError> {
        let mut file = self.file.lock().await;

        let current = self.page_count.load(Ordering::Acquire);
        if page_id.page_num() < current {
            return Ok(());
        }

        let pages_to_add = page_id.page_num() + 1 - current;
        let zeros = vec![0u8; pages_to_add as usize * PAGE_SIZE];

        file.seek(std::io::SeekFrom::Start(current * PAGE_SIZE as u64))
            .await?;
        file.write_all(&zeros).await?;
        file.flush().await?;

        self.page_count
            .store(page_id.page_num() + 1, Ordering::Release);

        Ok(())
    }

    async fn page_count(&self) -> usize {
        self.page_count.load(Ordering::Acquire) as usize
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        Ok(())
    }
}
