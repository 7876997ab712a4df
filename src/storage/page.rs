//! Page identity and raw page buffers.

/// Size of a single page in bytes (4 KB).
///
/// This is the fundamental unit of I/O and buffer management. A database
/// file is always a whole number of pages.
pub const PAGE_SIZE: usize = 4096;

/// Unique identifier for a page within a database file.
///
/// Pages are numbered densely from 0; page `i` occupies bytes
/// `[i * PAGE_SIZE, (i + 1) * PAGE_SIZE)` of the backing file. Gaps created
/// by extension are zero-filled and read back as empty pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// Creates a new PageId from a page number.
    pub const fn new(page_num: u64) -> Self {
        Self(page_num)
    }

    /// Returns the page number.
    pub const fn page_num(&self) -> u64 {
        self.0
    }

    /// Byte offset of this page within the storage file.
    pub const fn byte_offset(&self) -> u64 {
        self.0 * PAGE_SIZE as u64
    }
}

/// An owned `PAGE_SIZE`-byte buffer.
///
/// Used for buffer pool frames and the in-memory storage backend. The
/// buffer is heap-allocated and zero-initialized.
pub struct PageData(Box<[u8; PAGE_SIZE]>);

impl PageData {
    /// Creates a new zeroed page buffer.
    pub fn new() -> Self {
        Self(Box::new([0u8; PAGE_SIZE]))
    }

    /// Immutable view of the page bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }

    /// Mutable view of the page bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }
}

impl Default for PageData {
    fn default() -> Self {
        Self::new()
    }
}
