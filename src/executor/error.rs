//! Executor errors.
//!
//! An error from `open` or `next` is fatal to the in-flight query; nothing
//! is retried. Storage stays consistent because every insert is a single
//! slot write inside one exclusive fix.

use crate::heap::HeapError;
use crate::storage::StorageError;
use crate::storage::buffer::BufferPoolError;

/// Errors surfaced by operator `open`/`next`.
#[derive(Debug)]
pub enum ExecutorError {
    /// Buffer pool failure (all pages pinned, or I/O during fix).
    Buffer(BufferPoolError),

    /// Storage failure outside the pool (extension, flush).
    Storage(StorageError),

    /// Heap failure (page full after placement gave up, corrupt record).
    Heap(HeapError),

    /// The record cannot fit even a fresh empty page.
    RecordTooLarge { size: usize, max: usize },

    /// A projection or key column index is outside the row. This is a
    /// contract violation by the plan, and fatal to the query.
    ColumnOutOfRange { index: usize, width: usize },

    /// The Print sink failed to accept output.
    Io(std::io::Error),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::Buffer(e) => write!(f, "buffer pool error: {}", e),
            ExecutorError::Storage(e) => write!(f, "storage error: {}", e),
            ExecutorError::Heap(e) => write!(f, "heap error: {}", e),
            ExecutorError::RecordTooLarge { size, max } => {
                write!(f, "record of {} bytes exceeds page capacity {}", size, max)
            }
            ExecutorError::ColumnOutOfRange { index, width } => {
                write!(f, "column index {} out of range for a {}-column row", index, width)
            }
            ExecutorError::Io(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Buffer(e) => Some(e),
            ExecutorError::Storage(e) => Some(e),
            ExecutorError::Heap(e) => Some(e),
            ExecutorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BufferPoolError> for ExecutorError {
    fn from(e: BufferPoolError) -> Self {
        ExecutorError::Buffer(e)
    }
}

impl From<StorageError> for ExecutorError {
    fn from(e: StorageError) -> Self {
        ExecutorError::Storage(e)
    }
}

impl From<HeapError> for ExecutorError {
    fn from(e: HeapError) -> Self {
        ExecutorError::Heap(e)
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(e: std::io::Error) -> Self {
        ExecutorError::Io(e)
    }
}
