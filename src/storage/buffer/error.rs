//! Buffer pool errors.

use crate::storage::error::StorageError;

/// Errors that can occur during buffer pool operations.
#[derive(Debug)]
pub enum BufferPoolError {
    /// Every frame is pinned and there is no free slot.
    ///
    /// Recoverable: the pool state is unchanged, and releasing any one
    /// guard lets a retried fetch succeed.
    AllPinned,

    /// Underlying storage I/O error. The pool state is unchanged; the
    /// frame chosen for the failed load was returned to the free list.
    Storage(StorageError),
}

impl std::fmt::Display for BufferPoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferPoolError::AllPinned => {
                write!(f, "buffer pool is full: all pages are pinned")
            }
            BufferPoolError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for BufferPoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferPoolError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for BufferPoolError {
    fn from(e: StorageError) -> Self {
        BufferPoolError::Storage(e)
    }
}
