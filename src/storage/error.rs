//! Storage layer errors.

use super::page::PageId;

/// Errors produced by the page I/O layer.
#[derive(Debug)]
pub enum StorageError {
    /// The page id lies at or beyond the end of the file.
    PageNotFound(PageId),

    /// The caller's buffer is not exactly one page.
    InvalidBufferSize { expected: usize, actual: usize },

    /// The backing file is not a whole number of pages.
    Corrupted(String),

    /// Underlying I/O failure (short read, permission error, disk full).
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::PageNotFound(page_id) => {
                write!(f, "page {} is beyond the end of the file", page_id.page_num())
            }
            StorageError::InvalidBufferSize { expected, actual } => {
                write!(f, "buffer size {} does not match page size {}", actual, expected)
            }
            StorageError::Corrupted(msg) => write!(f, "corrupted database file: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
