//! Heap layer errors.

/// Errors from record-level storage.
#[derive(Debug)]
pub enum HeapError {
    /// The page has no slot or no contiguous space for the record.
    PageFull { required: usize, available: usize },

    /// A stored record's text form could not be parsed.
    InvalidRecord(String),
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::PageFull {
                required,
                available,
            } => write!(
                f,
                "page full: record needs {} bytes, {} available",
                required, available
            ),
            HeapError::InvalidRecord(msg) => write!(f, "invalid record: {}", msg),
        }
    }
}

impl std::error::Error for HeapError {}
