//! Column projection.

use crate::heap::Field;
use crate::storage::buffer::Replacer;
use crate::storage::io::Storage;

use super::ExecutorNode;
use super::error::ExecutorError;

/// Streaming operator that narrows each row to a list of columns.
///
/// Column indices are zero-based. An out-of-range index is a plan bug and
/// surfaces as `ColumnOutOfRange`, aborting the query.
pub struct ProjectNode<S: Storage, R: Replacer> {
    child: Box<ExecutorNode<S, R>>,
    columns: Vec<usize>,
    current: Option<Vec<Field>>,
}

impl<S: Storage, R: Replacer> ProjectNode<S, R> {
    /// Wraps an input with the columns to keep, in output order.
    pub fn new(child: ExecutorNode<S, R>, columns: Vec<usize>) -> Self {
        Self {
            child: Box::new(child),
            columns,
            current: None,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.current = None;
        self.child.open().await
    }

    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        if !self.child.next().await? {
            self.current = None;
            return Ok(false);
        }

        let row = self.child.output().expect("child reported a row");
        let mut projected = Vec::with_capacity(self.columns.len());
        for &index in &self.columns {
            let field = row.get(index).ok_or(ExecutorError::ColumnOutOfRange {
                index,
                width: row.len(),
            })?;
            projected.push(field.clone());
        }
        self.current = Some(projected);
        Ok(true)
    }

    pub fn close(&mut self) {
        self.child.close();
        self.current = None;
    }

    pub fn output(&self) -> Option<&[Field]> {
        self.current.as_deref()
    }
}
