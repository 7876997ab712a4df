//! Row filtering by predicate.

use crate::heap::Field;
use crate::storage::buffer::Replacer;
use crate::storage::io::Storage;

use super::ExecutorNode;
use super::error::ExecutorError;
use super::predicate::Predicate;

/// Streaming operator that passes through rows accepted by a predicate.
pub struct FilterNode<S: Storage, R: Replacer> {
    child: Box<ExecutorNode<S, R>>,
    predicate: Predicate,
    current: Option<Vec<Field>>,
}

impl<S: Storage, R: Replacer> FilterNode<S, R> {
    /// Wraps an input with a predicate.
    pub fn new(child: ExecutorNode<S, R>, predicate: Predicate) -> Self {
        Self {
            child: Box::new(child),
            predicate,
            current: None,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.current = None;
        self.child.open().await
    }

    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        while self.child.next().await? {
            let row = self.child.output().expect("child reported a row");
            if self.predicate.evaluate(row) {
                self.current = Some(row.to_vec());
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    pub fn close(&mut self) {
        self.child.close();
        self.current = None;
    }

    pub fn output(&self) -> Option<&[Field]> {
        self.current.as_deref()
    }
}
