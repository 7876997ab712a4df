//! Hash join.

use std::collections::HashMap;

use crate::heap::Field;
use crate::storage::buffer::Replacer;
use crate::storage::io::Storage;

use super::ExecutorNode;
use super::error::ExecutorError;

/// Inner equi-join on one column per side.
///
/// `open` runs both phases: the build phase buckets every left row by the
/// structural fingerprint of its join key, then the probe phase looks up
/// every right row and materializes one `[left..., right...]` row per
/// match. `next` streams the materialized output.
///
/// Keys are compared by fingerprint, so equality is structural: an
/// `Int32(1)` never matches a `Float32(1.0)` or a `Text("1")`.
///
/// Limitations (by design): output is materialized up front rather than
/// streamed, memory is O(left input + output), and only single-column
/// inner-join equality is supported.
pub struct HashJoinNode<S: Storage, R: Replacer> {
    left: Box<ExecutorNode<S, R>>,
    right: Box<ExecutorNode<S, R>>,
    left_column: usize,
    right_column: usize,
    rows: Vec<Vec<Field>>,
    cursor: usize,
}

impl<S: Storage, R: Replacer> HashJoinNode<S, R> {
    /// Creates a join of `left` and `right` on the given key columns.
    pub fn new(
        left: ExecutorNode<S, R>,
        right: ExecutorNode<S, R>,
        left_column: usize,
        right_column: usize,
    ) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            left_column,
            right_column,
            rows: Vec::new(),
            cursor: 0,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.rows.clear();
        self.cursor = 0;

        // Build phase: bucket the left input by join key.
        let mut table: HashMap<Vec<u8>, Vec<Vec<Field>>> = HashMap::new();
        self.left.open().await?;
        while self.left.next().await? {
            let row = self.left.output().expect("child reported a row").to_vec();
            let key = key_of(&row, self.left_column)?;
            table.entry(key).or_default().push(row);
        }
        self.left.close();

        // Probe phase: one output row per matching left row.
        self.right.open().await?;
        while self.right.next().await? {
            let row = self.right.output().expect("child reported a row");
            let key = key_of(row, self.right_column)?;
            if let Some(matches) = table.get(&key) {
                for left_row in matches {
                    let mut joined = Vec::with_capacity(left_row.len() + row.len());
                    joined.extend(left_row.iter().cloned());
                    joined.extend(row.iter().cloned());
                    self.rows.push(joined);
                }
            }
        }
        self.right.close();

        Ok(())
    }

    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        if self.cursor < self.rows.len() {
            self.cursor += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.rows.clear();
        self.cursor = 0;
    }

    pub fn output(&self) -> Option<&[Field]> {
        if self.cursor == 0 {
            return None;
        }
        self.rows.get(self.cursor - 1).map(Vec::as_slice)
    }
}

fn key_of(row: &[Field], column: usize) -> Result<Vec<u8>, ExecutorError> {
    let field = row.get(column).ok_or(ExecutorError::ColumnOutOfRange {
        index: column,
        width: row.len(),
    })?;
    let mut key = Vec::new();
    field.fingerprint(&mut key);
    Ok(key)
}
