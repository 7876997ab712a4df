//! Row printing sink.

use std::io::Write;

use crate::heap::Field;
use crate::storage::buffer::Replacer;
use crate::storage::io::Storage;

use super::ExecutorNode;
use super::error::ExecutorError;

/// Terminal sink that writes each pulled row to a text stream.
///
/// Rows are rendered as `", "`-separated field text, one row per line.
/// Commas inside text fields are not escaped (documented limitation).
/// Print exposes no output and must sit at the root of a tree.
pub struct PrintNode<S: Storage, R: Replacer> {
    child: Box<ExecutorNode<S, R>>,
    sink: Box<dyn Write + Send>,
}

impl<S: Storage, R: Replacer> PrintNode<S, R> {
    /// Wraps an input with the stream to print to.
    pub fn new(child: ExecutorNode<S, R>, sink: Box<dyn Write + Send>) -> Self {
        Self {
            child: Box::new(child),
            sink,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.child.open().await
    }

    /// Pulls one row and writes it; false when the input is exhausted.
    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        if !self.child.next().await? {
            return Ok(false);
        }

        let row = self.child.output().expect("child reported a row");
        let mut first = true;
        for field in row {
            if first {
                write!(self.sink, "{}", field)?;
                first = false;
            } else {
                write!(self.sink, ", {}", field)?;
            }
        }
        writeln!(self.sink)?;
        Ok(true)
    }

    pub fn close(&mut self) {
        self.child.close();
        let _ = self.sink.flush();
    }

    /// Print is a sink; it produces no rows.
    pub fn output(&self) -> Option<&[Field]> {
        None
    }
}
