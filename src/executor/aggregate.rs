//! Hash aggregation: GROUP BY with COUNT/SUM/MIN/MAX.

use std::collections::HashMap;

use crate::heap::Field;
use crate::storage::buffer::Replacer;
use crate::storage::io::Storage;

use super::ExecutorNode;
use super::error::ExecutorError;

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Row count per group. The accumulator is an `Int32` starting at 1.
    Count,
    /// Numeric sum of the argument column. Text arguments are ignored.
    Sum,
    /// Minimum of the argument column under same-kind ordering.
    Min,
    /// Maximum of the argument column under same-kind ordering.
    Max,
}

/// One aggregate to compute: a function and its argument column.
#[derive(Debug, Clone, Copy)]
pub struct AggregateSpec {
    pub function: AggregateFunction,
    /// Zero-based argument column. Ignored by `Count`.
    pub column: usize,
}

impl AggregateSpec {
    pub fn new(function: AggregateFunction, column: usize) -> Self {
        Self { function, column }
    }
}

/// One group's key fields and accumulator fields.
struct Group {
    values: Vec<Field>,
    accumulators: Vec<Field>,
}

/// Blocking operator that groups its input and computes aggregates.
///
/// `open` consumes the whole input, maintaining one [`Group`] per distinct
/// key; `next` then emits one row per group in insertion order, shaped
/// `[group_values..., accumulators...]`. Group keys are concatenated
/// structural fingerprints, which are length-delimited, so `("ab", "c")`
/// and `("a", "bc")` form different groups.
///
/// An empty group-by list aggregates everything into one group. Memory is
/// O(distinct groups); there is no spilling.
///
/// Type policy: SUM ignores text and mismatched kinds, MIN/MAX leave the
/// accumulator unchanged on a kind mismatch; either case emits one
/// diagnostic per query.
pub struct HashAggregateNode<S: Storage, R: Replacer> {
    child: Box<ExecutorNode<S, R>>,
    group_by: Vec<usize>,
    aggregates: Vec<AggregateSpec>,
    groups: Vec<Group>,
    index: HashMap<Vec<u8>, usize>,
    cursor: usize,
    current: Option<Vec<Field>>,
    mismatch_reported: bool,
}

impl<S: Storage, R: Replacer> HashAggregateNode<S, R> {
    /// Creates an aggregation of `child` by `group_by` columns.
    pub fn new(
        child: ExecutorNode<S, R>,
        group_by: Vec<usize>,
        aggregates: Vec<AggregateSpec>,
    ) -> Self {
        Self {
            child: Box::new(child),
            group_by,
            aggregates,
            groups: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            current: None,
            mismatch_reported: false,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.groups.clear();
        self.index.clear();
        self.cursor = 0;
        self.current = None;

        self.child.open().await?;
        while self.child.next().await? {
            let row = self.child.output().expect("child reported a row").to_vec();

            let mut key = Vec::new();
            let mut values = Vec::with_capacity(self.group_by.len());
            for &column in &self.group_by {
                let field = row.get(column).ok_or(ExecutorError::ColumnOutOfRange {
                    index: column,
                    width: row.len(),
                })?;
                field.fingerprint(&mut key);
                values.push(field.clone());
            }

            match self.index.get(&key).copied() {
                None => {
                    let accumulators = init_accumulators(&self.aggregates, &row)?;
                    self.index.insert(key, self.groups.len());
                    self.groups.push(Group {
                        values,
                        accumulators,
                    });
                }
                Some(at) => {
                    let group = &mut self.groups[at];
                    let mut mismatch = false;
                    for (spec, acc) in self.aggregates.iter().zip(&mut group.accumulators) {
                        mismatch |= update_accumulator(spec, acc, &row)?;
                    }
                    if mismatch && !self.mismatch_reported {
                        self.mismatch_reported = true;
                        tracing::warn!("aggregate argument kind mismatch; value ignored");
                    }
                }
            }
        }
        self.child.close();

        Ok(())
    }

    /// Emits one group per call, in group insertion order.
    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        let Some(group) = self.groups.get(self.cursor) else {
            self.current = None;
            return Ok(false);
        };
        let mut row = group.values.clone();
        row.extend(group.accumulators.iter().cloned());
        self.current = Some(row);
        self.cursor += 1;
        Ok(true)
    }

    pub fn close(&mut self) {
        self.child.close();
        self.groups.clear();
        self.index.clear();
        self.cursor = 0;
        self.current = None;
    }

    pub fn output(&self) -> Option<&[Field]> {
        self.current.as_deref()
    }
}

/// Builds the accumulators for a group's first row: COUNT starts at 1,
/// the other functions start from the argument value itself.
fn init_accumulators(
    aggregates: &[AggregateSpec],
    row: &[Field],
) -> Result<Vec<Field>, ExecutorError> {
    let mut accumulators = Vec::with_capacity(aggregates.len());
    for spec in aggregates {
        let acc = match spec.function {
            AggregateFunction::Count => Field::Int32(1),
            AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => row
                .get(spec.column)
                .ok_or(ExecutorError::ColumnOutOfRange {
                    index: spec.column,
                    width: row.len(),
                })?
                .clone(),
        };
        accumulators.push(acc);
    }
    Ok(accumulators)
}

/// Folds one row into an accumulator. Returns true if the update was
/// dropped because of a kind mismatch.
fn update_accumulator(
    spec: &AggregateSpec,
    acc: &mut Field,
    row: &[Field],
) -> Result<bool, ExecutorError> {
    if spec.function == AggregateFunction::Count {
        if let Field::Int32(n) = acc {
            *n += 1;
        }
        return Ok(false);
    }

    let arg = row.get(spec.column).ok_or(ExecutorError::ColumnOutOfRange {
        index: spec.column,
        width: row.len(),
    })?;

    let ignored = match spec.function {
        AggregateFunction::Count => unreachable!("handled above"),
        AggregateFunction::Sum => !acc.accumulate_sum(arg),
        AggregateFunction::Min => {
            if arg.same_kind_cmp(acc) == Some(std::cmp::Ordering::Less) {
                *acc = arg.clone();
            }
            arg.kind() != acc.kind()
        }
        AggregateFunction::Max => {
            if arg.same_kind_cmp(acc) == Some(std::cmp::Ordering::Greater) {
                *acc = arg.clone();
            }
            arg.kind() != acc.kind()
        }
    };
    Ok(ignored)
}
