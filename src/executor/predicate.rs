//! Predicate trees for row filtering.
//!
//! A predicate is a tree of comparisons combined by AND/OR. Leaves compare
//! two operands (literal fields or column references) and combinators
//! apply short-circuit boolean logic. Predicates are immutable after
//! construction and safe to evaluate from several queries at once.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::heap::Field;

/// Comparison operators for predicate leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean combinators for predicate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// One side of a comparison: a constant or a column of the current row.
#[derive(Debug)]
pub enum Operand {
    /// A literal value owned by the predicate.
    Literal(Field),
    /// A zero-based column index into the row under evaluation.
    Column(usize),
}

/// A predicate tree node.
///
/// Comparing fields of different kinds yields `false` and emits one
/// diagnostic per node for the lifetime of the predicate (i.e. at most
/// once per query), as does a column reference outside the row.
pub enum Predicate {
    /// A comparison leaf.
    Comparison {
        left: Operand,
        right: Operand,
        op: ComparisonOp,
        /// Set once the first mismatch diagnostic has been emitted.
        mismatch_reported: AtomicBool,
    },
    /// An AND/OR over child predicates. An empty AND is true; an empty OR
    /// is false.
    Combinator {
        op: LogicOp,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    /// Builds a comparison leaf.
    pub fn comparison(left: Operand, op: ComparisonOp, right: Operand) -> Self {
        Predicate::Comparison {
            left,
            right,
            op,
            mismatch_reported: AtomicBool::new(false),
        }
    }

    /// Builds an AND over children.
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::Combinator {
            op: LogicOp::And,
            children,
        }
    }

    /// Builds an OR over children.
    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Combinator {
            op: LogicOp::Or,
            children,
        }
    }

    /// Evaluates the predicate against a row.
    pub fn evaluate(&self, row: &[Field]) -> bool {
        match self {
            Predicate::Comparison {
                left,
                right,
                op,
                mismatch_reported,
            } => {
                let (Some(lhs), Some(rhs)) = (resolve(left, row), resolve(right, row)) else {
                    report_once(mismatch_reported, "column reference outside the row");
                    return false;
                };
                match compare_fields(*op, lhs, rhs) {
                    Some(result) => result,
                    None => {
                        report_once(mismatch_reported, "comparison between different kinds");
                        false
                    }
                }
            }
            Predicate::Combinator {
                op: LogicOp::And,
                children,
            } => children.iter().all(|child| child.evaluate(row)),
            Predicate::Combinator {
                op: LogicOp::Or,
                children,
            } => children.iter().any(|child| child.evaluate(row)),
        }
    }
}

fn resolve<'a>(operand: &'a Operand, row: &'a [Field]) -> Option<&'a Field> {
    match operand {
        Operand::Literal(field) => Some(field),
        Operand::Column(index) => row.get(*index),
    }
}

fn report_once(reported: &AtomicBool, message: &str) {
    if !reported.swap(true, Ordering::Relaxed) {
        tracing::warn!("predicate evaluates to false: {}", message);
    }
}

/// Applies a comparison to same-kind fields; `None` signals a kind
/// mismatch. Float comparisons follow IEEE semantics (`NaN != NaN` is
/// true, every ordered comparison with NaN is false).
fn compare_fields(op: ComparisonOp, lhs: &Field, rhs: &Field) -> Option<bool> {
    match (lhs, rhs) {
        (Field::Int32(a), Field::Int32(b)) => Some(apply(op, a, b)),
        (Field::Float32(a), Field::Float32(b)) => Some(apply(op, a, b)),
        (Field::Text(a), Field::Text(b)) => Some(apply(op, a, b)),
        _ => None,
    }
}

fn apply<T: PartialOrd>(op: ComparisonOp, a: T, b: T) -> bool {
    match op {
        ComparisonOp::Eq => a == b,
        ComparisonOp::Ne => a != b,
        ComparisonOp::Lt => a < b,
        ComparisonOp::Le => a <= b,
        ComparisonOp::Gt => a > b,
        ComparisonOp::Ge => a >= b,
    }
}
