//! Volcano-style query execution.
//!
//! Queries run as a tree of operators pulling rows from their children one
//! at a time. Every operator follows the same four-call contract:
//!
//! - `open` initializes state and opens children. Blocking phases (join
//!   build/probe, aggregation) run here.
//! - `next` advances to the next output row and reports whether one
//!   exists. Once it returns false it keeps returning false until `close`
//!   and a fresh `open`. Errors abort the query; there is no
//!   partial-failure recovery.
//! - `output` exposes the row produced by the most recent successful
//!   `next`; it is meaningful only until the following `next` or `close`.
//!   Sinks (Insert, Print) expose nothing.
//! - `close` releases resources (including any pinned page), closes
//!   children, and is idempotent and safe after a failed `open`.
//!
//! Operators own their inputs, so a tree is a value whose root owns the
//! rest. Leaf operators hold a cheap clone of the [`BufferPool`] handle;
//! the pool outlives every query. Execution is single-threaded per query
//! (one caller pulls the tree) while the pool below supports concurrent
//! queries.
//!
//! Dispatch is by enum rather than `dyn` objects: the set of operators is
//! small and fixed, and recursion through child nodes goes through one
//! boxed future per call (`ExecutorNode` is self-referential otherwise).
//!
//! # Example
//!
//! ```no_run
//! use hivedb::executor::{ComparisonOp, ExecutorNode, Operand, Predicate};
//! use hivedb::heap::Field;
//! use hivedb::storage::MemoryStorage;
//! use hivedb::storage::buffer::{BufferPool, TwoQReplacer};
//!
//! # async fn example() -> Result<(), hivedb::executor::ExecutorError> {
//! let pool = BufferPool::new(MemoryStorage::new(), TwoQReplacer::new(), 10);
//!
//! // SELECT col1 FROM students WHERE col2 > 25
//! let mut tree = ExecutorNode::project(
//!     ExecutorNode::filter(
//!         ExecutorNode::scan(pool, Some("students".into())),
//!         Predicate::comparison(
//!             Operand::Column(2),
//!             ComparisonOp::Gt,
//!             Operand::Literal(Field::Int32(25)),
//!         ),
//!     ),
//!     vec![1],
//! );
//!
//! tree.open().await?;
//! while tree.next().await? {
//!     let row = tree.output().expect("row available after next");
//!     println!("{:?}", row);
//! }
//! tree.close();
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod error;
mod filter;
mod insert;
mod join;
mod predicate;
mod print;
mod project;
mod scan;

pub use aggregate::{AggregateFunction, AggregateSpec, HashAggregateNode};
pub use error::ExecutorError;
pub use filter::FilterNode;
pub use insert::InsertNode;
pub use join::HashJoinNode;
pub use predicate::{ComparisonOp, LogicOp, Operand, Predicate};
pub use print::PrintNode;
pub use project::ProjectNode;
pub use scan::ScanNode;

use std::future::Future;
use std::pin::Pin;

use crate::heap::{Field, Record};
use crate::storage::buffer::{BufferPool, Replacer};
use crate::storage::io::Storage;

/// A query operator tree node.
pub enum ExecutorNode<S: Storage, R: Replacer> {
    /// Full scan of the database, optionally filtered to one relation.
    Scan(ScanNode<S, R>),
    /// Predicate filter over one input.
    Filter(FilterNode<S, R>),
    /// Column projection over one input.
    Project(ProjectNode<S, R>),
    /// Inner equi-join of two inputs.
    HashJoin(HashJoinNode<S, R>),
    /// GROUP BY with aggregates over one input.
    HashAggregate(HashAggregateNode<S, R>),
    /// Record insertion sink.
    Insert(InsertNode<S, R>),
    /// Row printing sink.
    Print(PrintNode<S, R>),
}

impl<S: Storage, R: Replacer> ExecutorNode<S, R> {
    /// Builds a scan leaf. With a relation tag, only records whose last
    /// field matches are produced, with the tag stripped.
    pub fn scan(pool: BufferPool<S, R>, relation: Option<String>) -> Self {
        ExecutorNode::Scan(ScanNode::new(pool, relation))
    }

    /// Builds a filter over `input`.
    pub fn filter(input: Self, predicate: Predicate) -> Self {
        ExecutorNode::Filter(FilterNode::new(input, predicate))
    }

    /// Builds a projection of `input` onto `columns`.
    pub fn project(input: Self, columns: Vec<usize>) -> Self {
        ExecutorNode::Project(ProjectNode::new(input, columns))
    }

    /// Builds an inner equi-join of `left` and `right`.
    pub fn hash_join(left: Self, right: Self, left_column: usize, right_column: usize) -> Self {
        ExecutorNode::HashJoin(HashJoinNode::new(left, right, left_column, right_column))
    }

    /// Builds a grouped aggregation over `input`.
    pub fn hash_aggregate(
        input: Self,
        group_by: Vec<usize>,
        aggregates: Vec<AggregateSpec>,
    ) -> Self {
        ExecutorNode::HashAggregate(HashAggregateNode::new(input, group_by, aggregates))
    }

    /// Builds an insert sink. Feed it through [`ExecutorNode::set_record`].
    pub fn insert(pool: BufferPool<S, R>) -> Self {
        ExecutorNode::Insert(InsertNode::new(pool))
    }

    /// Builds a print sink writing to `sink`.
    pub fn print(input: Self, sink: Box<dyn std::io::Write + Send>) -> Self {
        ExecutorNode::Print(PrintNode::new(input, sink))
    }

    /// Sets the pending record of an Insert sink.
    ///
    /// # Panics
    ///
    /// Panics if this node is not an Insert; only the insert sink accepts
    /// records.
    pub fn set_record(&mut self, record: Record) {
        match self {
            ExecutorNode::Insert(node) => node.set_record(record),
            _ => panic!("set_record called on a non-insert operator"),
        }
    }

    /// Initializes the operator and its children.
    ///
    /// Must be called before the first `next`. Boxed to break the
    /// recursive future cycle (node -> child -> node).
    pub fn open(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExecutorError>> + Send + '_>> {
        Box::pin(async move {
            match self {
                ExecutorNode::Scan(n) => n.open().await,
                ExecutorNode::Filter(n) => n.open().await,
                ExecutorNode::Project(n) => n.open().await,
                ExecutorNode::HashJoin(n) => n.open().await,
                ExecutorNode::HashAggregate(n) => n.open().await,
                ExecutorNode::Insert(n) => n.open().await,
                ExecutorNode::Print(n) => n.open().await,
            }
        })
    }

    /// Advances to the next row; false once the stream is exhausted.
    pub fn next(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<bool, ExecutorError>> + Send + '_>> {
        Box::pin(async move {
            match self {
                ExecutorNode::Scan(n) => n.next().await,
                ExecutorNode::Filter(n) => n.next().await,
                ExecutorNode::Project(n) => n.next().await,
                ExecutorNode::HashJoin(n) => n.next().await,
                ExecutorNode::HashAggregate(n) => n.next().await,
                ExecutorNode::Insert(n) => n.next().await,
                ExecutorNode::Print(n) => n.next().await,
            }
        })
    }

    /// Releases resources and closes children. Idempotent.
    pub fn close(&mut self) {
        match self {
            ExecutorNode::Scan(n) => n.close(),
            ExecutorNode::Filter(n) => n.close(),
            ExecutorNode::Project(n) => n.close(),
            ExecutorNode::HashJoin(n) => n.close(),
            ExecutorNode::HashAggregate(n) => n.close(),
            ExecutorNode::Insert(n) => n.close(),
            ExecutorNode::Print(n) => n.close(),
        }
    }

    /// The row produced by the most recent successful `next`, or `None`
    /// for sinks and exhausted streams.
    pub fn output(&self) -> Option<&[Field]> {
        match self {
            ExecutorNode::Scan(n) => n.output(),
            ExecutorNode::Filter(n) => n.output(),
            ExecutorNode::Project(n) => n.output(),
            ExecutorNode::HashJoin(n) => n.output(),
            ExecutorNode::HashAggregate(n) => n.output(),
            ExecutorNode::Insert(n) => n.output(),
            ExecutorNode::Print(n) => n.output(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::buffer::TwoQReplacer;

    type TestPool = BufferPool<MemoryStorage, TwoQReplacer>;

    fn pool() -> TestPool {
        BufferPool::new(MemoryStorage::new(), TwoQReplacer::new(), 10)
    }

    async fn load(pool: &TestPool, rows: Vec<Vec<Field>>) {
        let mut insert = ExecutorNode::insert(pool.clone());
        insert.open().await.unwrap();
        for fields in rows {
            insert.set_record(Record::new(fields));
            assert!(insert.next().await.unwrap());
        }
        insert.close();
    }

    async fn collect(tree: &mut ExecutorNode<MemoryStorage, TwoQReplacer>) -> Vec<Vec<Field>> {
        tree.open().await.unwrap();
        let mut rows = Vec::new();
        while tree.next().await.unwrap() {
            rows.push(tree.output().expect("row after successful next").to_vec());
        }
        tree.close();
        rows
    }

    #[tokio::test]
    async fn test_filter_project_composition() {
        let pool = pool();
        load(
            &pool,
            vec![
                vec![Field::Int32(1), Field::Text("keep".into()), Field::Int32(30)],
                vec![Field::Int32(2), Field::Text("drop".into()), Field::Int32(10)],
                vec![Field::Int32(3), Field::Text("keep2".into()), Field::Int32(40)],
            ],
        )
        .await;

        let mut tree = ExecutorNode::project(
            ExecutorNode::filter(
                ExecutorNode::scan(pool, None),
                Predicate::comparison(
                    Operand::Column(2),
                    ComparisonOp::Gt,
                    Operand::Literal(Field::Int32(20)),
                ),
            ),
            vec![1],
        );

        let rows = collect(&mut tree).await;
        assert_eq!(
            rows,
            vec![
                vec![Field::Text("keep".into())],
                vec![Field::Text("keep2".into())],
            ]
        );
    }

    #[tokio::test]
    async fn test_project_out_of_range_is_fatal() {
        let pool = pool();
        load(&pool, vec![vec![Field::Int32(1)]]).await;

        let mut tree = ExecutorNode::project(ExecutorNode::scan(pool, None), vec![5]);
        tree.open().await.unwrap();
        let result = tree.next().await;
        assert!(matches!(
            result,
            Err(ExecutorError::ColumnOutOfRange { index: 5, width: 1 })
        ));
        tree.close();
    }

    #[tokio::test]
    async fn test_hash_join_matches() {
        let pool = pool();
        load(
            &pool,
            vec![
                vec![Field::Int32(1), Field::Text("A".into()), Field::Text("l".into())],
                vec![Field::Int32(2), Field::Text("B".into()), Field::Text("l".into())],
                vec![Field::Int32(1), Field::Int32(100), Field::Text("r".into())],
                vec![Field::Int32(1), Field::Int32(200), Field::Text("r".into())],
                vec![Field::Int32(3), Field::Int32(300), Field::Text("r".into())],
            ],
        )
        .await;

        let mut tree = ExecutorNode::hash_join(
            ExecutorNode::scan(pool.clone(), Some("l".into())),
            ExecutorNode::scan(pool, Some("r".into())),
            0,
            0,
        );

        let rows = collect(&mut tree).await;
        assert_eq!(
            rows,
            vec![
                vec![
                    Field::Int32(1),
                    Field::Text("A".into()),
                    Field::Int32(1),
                    Field::Int32(100),
                ],
                vec![
                    Field::Int32(1),
                    Field::Text("A".into()),
                    Field::Int32(1),
                    Field::Int32(200),
                ],
            ]
        );
    }

    #[tokio::test]
    async fn test_join_key_is_structural() {
        let pool = pool();
        // Int32(1) on the left, Float32(1.0) on the right: text rendering
        // would collide ("1"), structural keys must not.
        load(
            &pool,
            vec![
                vec![Field::Int32(1), Field::Text("l".into())],
                vec![Field::Float32(1.0), Field::Text("r".into())],
            ],
        )
        .await;

        let mut tree = ExecutorNode::hash_join(
            ExecutorNode::scan(pool.clone(), Some("l".into())),
            ExecutorNode::scan(pool, Some("r".into())),
            0,
            0,
        );
        assert!(collect(&mut tree).await.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_group_sums() {
        let pool = pool();
        load(
            &pool,
            vec![
                vec![Field::Text("Alice".into()), Field::Int32(100)],
                vec![Field::Text("Bob".into()), Field::Int32(200)],
                vec![Field::Text("Alice".into()), Field::Int32(50)],
            ],
        )
        .await;

        let mut tree = ExecutorNode::hash_aggregate(
            ExecutorNode::scan(pool, None),
            vec![0],
            vec![
                AggregateSpec::new(AggregateFunction::Sum, 1),
                AggregateSpec::new(AggregateFunction::Count, 1),
            ],
        );

        // Groups come out in insertion order.
        let rows = collect(&mut tree).await;
        assert_eq!(
            rows,
            vec![
                vec![Field::Text("Alice".into()), Field::Int32(150), Field::Int32(2)],
                vec![Field::Text("Bob".into()), Field::Int32(200), Field::Int32(1)],
            ]
        );
    }

    #[tokio::test]
    async fn test_aggregate_min_max() {
        let pool = pool();
        load(
            &pool,
            vec![
                vec![Field::Int32(5)],
                vec![Field::Int32(-3)],
                vec![Field::Int32(12)],
            ],
        )
        .await;

        let mut tree = ExecutorNode::hash_aggregate(
            ExecutorNode::scan(pool, None),
            vec![],
            vec![
                AggregateSpec::new(AggregateFunction::Min, 0),
                AggregateSpec::new(AggregateFunction::Max, 0),
                AggregateSpec::new(AggregateFunction::Count, 0),
            ],
        );

        let rows = collect(&mut tree).await;
        assert_eq!(
            rows,
            vec![vec![Field::Int32(-3), Field::Int32(12), Field::Int32(3)]]
        );
    }

    #[tokio::test]
    async fn test_aggregate_group_keys_do_not_concatenate() {
        let pool = pool();
        // ("ab","c") and ("a","bc") must form two distinct groups even
        // though their concatenated text is equal.
        load(
            &pool,
            vec![
                vec![Field::Text("ab".into()), Field::Text("c".into()), Field::Int32(1)],
                vec![Field::Text("a".into()), Field::Text("bc".into()), Field::Int32(1)],
            ],
        )
        .await;

        let mut tree = ExecutorNode::hash_aggregate(
            ExecutorNode::scan(pool, None),
            vec![0, 1],
            vec![AggregateSpec::new(AggregateFunction::Count, 2)],
        );

        let rows = collect(&mut tree).await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row[2] == Field::Int32(1)));
    }

    #[tokio::test]
    async fn test_print_writes_rows() {
        let pool = pool();
        load(
            &pool,
            vec![
                vec![Field::Int32(1), Field::Text("a".into()), Field::Float32(1.5)],
                vec![Field::Int32(2), Field::Text("b".into()), Field::Float32(2.5)],
            ],
        )
        .await;

        // Drive the sink to exhaustion, then inspect what it wrote.
        let buffer = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        struct SharedSink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl std::io::Write for SharedSink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut tree = ExecutorNode::print(
            ExecutorNode::scan(pool, None),
            Box::new(SharedSink(buffer.clone())),
        );
        tree.open().await.unwrap();
        while tree.next().await.unwrap() {
            assert!(tree.output().is_none());
        }
        tree.close();

        let written = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "1, a, 1.5\n2, b, 2.5\n");
    }

    #[tokio::test]
    async fn test_exhausted_tree_stays_exhausted() {
        let pool = pool();
        load(&pool, vec![vec![Field::Int32(1)]]).await;

        let mut tree = ExecutorNode::filter(
            ExecutorNode::scan(pool, None),
            Predicate::and(vec![]),
        );
        tree.open().await.unwrap();
        assert!(tree.next().await.unwrap());
        assert!(!tree.next().await.unwrap());
        assert!(!tree.next().await.unwrap());
        tree.close();
        // close is idempotent
        tree.close();
    }
}
