//! An educational relational database engine.
//!
//! hivedb stores variable-length records on fixed-size slotted pages,
//! caches pages in a bounded buffer pool with scan-resistant 2Q
//! replacement and shared/exclusive page latching, and executes queries
//! through a pull-based (Volcano) operator tree.
//!
//! The SQL front end (lexer, parser, planner) is an external
//! collaborator: it composes [`executor::ExecutorNode`] trees against the
//! public operator constructors. This crate is the storage and execution
//! core underneath.
//!
//! Deliberate non-goals: transactions, crash recovery, schema
//! enforcement, secondary indexes, and query optimization.

pub mod executor;
pub mod heap;
pub mod storage;
