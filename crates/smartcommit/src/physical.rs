//! The seam between the state machine and the real database driver.
//!
//! [`SmartConnection`](crate::SmartConnection) never talks to the wire
//! directly; everything goes through [`PhysicalConnection`]. The trait is
//! synchronous and assumes exclusive ownership: one physical connection is
//! wrapped by exactly one smart connection, and no operation on it is
//! concurrent (see the pool module for how borrows are serialized).

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// A single SQL parameter or column value.
///
/// Serde-serializable so adapters can bind parameters through serde-based
/// drivers without an extra conversion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer type, widened.
    Int(i64),
    /// Any floating-point type, widened.
    Float(f64),
    /// Character data, including decimals and temporals rendered as text.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

/// One row of a result set.
pub type Row = Vec<Value>;

/// What a generic execution turned out to produce, revealed only after the
/// statement ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The statement produced a result set.
    ResultSet(Vec<Row>),
    /// The statement reported an affected-row count.
    RowsAffected(u64),
    /// The statement succeeded without rows or a count (DDL, some calls).
    Success,
}

/// A real database connection with a single autocommit flag.
///
/// Implementations block on network I/O; cancellation is whatever timeout the
/// underlying driver honors. A timeout inside `set_auto_commit`, `commit` or
/// `rollback` is reported as an error and treated by the caller as a failed
/// transition.
pub trait PhysicalConnection {
    /// Flips the physical autocommit flag.
    fn set_auto_commit(&mut self, on: bool) -> Result<(), DriverError>;

    /// Commits the open physical transaction.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Rolls back the open physical transaction.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Runs a statement that is expected to produce a result set.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Runs a statement that is expected to report an affected-row count.
    fn update(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError>;

    /// Runs arbitrary SQL whose result shape is unknown until after execution.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError>;

    /// Runs a DML statement once per parameter set.
    fn batch(&mut self, sql: &str, batches: &[Vec<Value>]) -> Result<u64, DriverError>;

    /// Invokes a stored procedure via an already-built CALL statement.
    fn call(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError>;
}
