//! Test support: a scripted in-memory physical connection.
//!
//! [`MockConnection`] journals every physical call and lets tests inject
//! failures and canned results, so the state machine can be driven without a
//! database. The journal lives behind an `Arc` so the test keeps a
//! [`MockHandle`] while the connection itself is owned by the wrapper.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DriverError;
use crate::physical::{ExecOutcome, PhysicalConnection, Row, Value};

/// One physical call, as recorded in the journal.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalOp {
    /// `set_auto_commit(bool)` reached the wire.
    SetAutoCommit(bool),
    /// A physical commit.
    Commit,
    /// A physical rollback.
    Rollback,
    /// A query-shaped execution.
    Query(String),
    /// An update-shaped execution.
    Update(String),
    /// A generic execution.
    Execute(String),
    /// A batched execution.
    Batch(String),
    /// A stored-procedure call.
    Call(String),
}

#[derive(Debug, Default)]
struct MockState {
    ops: Vec<PhysicalOp>,
    autocommit: bool,
    fail_set_auto_commit: bool,
    fail_commit: bool,
    fail_rollback: bool,
    fail_next_statement: bool,
    canned_rows: VecDeque<Vec<Row>>,
    canned_outcomes: VecDeque<ExecOutcome>,
    canned_counts: VecDeque<u64>,
}

impl MockState {
    fn take_statement_failure(&mut self) -> Result<(), DriverError> {
        if self.fail_next_statement {
            self.fail_next_statement = false;
            return Err(DriverError::msg("injected statement failure"));
        }
        Ok(())
    }
}

/// Handle the test keeps to observe and script the mock.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    inner: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Every physical call served so far, in order.
    #[must_use]
    pub fn ops(&self) -> Vec<PhysicalOp> {
        self.inner.lock().ops.clone()
    }

    /// Current value of the mock's autocommit flag.
    #[must_use]
    pub fn autocommit(&self) -> bool {
        self.inner.lock().autocommit
    }

    /// Makes every subsequent `set_auto_commit` fail.
    pub fn fail_set_auto_commit(&self) {
        self.inner.lock().fail_set_auto_commit = true;
    }

    /// Makes every subsequent physical commit fail.
    pub fn fail_commit(&self) {
        self.inner.lock().fail_commit = true;
    }

    /// Makes every subsequent physical rollback fail.
    pub fn fail_rollback(&self) {
        self.inner.lock().fail_rollback = true;
    }

    /// Makes the next statement execution fail (once).
    pub fn fail_next_statement(&self) {
        self.inner.lock().fail_next_statement = true;
    }

    /// Queues a result set for the next query execution.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.inner.lock().canned_rows.push_back(rows);
    }

    /// Queues an outcome for the next generic or call execution.
    pub fn push_outcome(&self, outcome: ExecOutcome) {
        self.inner.lock().canned_outcomes.push_back(outcome);
    }

    /// Queues an affected-row count for the next update or batch execution.
    pub fn push_count(&self, count: u64) {
        self.inner.lock().canned_counts.push_back(count);
    }
}

/// In-memory stand-in for a real database connection.
#[derive(Debug)]
pub struct MockConnection {
    inner: Arc<Mutex<MockState>>,
}

impl MockConnection {
    /// Creates a mock plus the handle used to observe and script it.
    ///
    /// The mock starts with its autocommit flag off so that the wrapper's
    /// initial `set_auto_commit(true)` is observable in the journal.
    #[must_use]
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                inner: Arc::clone(&handle.inner),
            },
            handle,
        )
    }
}

impl PhysicalConnection for MockConnection {
    fn set_auto_commit(&mut self, on: bool) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::SetAutoCommit(on));
        if state.fail_set_auto_commit {
            return Err(DriverError::msg("injected set_auto_commit failure"));
        }
        state.autocommit = on;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Commit);
        if state.fail_commit {
            return Err(DriverError::msg("injected commit failure"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Rollback);
        if state.fail_rollback {
            return Err(DriverError::msg("injected rollback failure"));
        }
        Ok(())
    }

    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Query(sql.to_string()));
        state.take_statement_failure()?;
        Ok(state.canned_rows.pop_front().unwrap_or_default())
    }

    fn update(&mut self, sql: &str, _params: &[Value]) -> Result<u64, DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Update(sql.to_string()));
        state.take_statement_failure()?;
        Ok(state.canned_counts.pop_front().unwrap_or(1))
    }

    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Execute(sql.to_string()));
        state.take_statement_failure()?;
        Ok(state
            .canned_outcomes
            .pop_front()
            .unwrap_or(ExecOutcome::Success))
    }

    fn batch(&mut self, sql: &str, batches: &[Vec<Value>]) -> Result<u64, DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Batch(sql.to_string()));
        state.take_statement_failure()?;
        Ok(state
            .canned_counts
            .pop_front()
            .unwrap_or(batches.len() as u64))
    }

    fn call(&mut self, sql: &str, _params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let mut state = self.inner.lock();
        state.ops.push(PhysicalOp::Call(sql.to_string()));
        state.take_statement_failure()?;
        Ok(state
            .canned_outcomes
            .pop_front()
            .unwrap_or(ExecOutcome::Success))
    }
}
