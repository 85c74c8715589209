//! Per-operation statement handles.
//!
//! Every execution goes through a handle so the connection can intercept
//! read/write classification before the statement reaches the wire, and log
//! the observed classification afterwards.

use crate::classify::{self, CallShape, StatementKind};
use crate::connection::SmartConnection;
use crate::error::{Error, Result};
use crate::physical::{ExecOutcome, PhysicalConnection, Row, Value};

/// A statement bound to a [`SmartConnection`].
#[derive(Debug)]
pub struct Statement<'c, C: PhysicalConnection> {
    conn: &'c mut SmartConnection<C>,
    kind: StatementKind,
    sql: String,
    is_call: bool,
}

impl<'c, C: PhysicalConnection> Statement<'c, C> {
    pub(crate) fn new(conn: &'c mut SmartConnection<C>, kind: StatementKind, sql: String) -> Self {
        Self {
            conn,
            kind,
            sql,
            is_call: false,
        }
    }

    pub(crate) fn for_call(conn: &'c mut SmartConnection<C>, procname: &str) -> Result<Self> {
        validate_procedure_name(procname)?;
        Ok(Self {
            conn,
            kind: StatementKind::Generic,
            sql: procname.to_string(),
            is_call: true,
        })
    }

    /// The SQL text (or procedure name, for call handles).
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The kind declared when the statement was prepared.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Executes expecting a result set. Classified as a read: it may run in
    /// autocommit mode unless a transaction is already armed.
    pub fn execute_query(&mut self, params: &[Value]) -> Result<Vec<Row>> {
        self.conn
            .before_execute(classify::intent(self.kind, CallShape::Query))?;
        let rows = self
            .conn
            .physical_mut()
            .query(&self.sql, params)
            .map_err(Error::Execution)?;
        Ok(rows)
    }

    /// Executes expecting an affected-row count. Classified as a write.
    pub fn execute_update(&mut self, params: &[Value]) -> Result<u64> {
        self.conn
            .before_execute(classify::intent(self.kind, CallShape::Update))?;
        self.conn
            .physical_mut()
            .update(&self.sql, params)
            .map_err(Error::Execution)
    }

    /// Executes arbitrary SQL whose result shape is unknown until afterwards.
    ///
    /// Unless the handle was prepared with a known kind, the statement is
    /// treated as a write before execution: a possibly-mutating statement
    /// must never run in autocommit mode. The observed shape is logged for
    /// diagnostics but never disarms the transaction retroactively.
    pub fn execute(&mut self, params: &[Value]) -> Result<ExecOutcome> {
        if self.is_call {
            return self.execute_call(params);
        }
        let intent = classify::intent(self.kind, CallShape::Generic);
        self.conn.before_execute(intent)?;
        let outcome = self
            .conn
            .physical_mut()
            .execute(&self.sql, params)
            .map_err(Error::Execution)?;
        if intent == classify::StatementIntent::Unclassified {
            let observed = classify::observed(&outcome);
            tracing::debug!(sql = %self.sql, ?observed, "generic statement classified after execution");
        }
        Ok(outcome)
    }

    /// Executes the DML statement once per parameter set. Batches classify as
    /// writes unconditionally.
    pub fn execute_batch(&mut self, batches: &[Vec<Value>]) -> Result<u64> {
        self.conn
            .before_execute(classify::intent(self.kind, CallShape::Batch))?;
        self.conn
            .physical_mut()
            .batch(&self.sql, batches)
            .map_err(Error::Execution)
    }

    fn execute_call(&mut self, params: &[Value]) -> Result<ExecOutcome> {
        self.conn
            .before_execute(classify::intent(self.kind, CallShape::Call))?;
        let call_sql = build_call_statement(&self.sql, params.len());
        self.conn
            .physical_mut()
            .call(&call_sql, params)
            .map_err(Error::Execution)
    }
}

/// Validate a procedure name for safety and correctness.
fn validate_procedure_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidStatement(
            "procedure name cannot be empty".into(),
        ));
    }

    // Allow alphanumeric, underscores, dots (for schema.procedure) and the
    // identifier characters some databases permit; reject everything else.
    let is_valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$' || c == '#');
    if !is_valid {
        return Err(Error::InvalidStatement(format!(
            "invalid procedure name: {name}"
        )));
    }

    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(Error::InvalidStatement(format!(
            "invalid procedure name: {name}"
        )));
    }

    Ok(())
}

/// Build a CALL statement with the appropriate number of placeholders.
fn build_call_statement(procname: &str, param_count: usize) -> String {
    if param_count == 0 {
        format!("CALL {procname}()")
    } else {
        let placeholders = vec!["?"; param_count].join(", ");
        format!("CALL {procname}({placeholders})")
    }
}
