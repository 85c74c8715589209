//! `PhysicalConnection` implementation over `hdbconnect`.

use hdbconnect::{HdbResponse, HdbReturnValue, HdbValue, ResultSet};
use smartcommit::{DriverError, ExecOutcome, PhysicalConnection, Row, Value};

/// A synchronous HANA connection usable as the physical side of a
/// [`smartcommit::SmartConnection`].
#[derive(Debug)]
pub struct HdbPhysical {
    conn: hdbconnect::Connection,
}

impl HdbPhysical {
    /// Wraps an established HANA connection.
    #[must_use]
    pub const fn new(conn: hdbconnect::Connection) -> Self {
        Self { conn }
    }

    /// Releases the underlying driver connection.
    pub fn into_inner(self) -> hdbconnect::Connection {
        self.conn
    }

    fn prepared_response(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<HdbResponse, DriverError> {
        let mut stmt = self.conn.prepare(sql).map_err(DriverError::new)?;
        stmt.execute(&params).map_err(DriverError::new)
    }
}

/// Converts a HANA value to the wire-agnostic value type.
///
/// Decimals keep their full precision as strings; temporal and other exotic
/// types are rendered as strings as well.
fn value_from_hana(value: &HdbValue) -> Value {
    match value {
        HdbValue::NULL => Value::Null,
        HdbValue::BOOLEAN(b) => Value::Bool(*b),
        HdbValue::TINYINT(v) => Value::Int(i64::from(*v)),
        HdbValue::SMALLINT(v) => Value::Int(i64::from(*v)),
        HdbValue::INT(v) => Value::Int(i64::from(*v)),
        HdbValue::BIGINT(v) => Value::Int(*v),
        HdbValue::REAL(v) => Value::Float(f64::from(*v)),
        HdbValue::DOUBLE(v) => Value::Float(*v),
        HdbValue::STRING(s) => Value::String(s.clone()),
        HdbValue::BINARY(b) | HdbValue::GEOMETRY(b) | HdbValue::POINT(b) => {
            Value::Bytes(b.clone())
        }
        HdbValue::DECIMAL(d) => Value::String(d.to_string()),
        other => Value::String(format!("{other:?}")),
    }
}

fn rows_from_resultset(rs: ResultSet) -> Result<Vec<Row>, DriverError> {
    let mut rows = Vec::new();
    for row in rs {
        let row = row.map_err(DriverError::new)?;
        let mut values = Vec::with_capacity(row.len());
        for i in 0..row.len() {
            values.push(value_from_hana(&row[i]));
        }
        rows.push(values);
    }
    Ok(rows)
}

/// Reduces a driver response to the shape the classifier cares about.
fn outcome_from_response(response: HdbResponse) -> Result<ExecOutcome, DriverError> {
    for value in response.into_iter() {
        match value {
            HdbReturnValue::ResultSet(rs) => {
                return Ok(ExecOutcome::ResultSet(rows_from_resultset(rs)?));
            }
            HdbReturnValue::AffectedRows(counts) => {
                return Ok(ExecOutcome::RowsAffected(
                    counts.iter().map(|&n| n as u64).sum(),
                ));
            }
            _ => {}
        }
    }
    Ok(ExecOutcome::Success)
}

impl PhysicalConnection for HdbPhysical {
    fn set_auto_commit(&mut self, on: bool) -> Result<(), DriverError> {
        self.conn.set_auto_commit(on).map_err(DriverError::new)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.commit().map_err(DriverError::new)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn.rollback().map_err(DriverError::new)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let rs = if params.is_empty() {
            self.conn.query(sql).map_err(DriverError::new)?
        } else {
            self.prepared_response(sql, params)?
                .into_result_set()
                .map_err(DriverError::new)?
        };
        rows_from_resultset(rs)
    }

    fn update(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        if params.is_empty() {
            return self
                .conn
                .dml(sql)
                .map(|n| n as u64)
                .map_err(DriverError::new);
        }
        match outcome_from_response(self.prepared_response(sql, params)?)? {
            ExecOutcome::RowsAffected(n) => Ok(n),
            ExecOutcome::Success => Ok(0),
            ExecOutcome::ResultSet(_) => {
                Err(DriverError::msg("update statement produced a result set"))
            }
        }
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let response = if params.is_empty() {
            self.conn.statement(sql).map_err(DriverError::new)?
        } else {
            self.prepared_response(sql, params)?
        };
        outcome_from_response(response)
    }

    fn batch(&mut self, sql: &str, batches: &[Vec<Value>]) -> Result<u64, DriverError> {
        let mut stmt = self.conn.prepare(sql).map_err(DriverError::new)?;
        for params in batches {
            stmt.add_batch(&params).map_err(DriverError::new)?;
        }
        let response = stmt.execute_batch().map_err(DriverError::new)?;
        match outcome_from_response(response)? {
            ExecOutcome::RowsAffected(n) => Ok(n),
            _ => Ok(0),
        }
    }

    fn call(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError> {
        self.execute(sql, params)
    }
}
