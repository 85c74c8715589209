//! Read/write classification of statement executions.
//!
//! Classification happens before execution, from the declared statement kind
//! and the handle method the caller invoked. An intent that cannot be proven
//! read-only is treated as a write, so a possibly-mutating statement never
//! runs in autocommit mode. After execution the observed shape is re-derived
//! for diagnostics only; it is never used to retroactively disarm.

use crate::physical::ExecOutcome;

/// What the caller declared about a statement when preparing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a result set.
    Query,
    /// Reports an affected-row count.
    Update,
    /// Arbitrary SQL; result shape unknown until after execution.
    Generic,
}

/// Which execution entry point the caller used on the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallShape {
    Query,
    Update,
    Generic,
    Batch,
    Call,
}

/// Pre-execution classification of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementIntent {
    /// Provably read-only; may run in autocommit mode.
    Read,
    /// Mutates state; must run inside a transaction when one is requested.
    Write,
    /// Unknown until after execution; treated as a write before execution.
    Unclassified,
}

impl StatementIntent {
    /// Whether a deferred logical transaction must be armed before this
    /// statement runs.
    #[must_use]
    pub const fn requires_transaction(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// Classifies a statement from its declared kind and the entry point used.
///
/// Batched and stored-procedure invocations are writes unconditionally: there
/// is no static way to prove they do not mutate state.
pub(crate) const fn intent(kind: StatementKind, shape: CallShape) -> StatementIntent {
    match shape {
        CallShape::Query => StatementIntent::Read,
        CallShape::Update | CallShape::Batch | CallShape::Call => StatementIntent::Write,
        CallShape::Generic => match kind {
            StatementKind::Query => StatementIntent::Read,
            StatementKind::Update => StatementIntent::Write,
            StatementKind::Generic => StatementIntent::Unclassified,
        },
    }
}

/// Post-execution classification from the observed result shape.
///
/// Diagnostics only. A `Success` outcome stays classified as a write; DDL and
/// procedure calls without output give no evidence of being read-only.
pub(crate) const fn observed(outcome: &ExecOutcome) -> StatementIntent {
    match outcome {
        ExecOutcome::ResultSet(_) => StatementIntent::Read,
        ExecOutcome::RowsAffected(_) | ExecOutcome::Success => StatementIntent::Write,
    }
}
