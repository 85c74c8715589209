//! The deferred-transaction connection state machine.
//!
//! A [`SmartConnection`] decorates one physical connection and keeps it in
//! autocommit mode for as long as possible. Requesting a logical transaction
//! changes nothing physically; the first write (or possible write) arms a
//! real transaction, and the logical commit/rollback disarms it again.
//! Read-only prefixes of a logical transaction therefore run lock-free, while
//! every statement after the first write stays inside the same physical
//! transaction so it observes the transaction's own uncommitted writes.

use crate::classify::{StatementIntent, StatementKind};
use crate::error::{Error, Result};
use crate::mode::{Disposition, ModeController};
use crate::physical::{ExecOutcome, PhysicalConnection, Row};
use crate::state::TxnState;
use crate::statement::Statement;

/// Deferred-transaction decorator over a physical connection.
///
/// Used by at most one logical caller at a time; all methods take `&mut self`
/// and the instance needs no internal locking.
#[derive(Debug)]
pub struct SmartConnection<C> {
    controller: ModeController<C>,
    state: TxnState,
}

impl<C: PhysicalConnection> SmartConnection<C> {
    /// Wraps a physical connection, forcing it into autocommit mode.
    pub fn new(physical: C) -> Result<Self> {
        Ok(Self {
            controller: ModeController::new(physical)?,
            state: TxnState::Plain,
        })
    }

    /// Current state of the state machine.
    #[must_use]
    pub const fn state(&self) -> &TxnState {
        &self.state
    }

    /// Last known autocommit mode of the physical connection. No I/O.
    ///
    /// This is the introspection hook callers use to assert that reads before
    /// the first write really ran in autocommit mode.
    #[must_use]
    pub const fn physical_autocommit_mode(&self) -> bool {
        self.controller.physical_autocommit()
    }

    /// Sets the caller's autocommit intent.
    ///
    /// Leaving autocommit mode only records the intent; nothing happens
    /// physically until a write occurs. Turning autocommit back on while a
    /// transaction is armed implicitly commits it, mirroring the usual
    /// connection-API rule.
    pub fn set_autocommit(&mut self, on: bool) -> Result<()> {
        self.ensure_usable()?;
        match (&self.state, on) {
            (TxnState::Plain, false) => {
                self.state = TxnState::Deferred;
                tracing::debug!("logical transaction requested, physical transaction deferred");
            }
            (TxnState::Deferred, true) => {
                // No transaction was ever armed; the physical flag was never
                // touched.
                self.state = TxnState::Plain;
                tracing::debug!("logical transaction ended without writes");
            }
            (TxnState::Active, true) => {
                self.disarm_to(TxnState::Plain, Disposition::Commit)?;
            }
            _ => {} // requested mode already in effect
        }
        Ok(())
    }

    /// Ends the logical transaction with a commit.
    ///
    /// Disarms the physical transaction if one was armed; otherwise a no-op.
    /// The autocommit intent stays off, so the next write lazily arms a fresh
    /// transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.state == TxnState::Active {
            self.disarm_to(TxnState::Deferred, Disposition::Commit)?;
        }
        Ok(())
    }

    /// Ends the logical transaction with a rollback. Same state handling as
    /// [`commit`](Self::commit), with a physical rollback instead.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.state == TxnState::Active {
            self.disarm_to(TxnState::Deferred, Disposition::Rollback)?;
        }
        Ok(())
    }

    /// Creates a statement handle bound to this connection.
    pub fn prepare(&mut self, kind: StatementKind, sql: impl Into<String>) -> Statement<'_, C> {
        Statement::new(self, kind, sql.into())
    }

    /// Creates a handle for a stored-procedure invocation.
    ///
    /// The procedure name is validated here; the CALL statement is built at
    /// execution time from the parameter count.
    pub fn prepare_call(&mut self, procname: &str) -> Result<Statement<'_, C>> {
        Statement::for_call(self, procname)
    }

    /// Runs a query through a handle. Classified as a read.
    pub fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.prepare(StatementKind::Query, sql).execute_query(&[])
    }

    /// Runs a DML statement through a handle. Classified as a write.
    pub fn update(&mut self, sql: &str) -> Result<u64> {
        self.prepare(StatementKind::Update, sql).execute_update(&[])
    }

    /// Runs arbitrary SQL through a handle. Unclassified before execution,
    /// so it is conservatively treated as a write.
    pub fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        self.prepare(StatementKind::Generic, sql).execute(&[])
    }

    /// Restores the initial state when the connection returns to its pool.
    ///
    /// Unfinished work is never silently committed: an armed transaction is
    /// forcibly rolled back. An error marks the connection unfit for reuse
    /// and the pool must discard it.
    pub fn reset_for_pool_return(&mut self) -> Result<()> {
        match &self.state {
            TxnState::Broken { reason } => {
                return Err(Error::Broken {
                    reason: reason.clone(),
                });
            }
            TxnState::Active => {
                tracing::warn!(
                    "connection returned to pool with an open transaction, forcing rollback"
                );
                self.disarm_to(TxnState::Plain, Disposition::Rollback)?;
            }
            TxnState::Plain | TxnState::Deferred => {}
        }
        self.state = TxnState::Plain;
        debug_assert!(self.controller.physical_autocommit());
        Ok(())
    }

    /// Releases the physical connection, discarding the recorded state.
    pub fn into_inner(self) -> C {
        self.controller.into_inner()
    }

    /// Arms the physical transaction if this statement requires one.
    ///
    /// Called by the statement handle before every physical execution. In
    /// `Plain` and `Active` states statements run as-is; in `Deferred` the
    /// first non-read statement opens the real transaction before it runs.
    pub(crate) fn before_execute(&mut self, intent: StatementIntent) -> Result<()> {
        self.ensure_usable()?;
        if self.state == TxnState::Deferred && intent.requires_transaction() {
            match self.controller.arm() {
                Ok(()) => {
                    self.state = TxnState::Active;
                    tracing::debug!(
                        ?intent,
                        "first write in deferred transaction, physical transaction armed"
                    );
                }
                Err(err) => {
                    // The physical flag state is unknowable after a failed
                    // flip; the connection cannot be trusted anymore.
                    self.mark_broken(&err);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub(crate) const fn physical_mut(&mut self) -> &mut C {
        self.controller.physical_mut()
    }

    fn ensure_usable(&self) -> Result<()> {
        if let TxnState::Broken { reason } = &self.state {
            return Err(Error::Broken {
                reason: reason.clone(),
            });
        }
        Ok(())
    }

    fn disarm_to(&mut self, next: TxnState, how: Disposition) -> Result<()> {
        match self.controller.disarm(how) {
            Ok(()) => {
                tracing::debug!(from = self.state.name(), to = next.name(), "disarmed");
                self.state = next;
                Ok(())
            }
            Err(err) => {
                self.mark_broken(&err);
                Err(err)
            }
        }
    }

    fn mark_broken(&mut self, err: &Error) {
        let reason = err.to_string();
        tracing::warn!(%reason, "connection entered broken state");
        self.state = TxnState::Broken { reason };
    }
}
