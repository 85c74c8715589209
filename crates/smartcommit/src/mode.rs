//! Physical autocommit transitions.
//!
//! The controller is the sole owner of the physical connection and of its
//! autocommit flag. Only two transitions exist: arm (autocommit off, opening
//! a real transaction) and disarm (commit or rollback, then autocommit back
//! on). The flag is shadow-tracked so introspection never costs a roundtrip.

use std::fmt;

use crate::error::{Error, Result};
use crate::physical::PhysicalConnection;

/// How an open transaction is ended when disarming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// End the transaction with a physical commit.
    Commit,
    /// End the transaction with a physical rollback.
    Rollback,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => f.write_str("commit"),
            Self::Rollback => f.write_str("rollback"),
        }
    }
}

/// Owner of the physical connection and its autocommit flag.
#[derive(Debug)]
pub struct ModeController<C> {
    physical: C,
    /// Shadow of the physical autocommit flag. Valid as long as every flip
    /// goes through this controller and succeeds.
    autocommit: bool,
}

impl<C: PhysicalConnection> ModeController<C> {
    /// Takes ownership of a physical connection and establishes autocommit
    /// mode, the initial state every borrow starts from.
    pub fn new(mut physical: C) -> Result<Self> {
        physical.set_auto_commit(true).map_err(|e| {
            Error::transition("could not establish initial autocommit mode", Some(e))
        })?;
        Ok(Self {
            physical,
            autocommit: true,
        })
    }

    /// Last known physical autocommit mode. No I/O.
    #[must_use]
    pub const fn physical_autocommit(&self) -> bool {
        self.autocommit
    }

    /// Direct access for statement execution. Mode flips stay in this
    /// controller; callers must not touch the autocommit flag through this.
    pub const fn physical_mut(&mut self) -> &mut C {
        &mut self.physical
    }

    /// Releases the physical connection.
    pub fn into_inner(self) -> C {
        self.physical
    }

    /// Flips physical autocommit off, opening a real transaction.
    ///
    /// Must not be called while a transaction is already open. If the flip
    /// fails the physical flag state is unknown and the caller must treat the
    /// connection as broken.
    pub fn arm(&mut self) -> Result<()> {
        if !self.autocommit {
            return Err(Error::transition(
                "arm requested while a transaction is already open",
                None,
            ));
        }
        self.physical
            .set_auto_commit(false)
            .map_err(|e| Error::transition("could not switch physical autocommit off", Some(e)))?;
        self.autocommit = false;
        tracing::debug!("physical connection switched to transaction mode");
        Ok(())
    }

    /// Ends the open transaction and flips physical autocommit back on.
    ///
    /// If the commit/rollback fails the autocommit flag is left untouched:
    /// the transaction may still be open, and claiming otherwise would be a
    /// lie. The caller must treat the connection as broken.
    pub fn disarm(&mut self, how: Disposition) -> Result<()> {
        if self.autocommit {
            return Err(Error::transition(
                "disarm requested while no transaction is open",
                None,
            ));
        }
        let boundary = match how {
            Disposition::Commit => self.physical.commit(),
            Disposition::Rollback => self.physical.rollback(),
        };
        boundary.map_err(|e| Error::transition(format!("physical {how} failed"), Some(e)))?;
        self.physical.set_auto_commit(true).map_err(|e| {
            Error::transition(
                format!("could not restore autocommit after {how}"),
                Some(e),
            )
        })?;
        self.autocommit = true;
        tracing::debug!(disposition = %how, "physical connection returned to autocommit mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, PhysicalOp};

    #[test]
    fn new_establishes_autocommit() {
        let (mock, handle) = MockConnection::new();
        let controller = ModeController::new(mock).expect("new");
        assert!(controller.physical_autocommit());
        assert_eq!(handle.ops(), vec![PhysicalOp::SetAutoCommit(true)]);
    }

    #[test]
    fn arm_flips_physical_flag_off() {
        let (mock, handle) = MockConnection::new();
        let mut controller = ModeController::new(mock).expect("new");

        controller.arm().expect("arm");

        assert!(!controller.physical_autocommit());
        assert!(!handle.autocommit());
    }

    #[test]
    fn arm_twice_is_a_transition_error() {
        let (mock, _handle) = MockConnection::new();
        let mut controller = ModeController::new(mock).expect("new");
        controller.arm().expect("arm");

        let err = controller.arm().expect_err("second arm");
        assert!(err.is_transition());
    }

    #[test]
    fn disarm_commits_then_restores_autocommit() {
        let (mock, handle) = MockConnection::new();
        let mut controller = ModeController::new(mock).expect("new");
        controller.arm().expect("arm");

        controller.disarm(Disposition::Commit).expect("disarm");

        assert!(controller.physical_autocommit());
        assert_eq!(
            handle.ops(),
            vec![
                PhysicalOp::SetAutoCommit(true),
                PhysicalOp::SetAutoCommit(false),
                PhysicalOp::Commit,
                PhysicalOp::SetAutoCommit(true),
            ]
        );
    }

    #[test]
    fn disarm_without_transaction_is_a_transition_error() {
        let (mock, _handle) = MockConnection::new();
        let mut controller = ModeController::new(mock).expect("new");

        let err = controller.disarm(Disposition::Rollback).expect_err("disarm");
        assert!(err.is_transition());
    }

    #[test]
    fn failed_commit_leaves_flag_untouched() {
        let (mock, handle) = MockConnection::new();
        let mut controller = ModeController::new(mock).expect("new");
        controller.arm().expect("arm");
        handle.fail_commit();

        let err = controller.disarm(Disposition::Commit).expect_err("disarm");

        assert!(err.is_transition());
        assert!(!controller.physical_autocommit());
        // No SetAutoCommit(true) after the failed commit.
        assert_eq!(
            handle.ops().last(),
            Some(&PhysicalOp::Commit),
            "autocommit must not be flipped after a failed commit"
        );
    }
}
