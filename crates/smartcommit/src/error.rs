//! Error taxonomy for the deferred-transaction layer.
//!
//! Three failure classes matter to callers:
//! - [`Error::Transition`]: an arm/disarm could not be carried out. Fatal to
//!   the current operation, never retried.
//! - [`Error::Broken`]: a prior transition failed and the physical autocommit
//!   flag can no longer be trusted. The connection rejects every further
//!   operation until it is discarded.
//! - [`Error::Execution`]: the statement itself failed. The driver error is
//!   carried unchanged; no state-machine side effects beyond what the
//!   statement already caused.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque driver-side error reported through the physical connection seam.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DriverError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl DriverError {
    /// Wraps any driver error, preserving it as the source.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(err))
    }

    /// Creates a driver error from a plain message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(Box::new(Message(msg.into())))
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Errors produced by the deferred-transaction connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An autocommit-mode transition was attempted from an inconsistent state
    /// or failed on the wire.
    #[error("transaction mode transition failed: {detail}")]
    Transition {
        /// Which transition failed and why.
        detail: String,
        /// Underlying driver failure, if the transition reached the wire.
        #[source]
        source: Option<DriverError>,
    },

    /// A prior transition failed irrecoverably. The instance must be
    /// discarded; it will never return to a usable state.
    #[error("connection is broken and must be discarded: {reason}")]
    Broken {
        /// Description of the transition failure that broke the connection.
        reason: String,
    },

    /// The underlying statement failed for ordinary reasons.
    #[error("statement execution failed")]
    Execution(#[from] DriverError),

    /// The statement could not be constructed (bad procedure name, empty SQL).
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// Pool or environment configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn transition(detail: impl Into<String>, source: Option<DriverError>) -> Self {
        Self::Transition {
            detail: detail.into(),
            source,
        }
    }

    /// True when the connection has entered the terminal broken state.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }

    /// True for failed arm/disarm transitions.
    #[must_use]
    pub const fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }

    /// True for ordinary statement failures.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}
