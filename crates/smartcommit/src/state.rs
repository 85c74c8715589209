//! Connection transaction state.
//!
//! Modeled as a single enum rather than independent booleans so the illegal
//! combination (physical transaction open with no write seen) is
//! unrepresentable.

/// State of a deferred-transaction connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnState {
    /// Autocommit requested; every statement commits independently.
    Plain,
    /// Logical transaction requested, but no write has occurred yet. The
    /// physical connection is still in autocommit mode.
    Deferred,
    /// A write has occurred; a real transaction is open on the physical
    /// connection and every subsequent statement runs inside it.
    Active,
    /// A physical transition failed; the connection is unusable and must be
    /// discarded.
    Broken {
        /// Description of the failure that broke the connection.
        reason: String,
    },
}

impl TxnState {
    /// The caller's autocommit intent.
    #[must_use]
    pub const fn requested_autocommit(&self) -> bool {
        matches!(self, Self::Plain)
    }

    /// The physical autocommit mode this state implies. Meaningless for
    /// `Broken`, where the physical flag can no longer be trusted.
    #[must_use]
    pub const fn physical_autocommit(&self) -> bool {
        matches!(self, Self::Plain | Self::Deferred)
    }

    /// Whether a write has occurred since the last transaction boundary.
    #[must_use]
    pub const fn write_seen(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the connection is in the terminal broken state.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }

    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Deferred => "deferred",
            Self::Active => "active",
            Self::Broken { .. } => "broken",
        }
    }
}
