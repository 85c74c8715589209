//! Deferred-transaction ("smart commit") connection layer.
//!
//! Wraps an ordinary synchronous database connection and keeps the physical
//! connection in autocommit mode for as long as possible. A logical
//! transaction requested via [`SmartConnection::set_autocommit`] changes
//! nothing on the wire; the physical transaction is opened lazily when the
//! first write (or possibly-writing statement) executes, and closed again by
//! [`SmartConnection::commit`] or [`SmartConnection::rollback`]. Read-only
//! prefixes of a transaction therefore run without holding locks.
//!
//! # Example
//!
//! ```rust
//! use smartcommit::testing::MockConnection;
//! use smartcommit::{Result, SmartConnection};
//!
//! fn main() -> Result<()> {
//!     let (physical, _handle) = MockConnection::new();
//!     let mut conn = SmartConnection::new(physical)?;
//!
//!     conn.set_autocommit(false)?;
//!     conn.query("SELECT * FROM CUSTOMERS")?; // runs in autocommit mode
//!     assert!(conn.physical_autocommit_mode());
//!
//!     conn.update("UPDATE CUSTOMERS SET TOTAL_SPENT = 0")?; // arms the transaction
//!     assert!(!conn.physical_autocommit_mode());
//!
//!     conn.commit()?; // disarms; next writes defer again
//!     assert!(conn.physical_autocommit_mode());
//!     Ok(())
//! }
//! ```
//!
//! The physical driver is reached through the [`PhysicalConnection`] trait;
//! see the `smartcommit-hdb` crate for the SAP HANA adapter.
#![warn(missing_docs)]

pub mod classify;
pub mod connection;
pub mod error;
pub mod mode;
pub mod physical;
#[cfg(feature = "pool")]
pub mod pool;
pub mod state;
pub mod statement;
pub mod testing;

// Re-export main types for convenience
pub use classify::{StatementIntent, StatementKind};
pub use connection::SmartConnection;
pub use error::{DriverError, Error, Result};
pub use mode::{Disposition, ModeController};
pub use physical::{ExecOutcome, PhysicalConnection, Row, Value};
#[cfg(feature = "pool")]
pub use pool::{Connect, Pool, PoolConfig, PooledConnection, SmartConnectionManager, build_pool};
pub use state::TxnState;
pub use statement::Statement;
