//! Pool behavior: connections are reset on return and discarded when the
//! reset cannot restore a clean state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use smartcommit::testing::{MockConnection, MockHandle, PhysicalOp};
use smartcommit::{Connect, DriverError, PoolConfig, TxnState, build_pool};

/// Connector that keeps a handle to every connection it has opened.
#[derive(Debug, Default)]
struct TrackingConnector {
    created: AtomicUsize,
    handles: Mutex<Vec<MockHandle>>,
}

impl TrackingConnector {
    fn handle(&self, index: usize) -> MockHandle {
        self.handles.lock()[index].clone()
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Connect for TrackingConnector {
    type Conn = MockConnection;

    fn connect(&self) -> Result<MockConnection, DriverError> {
        let (mock, handle) = MockConnection::new();
        self.created.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().push(handle);
        Ok(mock)
    }
}

#[tokio::test]
async fn recycle_resets_state_and_rolls_back_unfinished_work() {
    let connector = Arc::new(TrackingConnector::default());
    let pool = build_pool(Arc::clone(&connector), &PoolConfig::default()).expect("pool");

    {
        let mut conn = pool.get().await.expect("borrow");
        conn.set_autocommit(false).expect("set_autocommit");
        conn.update("INSERT INTO T VALUES (1)").expect("update");
        assert_eq!(conn.state(), &TxnState::Active);
    } // returned to pool

    // The next borrow triggers the recycle hook first.
    let conn = pool.get().await.expect("borrow again");
    assert_eq!(conn.state(), &TxnState::Plain);
    assert!(conn.physical_autocommit_mode());
    assert_eq!(connector.created(), 1, "same physical connection reused");

    let ops = connector.handle(0).ops();
    assert!(
        ops.contains(&PhysicalOp::Rollback),
        "unfinished work must be rolled back on return, never committed"
    );
    assert!(!ops.contains(&PhysicalOp::Commit));
}

#[tokio::test]
async fn recycle_keeps_clean_connections_without_physical_traffic() {
    let connector = Arc::new(TrackingConnector::default());
    let pool = build_pool(Arc::clone(&connector), &PoolConfig::default()).expect("pool");

    {
        let mut conn = pool.get().await.expect("borrow");
        conn.set_autocommit(false).expect("set_autocommit");
        conn.query("SELECT 1 FROM DUMMY").expect("query");
    }
    let ops_before = connector.handle(0).ops().len();

    let conn = pool.get().await.expect("borrow again");
    assert_eq!(conn.state(), &TxnState::Plain);
    assert_eq!(
        connector.handle(0).ops().len(),
        ops_before,
        "reset of a read-only borrow needs no physical traffic"
    );
}

#[tokio::test]
async fn broken_connection_is_discarded_not_reused() {
    let connector = Arc::new(TrackingConnector::default());
    let pool = build_pool(Arc::clone(&connector), &PoolConfig::default()).expect("pool");

    {
        let mut conn = pool.get().await.expect("borrow");
        conn.set_autocommit(false).expect("set_autocommit");
        conn.update("INSERT INTO T VALUES (1)").expect("update");
        // Force the reset's rollback to fail on return.
        connector.handle(0).fail_rollback();
    }

    let conn = pool.get().await.expect("borrow replacement");
    assert_eq!(conn.state(), &TxnState::Plain);
    assert_eq!(
        connector.created(),
        2,
        "the unfit connection must be replaced by a fresh one"
    );
}
