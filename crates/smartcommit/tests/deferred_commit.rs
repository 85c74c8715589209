//! End-to-end scenario: a logical transaction whose read-only prefix runs in
//! autocommit mode, switches to a real transaction at the first write, and
//! returns to autocommit after commit.

use smartcommit::testing::{MockConnection, MockHandle, PhysicalOp};
use smartcommit::{ExecOutcome, SmartConnection, StatementKind, TxnState, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn connected() -> (SmartConnection<MockConnection>, MockHandle) {
    init_tracing();
    let (mock, handle) = MockConnection::new();
    (SmartConnection::new(mock).expect("wrap"), handle)
}

/// Asserts that the underlying connection is in the expected autocommit mode,
/// the way the service layer of an application would between statements.
fn assert_underlying_autocommit<C: smartcommit::PhysicalConnection>(
    conn: &SmartConnection<C>,
    expected: bool,
) {
    assert_eq!(
        conn.physical_autocommit_mode(),
        expected,
        "unexpected autocommit mode for underlying connection"
    );
}

#[test]
fn query_and_update_scenario() {
    let (mut conn, handle) = connected();
    handle.push_rows(vec![
        vec![Value::Int(1), Value::String("Jack".into()), Value::String("Bauer".into())],
        vec![Value::Int(2), Value::String("Chloe".into()), Value::String("O'Brian".into())],
    ]);

    // Begin a logical transaction.
    conn.set_autocommit(false).expect("set_autocommit");

    // Four reads; all run in autocommit mode, taking no read locks.
    let customers = conn.query("SELECT * FROM CUSTOMERS").expect("find all");
    assert_eq!(customers.len(), 2);
    assert_underlying_autocommit(&conn, true);

    conn.query("SELECT * FROM CUSTOMERS WHERE ID = 1")
        .expect("find by id");
    assert_underlying_autocommit(&conn, true);

    conn.query("SELECT * FROM CUSTOMERS WHERE LAST_NAME = 'Bauer'")
        .expect("find by last name");
    assert_underlying_autocommit(&conn, true);

    conn.query("SELECT COUNT(*) FROM PURCHASES")
        .expect("count purchases");
    assert_underlying_autocommit(&conn, true);

    // The first write flips the underlying connection to transactional mode.
    conn.update("INSERT INTO PURCHASES (ID, CUSTOMER_ID, AMOUNT) VALUES (1, 1, 10.99)")
        .expect("insert");
    assert_underlying_autocommit(&conn, false);

    // A read after the write must stay inside the same transaction so it can
    // observe the uncommitted insert.
    conn.query("SELECT COUNT(*) FROM PURCHASES")
        .expect("count after insert");
    assert_underlying_autocommit(&conn, false);

    // Commit disarms and returns the underlying connection to autocommit.
    conn.commit().expect("commit");
    assert_underlying_autocommit(&conn, true);
    assert_eq!(conn.state(), &TxnState::Deferred);

    // The physical trace shows exactly one arm/disarm cycle.
    let ops = handle.ops();
    let flips: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, PhysicalOp::SetAutoCommit(_)))
        .collect();
    assert_eq!(
        flips,
        vec![
            &PhysicalOp::SetAutoCommit(true),  // construction
            &PhysicalOp::SetAutoCommit(false), // arm at first write
            &PhysicalOp::SetAutoCommit(true),  // disarm at commit
        ]
    );
}

#[test]
fn fresh_logical_transaction_defers_again_after_commit() {
    let (mut conn, handle) = connected();
    conn.set_autocommit(false).expect("set_autocommit");
    conn.update("UPDATE CUSTOMERS SET TOTAL_SPENT = 0")
        .expect("update");
    conn.commit().expect("commit");

    // Commit implicitly opened a fresh logical transaction; reads in it run
    // in autocommit mode until the next write.
    conn.query("SELECT * FROM CUSTOMERS").expect("query");
    assert_underlying_autocommit(&conn, true);

    conn.update("UPDATE CUSTOMERS SET TOTAL_SPENT = 1")
        .expect("update");
    assert_underlying_autocommit(&conn, false);

    conn.rollback().expect("rollback");
    assert_underlying_autocommit(&conn, true);
    assert!(handle.ops().contains(&PhysicalOp::Rollback));
}

#[test]
fn whole_transaction_of_reads_never_arms() {
    let (mut conn, handle) = connected();
    conn.set_autocommit(false).expect("set_autocommit");
    for _ in 0..3 {
        conn.query("SELECT * FROM CUSTOMERS").expect("query");
    }
    conn.commit().expect("commit");
    conn.set_autocommit(true).expect("set_autocommit");

    assert_eq!(conn.state(), &TxnState::Plain);
    assert!(
        !handle.ops().contains(&PhysicalOp::SetAutoCommit(false)),
        "a read-only logical transaction must never open a physical one"
    );
    assert!(!handle.ops().contains(&PhysicalOp::Commit));
}

#[test]
fn generic_execute_reports_observed_shape_without_disarming() {
    let (mut conn, handle) = connected();
    handle.push_outcome(ExecOutcome::ResultSet(vec![vec![Value::Int(1)]]));
    conn.set_autocommit(false).expect("set_autocommit");

    // The generic statement turns out to be a read, but that is only known
    // after execution; the transaction stays armed.
    let outcome = conn.execute("SELECT 1 FROM DUMMY").expect("execute");
    assert!(matches!(outcome, ExecOutcome::ResultSet(_)));
    assert_underlying_autocommit(&conn, false);
    assert_eq!(conn.state(), &TxnState::Active);
}

#[test]
fn broken_connection_rejects_everything() {
    let (mut conn, handle) = connected();
    conn.set_autocommit(false).expect("set_autocommit");
    conn.update("DELETE FROM T").expect("update");
    handle.fail_commit();

    assert!(conn.commit().expect_err("commit").is_transition());

    for _ in 0..2 {
        assert!(
            conn.query("SELECT 1 FROM DUMMY")
                .expect_err("query on broken")
                .is_broken()
        );
    }
    assert!(conn.rollback().expect_err("rollback").is_broken());
    assert!(
        conn.prepare(StatementKind::Update, "DELETE FROM T")
            .execute_update(&[])
            .expect_err("update on broken")
            .is_broken()
    );
    assert!(conn.reset_for_pool_return().expect_err("reset").is_broken());
}
