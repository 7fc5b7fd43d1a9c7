//! Integration tests for port reconciliation

use std::net::TcpListener;
use std::process::Command;

use lazyserve::{kill_owners, reclaim_port, ControlError, KillReport, ReclaimOutcome};
use serial_test::serial;

/// Bind port 0, note the assigned port, drop the listener. Nothing owns
/// the port once this returns.
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

#[test]
#[serial]
fn unowned_port_is_informational_not_an_error() {
    match reclaim_port(free_port()) {
        Ok(ReclaimOutcome::NoOwners) => {}
        Ok(ReclaimOutcome::Freed(reports)) => {
            panic!("expected no owners, got kill reports: {reports:?}")
        }
        // Environment without `ss` in PATH; nothing to assert against
        Err(ControlError::PortQueryFailure(_)) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn aggregate_success_requires_owners_and_all_kills_ok() {
    let killed = KillReport {
        pid: 101,
        process_name: Some("node".to_string()),
        outcome: Ok(()),
    };
    let failed = KillReport {
        pid: 102,
        process_name: None,
        outcome: Err("ESRCH".to_string()),
    };

    assert!(ReclaimOutcome::Freed(vec![killed.clone()]).all_killed());
    assert!(!ReclaimOutcome::Freed(vec![killed, failed]).all_killed());
    assert!(
        !ReclaimOutcome::NoOwners.all_killed(),
        "no owners is not aggregate success"
    );
}

#[test]
#[serial]
fn kill_owners_attempts_exactly_one_kill_per_identifier() {
    let mut children: Vec<_> = (0..3)
        .map(|_| Command::new("sleep").arg("30").spawn().expect("spawn sleep"))
        .collect();
    let pids: Vec<u32> = children.iter().map(|c| c.id()).collect();

    let reports = kill_owners(&pids);
    assert_eq!(reports.len(), pids.len(), "one report per identifier");
    for (report, pid) in reports.iter().zip(&pids) {
        assert_eq!(report.pid, *pid);
        assert!(report.outcome.is_ok(), "killing a live child succeeds");
    }

    for child in &mut children {
        let status = child.wait().expect("reap killed child");
        assert!(!status.success(), "child was killed, not exited cleanly");
    }
}

#[test]
#[serial]
fn kill_of_a_gone_pid_is_reported_per_identifier() {
    let mut child = Command::new("true").spawn().expect("spawn");
    let pid = child.id();
    child.wait().expect("reap");

    let reports = kill_owners(&[pid]);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].pid, pid);
    assert!(
        reports[0].outcome.is_err(),
        "signalling a reaped pid fails and is reported, not retried"
    );
}
