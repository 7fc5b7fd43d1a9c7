//! Integration tests for the server lifecycle controller
//!
//! These spawn real (short-lived) child processes, so they run serially.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use lazyserve::process::relay::{self, RelayMessage, RelayReceiver};
use lazyserve::{Config, ControlError, ServerController, ServerPhase, StopOutcome};
use serial_test::serial;
use tempfile::TempDir;

const GRACE: Duration = Duration::from_millis(500);
const COOLDOWN: Duration = Duration::from_millis(200);

fn test_controller(project_dir: &Path, command: &str) -> (ServerController, RelayReceiver) {
    let (relay_tx, relay_rx) = relay::channel();
    let config = Config {
        project_dir: project_dir.to_path_buf(),
        server_command: command.to_string(),
        ..Config::default()
    };
    let controller = ServerController::new(config, relay_tx).with_timeouts(GRACE, COOLDOWN);
    (controller, relay_rx)
}

fn wait_for(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    pred()
}

#[test]
#[serial]
fn stop_with_nothing_running_is_an_idempotent_noop() {
    let dir = TempDir::new().unwrap();
    let (controller, _rx) = test_controller(dir.path(), "true");

    assert_eq!(controller.stop(), StopOutcome::NotRunning);
    assert_eq!(
        controller.stop(),
        StopOutcome::NotRunning,
        "stop must stay a no-op on repeat"
    );
    assert_eq!(controller.phase(), ServerPhase::NotRunning);
}

#[test]
#[serial]
fn second_start_reports_already_running() {
    let dir = TempDir::new().unwrap();
    let (controller, _rx) = test_controller(dir.path(), "sleep 30");

    controller.start().expect("first start succeeds");
    let pid = controller.pid().expect("live child has a pid");

    let err = controller.start().expect_err("second start must fail");
    assert!(matches!(err, ControlError::AlreadyRunning));
    assert_eq!(
        controller.pid(),
        Some(pid),
        "still exactly one child, the original"
    );

    controller.stop();
}

#[test]
#[serial]
fn graceful_stop_terminates_and_clears_the_handle() {
    let dir = TempDir::new().unwrap();
    let (controller, _rx) = test_controller(dir.path(), "sleep 30");

    controller.start().expect("start succeeds");
    assert!(controller.pid().is_some());

    let began = Instant::now();
    let outcome = controller.stop();
    assert_eq!(outcome, StopOutcome::Exited, "SIGTERM should be enough");
    assert!(began.elapsed() < GRACE + Duration::from_secs(1));
    assert_eq!(controller.pid(), None, "handle cleared after stop");
    assert_eq!(controller.phase(), ServerPhase::Stopped);
}

#[test]
#[serial]
fn stop_escalates_to_sigkill_when_term_is_ignored() {
    let dir = TempDir::new().unwrap();
    let (controller, _rx) = test_controller(dir.path(), "trap '' TERM; sleep 30");

    controller.start().expect("start succeeds");
    // Let the shell install its trap before we signal it
    std::thread::sleep(Duration::from_millis(200));

    let began = Instant::now();
    let outcome = controller.stop();
    assert_eq!(outcome, StopOutcome::ForceKilled);
    assert!(
        began.elapsed() >= GRACE,
        "escalation only after the grace timeout"
    );
    assert!(
        began.elapsed() < GRACE + Duration::from_secs(2),
        "escalation is bounded"
    );
    assert_eq!(controller.pid(), None, "handle cleared even after escalation");
    assert_eq!(controller.phase(), ServerPhase::Stopped);
}

#[test]
#[serial]
fn natural_exit_relays_output_and_phases_in_causal_order() {
    let dir = TempDir::new().unwrap();
    let (controller, relay_rx) =
        test_controller(dir.path(), "echo building; echo 'Ready in 1s'");

    controller.start().expect("start succeeds");
    assert!(
        wait_for(
            || controller.phase() == ServerPhase::Stopped,
            Duration::from_secs(3)
        ),
        "phase must reach Stopped once the stream closes"
    );
    assert_eq!(controller.pid(), None, "handle cleared on natural exit");

    let messages = relay_rx.drain();
    let line_pos = |needle: &str| {
        messages.iter().position(|m| {
            matches!(m, RelayMessage::Line { text, .. } if text.contains(needle))
        })
    };
    let phase_pos = |phase: ServerPhase| {
        messages
            .iter()
            .position(|m| matches!(m, RelayMessage::Phase(p) if *p == phase))
    };

    let building = line_pos("building").expect("first output line relayed");
    let ready_line = line_pos("Ready in 1s").expect("readiness line relayed");
    let ready = phase_pos(ServerPhase::Ready).expect("Ready phase reached");
    let stopped = phase_pos(ServerPhase::Stopped).expect("Stopped phase reached");

    assert!(building < ready_line, "lines arrive in production order");
    assert!(
        ready_line < ready,
        "Ready transition follows the line that triggered it"
    );
    assert!(ready < stopped);
    assert!(
        phase_pos(ServerPhase::Running).expect("Running phase reached") < ready,
        "Ready only reachable after Running"
    );
}

#[test]
#[serial]
fn start_removes_a_stale_lock_file() {
    let dir = TempDir::new().unwrap();
    let lock_dir = dir.path().join(".next/dev");
    fs::create_dir_all(&lock_dir).unwrap();
    let lock = lock_dir.join("lock");
    fs::write(&lock, "stale").unwrap();

    let (controller, _rx) = test_controller(dir.path(), "true");
    controller.start().expect("start succeeds");

    assert!(!lock.exists(), "stale lock removed before launch");
    wait_for(
        || controller.phase() == ServerPhase::Stopped,
        Duration::from_secs(3),
    );
}

#[test]
#[serial]
fn restart_cycles_through_stopped_to_a_new_pid() {
    let dir = TempDir::new().unwrap();
    let (controller, relay_rx) = test_controller(dir.path(), "sleep 30");

    controller.start().expect("start succeeds");
    let first = controller.pid().expect("first pid");

    controller.restart();
    // stop() ran synchronously; the new child only appears after the cool-down
    assert_eq!(controller.pid(), None, "no child during the cool-down");

    assert!(
        wait_for(|| controller.pid().is_some(), Duration::from_secs(3)),
        "cool-down start must fire"
    );
    let second = controller.pid().expect("second pid");
    assert_ne!(first, second, "restart spawns a fresh process");

    let messages = relay_rx.drain();
    assert!(
        messages
            .iter()
            .any(|m| matches!(m, RelayMessage::Phase(ServerPhase::Stopped))),
        "phase cycled through Stopped between the pids"
    );

    controller.stop();
}

#[test]
#[serial]
fn launch_failure_surfaces_and_sets_error_phase() {
    let missing = Path::new("/nonexistent/lazyserve-test-dir");
    let (controller, _rx) = test_controller(missing, "true");

    let err = controller.start().expect_err("spawn must fail");
    assert!(matches!(err, ControlError::LaunchFailure(_)));
    assert_eq!(controller.phase(), ServerPhase::Error);
    assert_eq!(controller.pid(), None);
}

#[test]
#[serial]
fn stop_after_natural_exit_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (controller, _rx) = test_controller(dir.path(), "true");

    controller.start().expect("start succeeds");
    assert!(wait_for(
        || controller.phase() == ServerPhase::Stopped,
        Duration::from_secs(3)
    ));

    assert_eq!(
        controller.stop(),
        StopOutcome::NotRunning,
        "drain thread already reaped and cleared the handle"
    );
}
