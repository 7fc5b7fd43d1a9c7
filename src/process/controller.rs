//! Server lifecycle - start, graceful/forced stop, restart with cool-down

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{error, info, warn};

use crate::config::Config;

use super::relay::RelaySender;
use super::ControlError;

/// Output substrings taken to mean the server finished compiling.
/// Brittle by nature; kept narrow so Ready stays meaningful.
pub const READINESS_MARKERS: &[&str] = &["Ready", "compiled"];

/// Stale lock left behind by an unclean shutdown, relative to the project dir
const LOCK_FILE: &str = ".next/dev/lock";

const DEFAULT_GRACE_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(2);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle phase of the managed server.
///
/// NotRunning → Starting → Running → Ready → Stopping → Stopped, with
/// Error reachable from Starting/Running. From Error only start() leads out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    NotRunning,
    Starting,
    Running,
    Ready,
    Stopping,
    Stopped,
    Error,
}

impl ServerPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ServerPhase::NotRunning => "Not Running",
            ServerPhase::Starting => "Starting...",
            ServerPhase::Running => "Running",
            ServerPhase::Ready => "Ready ✓",
            ServerPhase::Stopping => "Stopping...",
            ServerPhase::Stopped => "Stopped",
            ServerPhase::Error => "Error",
        }
    }

    /// True while a child process is expected to be alive
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ServerPhase::Starting | ServerPhase::Running | ServerPhase::Ready
        )
    }
}

/// How a stop() call resolved. Never an error - stop with nothing
/// running is an informational no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Exited,
    ForceKilled,
}

struct Inner {
    child: Option<Child>,
    phase: ServerPhase,
}

/// Owns the single managed server process.
///
/// Cheap to clone; all clones share one handle behind a mutex. The
/// foreground mutates it on start/stop, the drain thread on natural exit.
#[derive(Clone)]
pub struct ServerController {
    inner: Arc<Mutex<Inner>>,
    relay: RelaySender,
    config: Config,
    grace_timeout: Duration,
    restart_delay: Duration,
}

impl ServerController {
    pub fn new(config: Config, relay: RelaySender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                child: None,
                phase: ServerPhase::NotRunning,
            })),
            relay,
            config,
            grace_timeout: DEFAULT_GRACE_TIMEOUT,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    /// Shrink the stop timeout and restart cool-down. Used by tests.
    pub fn with_timeouts(mut self, grace_timeout: Duration, restart_delay: Duration) -> Self {
        self.grace_timeout = grace_timeout;
        self.restart_delay = restart_delay;
        self
    }

    pub fn phase(&self) -> ServerPhase {
        self.inner.lock().unwrap().phase
    }

    /// PID of the live child, if any
    pub fn pid(&self) -> Option<u32> {
        self.inner.lock().unwrap().child.as_ref().map(|c| c.id())
    }

    fn set_phase(&self, phase: ServerPhase) {
        self.inner.lock().unwrap().phase = phase;
        self.relay.phase(phase);
    }

    /// Launch the server command with cwd fixed to the project dir,
    /// stdout/stderr merged, and a background thread draining the stream.
    pub fn start(&self) -> Result<(), ControlError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(child) = inner.child.as_mut() {
                match child.try_wait() {
                    Ok(None) => return Err(ControlError::AlreadyRunning),
                    // Exited behind our back (or unknown): drop the stale handle
                    _ => inner.child = None,
                }
            }
            // Claim Starting under the lock so a concurrent start (e.g. a
            // key press during the restart cool-down) cannot double-spawn
            if inner.phase == ServerPhase::Starting {
                return Err(ControlError::AlreadyRunning);
            }
            inner.phase = ServerPhase::Starting;
        }
        self.relay.phase(ServerPhase::Starting);

        self.remove_stale_lock();

        self.relay
            .info(format!("starting server: {}", self.config.server_command));

        // 2>&1 inside the shell merges stderr into our stdout pipe
        let shell_line = format!("{} 2>&1", self.config.server_command);
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(&shell_line)
            .current_dir(&self.config.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                error!(error = %e, "failed to spawn server");
                self.relay.error(format!("failed to start server: {e}"));
                self.set_phase(ServerPhase::Error);
                return Err(ControlError::LaunchFailure(e));
            }
        };

        let stdout = child.stdout.take().expect("stdout is piped");
        let pid = child.id();
        info!(pid, command = %self.config.server_command, "server spawned");

        self.inner.lock().unwrap().child = Some(child);
        self.set_phase(ServerPhase::Running);
        self.relay.info(format!(
            "server started on http://localhost:{} (pid {pid})",
            self.config.port
        ));

        let controller = self.clone();
        thread::spawn(move || controller.drain_output(stdout));

        Ok(())
    }

    /// Request graceful termination, escalating to SIGKILL after the
    /// grace timeout. The handle is cleared regardless of outcome.
    pub fn stop(&self) -> StopOutcome {
        let child = self.inner.lock().unwrap().child.take();
        let Some(mut child) = child else {
            self.relay.info("no server running");
            return StopOutcome::NotRunning;
        };

        let pid = child.id();
        self.set_phase(ServerPhase::Stopping);

        // Graceful first; errors here mean the process is already gone
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);

        let deadline = Instant::now() + self.grace_timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => {
                    info!(pid, "server terminated");
                    self.relay.info("server terminated");
                    self.set_phase(ServerPhase::Stopped);
                    return StopOutcome::Exited;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(pid, error = %e, "wait on server failed");
                    break;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        // Not fatal: escalate and move on
        warn!(pid, timeout = ?self.grace_timeout, "graceful stop timed out, force killing");
        self.relay.warn(format!(
            "server did not exit within {:?}, force killing",
            self.grace_timeout
        ));
        let _ = child.kill();
        let _ = child.wait();
        self.relay.info("server force-killed");
        self.set_phase(ServerPhase::Stopped);
        StopOutcome::ForceKilled
    }

    /// Full stop-then-start. The start is scheduled after a cool-down so
    /// the OS releases the port before the new child tries to bind it.
    pub fn restart(&self) {
        self.relay.info("restarting server...");
        self.stop();

        let controller = self.clone();
        thread::spawn(move || {
            thread::sleep(controller.restart_delay);
            if let Err(e) = controller.start() {
                controller.relay.error(format!("restart failed: {e}"));
            }
        });
    }

    /// Non-fatal: a leftover lock only matters if it exists and resists removal
    fn remove_stale_lock(&self) {
        let lock_path = self.config.project_dir.join(LOCK_FILE);
        if !lock_path.exists() {
            return;
        }
        match std::fs::remove_file(&lock_path) {
            Ok(()) => {
                info!(path = %lock_path.display(), "removed stale lock file");
                self.relay.info("removed stale lock file");
            }
            Err(e) => {
                warn!(path = %lock_path.display(), error = %e, "could not remove lock file");
                self.relay
                    .warn(format!("could not remove lock file: {e}"));
            }
        }
    }

    /// Runs on the background thread. Reads until the stream closes,
    /// which is the implicit cancellation signal for this thread.
    fn drain_output(&self, stdout: ChildStdout) {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    self.relay.output(line.to_string());

                    if READINESS_MARKERS.iter().any(|m| line.contains(m)) {
                        let mut inner = self.inner.lock().unwrap();
                        if inner.phase == ServerPhase::Running {
                            inner.phase = ServerPhase::Ready;
                            drop(inner);
                            self.relay.phase(ServerPhase::Ready);
                        }
                    }
                }
                Err(_) => break,
            }
        }

        // Stream closed: the child exited. Reap it unless a concurrent
        // stop() already took the handle.
        let mut inner = self.inner.lock().unwrap();
        if let Some(mut child) = inner.child.take() {
            let _ = child.wait();
        }
        let natural_exit = inner.phase.is_live();
        if natural_exit {
            inner.phase = ServerPhase::Stopped;
        }
        drop(inner);

        if natural_exit {
            warn!("server process ended");
            self.relay.warn("server process ended");
            self.relay.phase(ServerPhase::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_liveness() {
        assert!(ServerPhase::Starting.is_live());
        assert!(ServerPhase::Running.is_live());
        assert!(ServerPhase::Ready.is_live());
        assert!(!ServerPhase::NotRunning.is_live());
        assert!(!ServerPhase::Stopping.is_live());
        assert!(!ServerPhase::Stopped.is_live());
        assert!(!ServerPhase::Error.is_live());
    }

    #[test]
    fn readiness_markers_match_next_style_output() {
        let matches = |line: &str| READINESS_MARKERS.iter().any(|m| line.contains(m));
        assert!(matches("✓ Ready in 2.3s"));
        assert!(matches("○ compiled /page in 140ms"));
        assert!(!matches("- Local: http://localhost:3000"));
        assert!(!matches("warn  - metadata viewport"));
    }
}
