//! Port reconciliation - free the target port regardless of our own bookkeeping
//!
//! OS-level port binding outlives in-process handles across restarts of
//! this tool itself, so ownership is re-derived from the kernel's
//! connection table every call, never trusted from memory. The contract
//! is "free the port", not "kill only our process".

use std::collections::BTreeSet;
use std::process::Command;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sysinfo::{Pid as SysPid, System};
use tracing::{info, warn};

use super::ControlError;

/// One kill attempt against a port owner, reported independently
#[derive(Debug, Clone)]
pub struct KillReport {
    pub pid: u32,
    /// Resolved from the process table when the PID is still visible
    pub process_name: Option<String>,
    pub outcome: Result<(), String>,
}

#[derive(Debug)]
pub enum ReclaimOutcome {
    /// At least one owner existed; one report per deduplicated PID
    Freed(Vec<KillReport>),
    /// Nothing held the port - informational, not an error
    NoOwners,
}

impl ReclaimOutcome {
    /// Aggregate success: owners existed and every kill succeeded
    pub fn all_killed(&self) -> bool {
        match self {
            ReclaimOutcome::Freed(reports) => reports.iter().all(|r| r.outcome.is_ok()),
            ReclaimOutcome::NoOwners => false,
        }
    }
}

/// Kill whatever currently holds `port` in state LISTEN or ESTAB.
///
/// Independent of the controller handle by design: it must work when the
/// handle is stale or was never set, e.g. an orphaned descendant left
/// behind after a crash of this tool.
pub fn reclaim_port(port: u16) -> Result<ReclaimOutcome, ControlError> {
    let output = Command::new("ss")
        .args(["-H", "-t", "-a", "-n", "-p"])
        .output()
        .map_err(|e| ControlError::PortQueryFailure(e.to_string()))?;

    if !output.status.success() {
        return Err(ControlError::PortQueryFailure(format!(
            "ss exited with {}",
            output.status
        )));
    }

    let table = String::from_utf8_lossy(&output.stdout);
    let pids = parse_port_owners(&table, port);
    if pids.is_empty() {
        info!(port, "no process owns the port");
        return Ok(ReclaimOutcome::NoOwners);
    }

    Ok(ReclaimOutcome::Freed(kill_owners(&pids)))
}

/// One SIGKILL per identifier, each reported independently. Failed kills
/// are not retried; the user re-invokes.
pub fn kill_owners(pids: &[u32]) -> Vec<KillReport> {
    let mut sys = System::new();
    sys.refresh_processes();

    pids.iter().map(|&pid| kill_owner(&sys, pid)).collect()
}

fn kill_owner(sys: &System, pid: u32) -> KillReport {
    let process_name = sys
        .process(SysPid::from_u32(pid))
        .map(|p| p.name().to_string());

    let outcome = kill(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(|e| e.to_string());
    match &outcome {
        Ok(()) => info!(pid, name = ?process_name, "killed port owner"),
        Err(e) => warn!(pid, error = %e, "failed to kill port owner"),
    }

    KillReport {
        pid,
        process_name,
        outcome,
    }
}

/// Pure textual filter over `ss -Htanp` output: keep LISTEN/ESTAB rows
/// touching the port, pull `pid=` tokens, deduplicate.
pub fn parse_port_owners(table: &str, port: u16) -> Vec<u32> {
    let needle = format!(":{port}");
    let mut pids = BTreeSet::new();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let Some(state) = fields.next() else { continue };
        if state != "LISTEN" && state != "ESTAB" {
            continue;
        }

        // Columns: State Recv-Q Send-Q Local:Port Peer:Port [Process]
        let local = fields.nth(2);
        let peer = fields.next();
        let on_port = |addr: Option<&str>| addr.is_some_and(|a| a.ends_with(&needle));
        if !on_port(local) && !on_port(peer) {
            continue;
        }

        for pid in extract_pids(line) {
            pids.insert(pid);
        }
    }

    pids.into_iter().collect()
}

/// Pull every `pid=N` out of the users:((...)) column
fn extract_pids(line: &str) -> Vec<u32> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(idx) = rest.find("pid=") {
        rest = &rest[idx + 4..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if let Ok(pid) = rest[..end].parse() {
            out.push(pid);
        }
        rest = &rest[end..];
    }
    out
}
