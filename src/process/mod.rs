//! Process management for the dev server under control

pub mod controller;
pub mod reclaim;
pub mod relay;

pub use controller::{ServerController, ServerPhase, StopOutcome};
pub use reclaim::{kill_owners, reclaim_port, KillReport, ReclaimOutcome};
pub use relay::{LineLevel, RelayMessage, RelayReceiver, RelaySender};

use thiserror::Error;

/// Failures surfaced to the console. Termination timeouts and lock file
/// removal failures are warnings, not members of this taxonomy.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("server is already running")]
    AlreadyRunning,

    #[error("failed to launch server: {0}")]
    LaunchFailure(#[from] std::io::Error),

    #[error("port query failed: {0}")]
    PortQueryFailure(String),
}
