//! Lazyserve library - TUI control panel for a local dev server

pub mod config;
pub mod process;

// Re-export commonly used types
pub use config::Config;
pub use process::{
    kill_owners, reclaim_port, ControlError, KillReport, ReclaimOutcome, ServerController,
    ServerPhase, StopOutcome,
};
