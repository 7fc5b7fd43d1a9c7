use chrono::{DateTime, Local};

use crate::config::Config;
use crate::process::{
    self, reclaim_port, ControlError, LineLevel, ReclaimOutcome, RelayMessage, RelayReceiver,
    ServerController, ServerPhase, StopOutcome,
};

/// Keep the console bounded; old lines fall off the top
const MAX_CONSOLE_LINES: usize = 5000;

pub struct ConsoleLine {
    pub at: DateTime<Local>,
    pub text: String,
    pub level: LineLevel,
}

pub struct App {
    pub should_quit: bool,
    pub show_help: bool,

    // Status message (shows temporarily in the help bar)
    pub status_message: Option<String>,
    pub status_is_error: bool,

    // Last phase seen on the relay
    pub phase: ServerPhase,

    // Console
    pub lines: Vec<ConsoleLine>,
    pub scroll: u16, // offset from the bottom; 0 follows new output
    pub scroll_max: u16,

    pub config: Config,
    controller: ServerController,
    relay_rx: RelayReceiver,
}

impl App {
    pub fn new(config: Config) -> Self {
        let (relay_tx, relay_rx) = process::relay::channel();
        let controller = ServerController::new(config.clone(), relay_tx);

        let mut app = Self {
            should_quit: false,
            show_help: false,
            status_message: None,
            status_is_error: false,
            phase: ServerPhase::NotRunning,
            lines: Vec::new(),
            scroll: 0,
            scroll_max: 0,
            config,
            controller,
            relay_rx,
        };
        app.push_line(
            LineLevel::Info,
            format!(
                "lazyserve - managing `{}` on port {} (s to start, ? for keys)",
                app.config.server_command, app.config.port
            ),
        );
        app
    }

    /// Pull everything the background threads queued since the last tick
    pub fn drain_relay(&mut self) {
        for msg in self.relay_rx.drain() {
            match msg {
                RelayMessage::Line { text, level } => self.push_line(level, text),
                RelayMessage::Phase(phase) => self.phase = phase,
            }
        }
    }

    pub fn push_line(&mut self, level: LineLevel, text: String) {
        self.lines.push(ConsoleLine {
            at: Local::now(),
            text,
            level,
        });
        if self.lines.len() > MAX_CONSOLE_LINES {
            let overflow = self.lines.len() - MAX_CONSOLE_LINES;
            self.lines.drain(..overflow);
        }
    }

    pub fn server_pid(&self) -> Option<u32> {
        self.controller.pid()
    }

    pub fn start_server(&mut self) {
        match self.controller.start() {
            Ok(()) => self.set_status("server starting"),
            Err(ControlError::AlreadyRunning) => {
                self.push_line(LineLevel::Warn, "server is already running!".to_string());
                self.set_error("server is already running");
            }
            Err(e) => self.set_error(&format!("start failed: {e}")),
        }
    }

    pub fn stop_server(&mut self) {
        match self.controller.stop() {
            StopOutcome::NotRunning => self.set_status("nothing to stop"),
            StopOutcome::Exited => self.set_status("server stopped"),
            StopOutcome::ForceKilled => self.set_status("server force-killed"),
        }
    }

    pub fn restart_server(&mut self) {
        self.controller.restart();
        self.set_status("restarting server");
    }

    /// Free the port by killing whatever holds it, tracked by us or not
    pub fn reclaim_port_now(&mut self) {
        let port = self.config.port;
        self.push_line(LineLevel::Info, format!("reclaiming port {port}..."));

        match reclaim_port(port) {
            Ok(ReclaimOutcome::NoOwners) => {
                self.push_line(LineLevel::Info, format!("no process holds port {port}"));
                self.set_status("port already free");
            }
            Ok(ReclaimOutcome::Freed(reports)) => {
                let mut failures = 0usize;
                for report in &reports {
                    let name = report.process_name.as_deref().unwrap_or("?");
                    match &report.outcome {
                        Ok(()) => self.push_line(
                            LineLevel::Info,
                            format!("killed process {} ({name})", report.pid),
                        ),
                        Err(e) => {
                            failures += 1;
                            self.push_line(
                                LineLevel::Error,
                                format!("failed to kill process {}: {e}", report.pid),
                            );
                        }
                    }
                }
                if failures == 0 {
                    self.set_status(&format!("port {port} freed"));
                } else {
                    self.set_error(&format!("{failures} kill(s) failed"));
                }
            }
            Err(e) => {
                self.push_line(LineLevel::Error, format!("{e}"));
                self.set_error(&format!("{e}"));
            }
        }
    }

    pub fn clear_console(&mut self) {
        self.lines.clear();
        self.scroll = 0;
    }

    /// Stop the server before the TUI goes away, mirroring the window-close path
    pub fn on_quit(&mut self) {
        if self.phase.is_live() {
            self.controller.stop();
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
        self.status_is_error = false;
    }

    pub fn set_error(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
        self.status_is_error = true;
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    // k - scroll up to see OLDER output (increase offset from bottom)
    pub fn scroll_up(&mut self) {
        if self.scroll < self.scroll_max {
            self.scroll = (self.scroll + 3).min(self.scroll_max);
        }
    }

    // j - scroll down towards NEWER output
    pub fn scroll_down(&mut self) {
        if self.scroll > 0 {
            self.scroll = self.scroll.saturating_sub(3);
        }
    }

    // g - go to TOP (oldest output)
    pub fn scroll_top(&mut self) {
        self.scroll = self.scroll_max;
    }

    // G - go to BOTTOM (newest output, resume following)
    pub fn scroll_bottom(&mut self) {
        self.scroll = 0;
    }
}
