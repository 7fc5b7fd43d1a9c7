//! Output relay - channel from background drain threads to the TUI loop

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use super::controller::ServerPhase;

/// Severity hint for a console line, rendered as a color by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    /// Raw server output
    Output,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub enum RelayMessage {
    Line { text: String, level: LineLevel },
    Phase(ServerPhase),
}

/// Thread-safe producer half. Cloned into the drain thread, the
/// controller, and the restart scheduler.
#[derive(Clone)]
pub struct RelaySender {
    tx: Sender<RelayMessage>,
}

impl RelaySender {
    pub fn line(&self, level: LineLevel, text: impl Into<String>) {
        // Receiver gone means the TUI is shutting down; nothing to do
        let _ = self.tx.send(RelayMessage::Line {
            text: text.into(),
            level,
        });
    }

    pub fn output(&self, text: impl Into<String>) {
        self.line(LineLevel::Output, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.line(LineLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.line(LineLevel::Warn, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.line(LineLevel::Error, text);
    }

    pub fn phase(&self, phase: ServerPhase) {
        let _ = self.tx.send(RelayMessage::Phase(phase));
    }
}

/// Consumer half, polled by the event loop every tick.
pub struct RelayReceiver {
    rx: Receiver<RelayMessage>,
}

impl RelayReceiver {
    /// Drain everything queued since the last tick without blocking.
    pub fn drain(&self) -> Vec<RelayMessage> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        messages
    }
}

pub fn channel() -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel();
    (RelaySender { tx }, RelayReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_messages_in_send_order() {
        let (tx, rx) = channel();
        tx.output("line 1");
        tx.phase(ServerPhase::Ready);
        tx.warn("line 2");

        let messages = rx.drain();
        assert_eq!(messages.len(), 3);
        assert!(matches!(
            &messages[0],
            RelayMessage::Line { text, level: LineLevel::Output } if text == "line 1"
        ));
        assert!(matches!(messages[1], RelayMessage::Phase(ServerPhase::Ready)));
        assert!(matches!(
            &messages[2],
            RelayMessage::Line { text, level: LineLevel::Warn } if text == "line 2"
        ));
    }

    #[test]
    fn drain_on_empty_channel_returns_nothing() {
        let (_tx, rx) = channel();
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn send_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = channel();
        drop(rx);
        tx.info("nobody listening");
    }

    #[test]
    fn per_producer_order_is_preserved_across_threads() {
        let (tx, rx) = channel();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                tx.output(format!("line {i}"));
            }
        });
        handle.join().unwrap();

        let texts: Vec<String> = rx
            .drain()
            .into_iter()
            .map(|m| match m {
                RelayMessage::Line { text, .. } => text,
                RelayMessage::Phase(_) => unreachable!(),
            })
            .collect();
        let expected: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
        assert_eq!(texts, expected);
    }
}
