use super::styled_block;
use crate::app::App;
use crate::process::ServerPhase;
use ratatui::{prelude::*, widgets::Paragraph};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let theme = &app.config.theme;

    let phase_color = match app.phase {
        ServerPhase::Ready => theme.phase_ready(),
        ServerPhase::Running => theme.phase_running(),
        ServerPhase::Starting | ServerPhase::Stopping => theme.phase_starting(),
        ServerPhase::Stopped => theme.phase_stopped(),
        ServerPhase::Error => theme.phase_error(),
        ServerPhase::NotRunning => theme.phase_inactive(),
    };

    let mut spans = vec![
        Span::styled("Server Status: ", Style::default().fg(theme.text())),
        Span::styled(app.phase.label(), Style::default().fg(phase_color).bold()),
    ];
    if let Some(pid) = app.server_pid() {
        spans.push(Span::styled(
            format!("  (pid {pid})"),
            Style::default().fg(theme.text_muted()),
        ));
    }

    let title = format!("lazyserve - port {}", app.config.port);
    let header = Paragraph::new(Line::from(spans))
        .block(styled_block(&title, app, app.phase.is_live()))
        .alignment(Alignment::Center);

    f.render_widget(header, area);
}
