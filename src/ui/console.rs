use super::styled_block;
use crate::app::App;
use crate::process::LineLevel;
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let title = format!("Server Output ({})", app.lines.len());
    let block = styled_block(&title, app, false);

    if app.lines.is_empty() {
        let empty = Paragraph::new("No output yet")
            .block(block)
            .style(Style::default().fg(app.config.theme.text_muted()))
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let viewport = area.height.saturating_sub(2) as usize;
    let total = app.lines.len();
    app.scroll_max = total.saturating_sub(viewport) as u16;
    app.scroll = app.scroll.min(app.scroll_max);

    // scroll counts from the bottom so new lines stay in view at 0
    let top = (app.scroll_max - app.scroll) as usize;

    let theme = app.config.theme.clone();
    let rendered: Vec<Line> = app
        .lines
        .iter()
        .skip(top)
        .take(viewport)
        .map(|line| {
            let color = match line.level {
                LineLevel::Output => theme.line_output(),
                LineLevel::Info => theme.line_info(),
                LineLevel::Warn => theme.line_warn(),
                LineLevel::Error => theme.line_error(),
            };
            Line::from(vec![
                Span::styled(
                    line.at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(theme.text_muted()),
                ),
                Span::styled(line.text.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    let console = Paragraph::new(rendered).block(block);
    f.render_widget(console, area);

    if app.scroll_max > 0 {
        let mut scrollbar_state =
            ScrollbarState::new(app.scroll_max as usize).position(top);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}
