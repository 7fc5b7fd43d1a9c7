mod console;
mod status;

use crate::app::App;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Layout: status header + console + footer (help)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Min(0),    // Console
            Constraint::Length(1), // Help bar
        ])
        .split(size);

    status::draw(f, app, chunks[0]);
    console::draw(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);

    if app.show_help {
        draw_help_popup(f, app, size);
    }
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    // Show status message if available, otherwise show help
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(app.config.theme.line_error()).bold()
        } else {
            Style::default().fg(app.config.theme.border_active()).bold()
        };
        let status = Paragraph::new(msg.as_str())
            .style(style)
            .alignment(Alignment::Center);
        f.render_widget(status, area);
        return;
    }

    let help = Paragraph::new(
        "s: start │ x: stop │ r: restart │ p: reclaim port │ c: clear │ j/k: scroll │ ?: help │ q: quit",
    )
    .style(Style::default().fg(app.config.theme.text_muted()))
    .alignment(Alignment::Center);

    f.render_widget(help, area);
}

// Helper to create a styled block (lazygit style)
pub fn styled_block<'a>(title: &str, app: &App, is_active: bool) -> Block<'a> {
    let theme = &app.config.theme;
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if is_active {
            theme.border_active()
        } else {
            theme.border()
        }))
        .title(format!(" {} ", title))
        .title_style(
            Style::default()
                .fg(if is_active {
                    theme.border_active()
                } else {
                    theme.text()
                })
                .bold(),
        )
}

// Help popup (lazygit style)
fn draw_help_popup(f: &mut Frame, app: &App, area: Rect) {
    let popup_width = 54.min(area.width.saturating_sub(4));
    let popup_height = 18.min(area.height.saturating_sub(4));
    let popup_area = Rect {
        x: (area.width.saturating_sub(popup_width)) / 2,
        y: (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    };

    // Clear the area behind the popup
    f.render_widget(Clear, popup_area);

    let key_style = Style::default().fg(Color::Yellow);
    let section_style = Style::default().fg(app.config.theme.line_info()).bold();

    let help_content = vec![
        Line::from(Span::styled("SERVER", section_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  s         ", key_style),
            Span::raw("Start the dev server"),
        ]),
        Line::from(vec![
            Span::styled("  x         ", key_style),
            Span::raw("Stop it (graceful, then forced)"),
        ]),
        Line::from(vec![
            Span::styled("  r         ", key_style),
            Span::raw("Restart (stop, cool down, start)"),
        ]),
        Line::from(vec![
            Span::styled("  p         ", key_style),
            Span::raw("Kill whatever holds the port"),
        ]),
        Line::from(""),
        Line::from(Span::styled("CONSOLE", section_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  j/k ↑/↓   ", key_style),
            Span::raw("Scroll output"),
        ]),
        Line::from(vec![
            Span::styled("  g/G       ", key_style),
            Span::raw("Oldest / newest output"),
        ]),
        Line::from(vec![
            Span::styled("  c         ", key_style),
            Span::raw("Clear the console"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  q         ", key_style),
            Span::raw("Quit (stops a running server first)"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close",
            Style::default().fg(app.config.theme.text_muted()).italic(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Keybindings ")
        .title_style(Style::default().fg(Color::Cyan).bold())
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_content)
        .block(block)
        .alignment(Alignment::Left);

    f.render_widget(help, popup_area);
}
