use crate::app::App;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use std::time::Duration;

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Surface whatever the drain thread queued before drawing
        app.drain_relay();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with timeout so the relay keeps flowing
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(app, key)? {
                    return Ok(());
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Help popup handling
    if app.show_help {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.show_help = false;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Clear status on any key press
    app.clear_status();

    match key.code {
        // Quit, stopping a live server first
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.on_quit();
            app.should_quit = true;
            return Ok(true);
        }
        KeyCode::Char('q') => {
            app.on_quit();
            app.should_quit = true;
            return Ok(true);
        }

        // Server lifecycle
        KeyCode::Char('s') => app.start_server(),
        KeyCode::Char('x') => app.stop_server(),
        KeyCode::Char('r') => app.restart_server(),
        KeyCode::Char('p') => app.reclaim_port_now(),

        // Console
        KeyCode::Char('c') => app.clear_console(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_top(),
        KeyCode::Char('G') => app.scroll_bottom(),
        KeyCode::PageUp => {
            for _ in 0..10 {
                app.scroll_up();
            }
        }
        KeyCode::PageDown => {
            for _ in 0..10 {
                app.scroll_down();
            }
        }

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }

    Ok(false)
}
