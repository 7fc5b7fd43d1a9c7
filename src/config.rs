use ratatui::style::Color;
use serde::Deserialize;
use std::path::PathBuf;

/// The well-known dev server port; everything defaults to it
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SERVER_COMMAND: &str = "npm run dev";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub project_dir: PathBuf,
    pub server_command: String,
    pub theme: Theme,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Theme {
    // Border colors
    pub border: String,
    pub border_active: String,

    // Phase colors
    pub phase_ready: String,
    pub phase_running: String,
    pub phase_starting: String,
    pub phase_stopped: String,
    pub phase_error: String,
    pub phase_inactive: String,

    // Console line colors
    pub line_output: String,
    pub line_info: String,
    pub line_warn: String,
    pub line_error: String,

    // General
    pub text: String,
    pub text_muted: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            project_dir: PathBuf::from("."),
            server_command: DEFAULT_SERVER_COMMAND.to_string(),
            theme: Theme::default(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: "#5c6370".to_string(),
            border_active: "#98c379".to_string(),
            phase_ready: "#98c379".to_string(),
            phase_running: "#56b6c2".to_string(),
            phase_starting: "#e5c07b".to_string(),
            phase_stopped: "#e06c75".to_string(),
            phase_error: "#e06c75".to_string(),
            phase_inactive: "#5c6370".to_string(),
            line_output: "#98c379".to_string(),
            line_info: "#61afef".to_string(),
            line_warn: "#e5c07b".to_string(),
            line_error: "#e06c75".to_string(),
            text: "#abb2bf".to_string(),
            text_muted: "#5c6370".to_string(),
        }
    }
}

impl Config {
    /// Load from the first config file found; defaults (port 3000,
    /// `npm run dev`, cwd as project dir) when none exists.
    pub fn load() -> Self {
        let paths = [
            dirs::config_dir().map(|p| p.join("lazyserve/config.toml")),
            dirs::home_dir().map(|p| p.join(".lazyserve.toml")),
            Some(PathBuf::from("lazyserve.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }

        Config::default()
    }
}

impl Theme {
    pub fn parse_color(&self, hex: &str) -> Color {
        parse_hex_color(hex).unwrap_or(Color::White)
    }

    pub fn border(&self) -> Color {
        self.parse_color(&self.border)
    }

    pub fn border_active(&self) -> Color {
        self.parse_color(&self.border_active)
    }

    pub fn phase_ready(&self) -> Color {
        self.parse_color(&self.phase_ready)
    }

    pub fn phase_running(&self) -> Color {
        self.parse_color(&self.phase_running)
    }

    pub fn phase_starting(&self) -> Color {
        self.parse_color(&self.phase_starting)
    }

    pub fn phase_stopped(&self) -> Color {
        self.parse_color(&self.phase_stopped)
    }

    pub fn phase_error(&self) -> Color {
        self.parse_color(&self.phase_error)
    }

    pub fn phase_inactive(&self) -> Color {
        self.parse_color(&self.phase_inactive)
    }

    pub fn line_output(&self) -> Color {
        self.parse_color(&self.line_output)
    }

    pub fn line_info(&self) -> Color {
        self.parse_color(&self.line_info)
    }

    pub fn line_warn(&self) -> Color {
        self.parse_color(&self.line_warn)
    }

    pub fn line_error(&self) -> Color {
        self.parse_color(&self.line_error)
    }

    pub fn text(&self) -> Color {
        self.parse_color(&self.text)
    }

    pub fn text_muted(&self) -> Color {
        self.parse_color(&self.text_muted)
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some(Color::Rgb(r, g, b))
}
