use serde::Deserialize;
use std::path::PathBuf;

use crate::threads::Criteria;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub filter: FilterConfig,
    pub archive: ArchiveConfig,
    pub output: OutputConfig,
    pub layout: LayoutConfig,
    pub theme: ThemeConfig,
}

/// Thread size and staleness thresholds, inclusive on both ends
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_msg_count: usize,
    pub max_msg_count: usize,
    pub min_age_days: i64,
    pub max_age_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Command used to query the archive (default: "lei")
    pub lei: String,
    /// Command used to read message blobs (default: "git")
    pub git: String,
    /// Local public-inbox mirror; discovered via `lei ls-external` when unset
    pub repo: Option<String>,
    /// Seconds before a preview fetch is abandoned
    pub preview_timeout_secs: u64,
    /// Warn when the newest archived message is older than this
    pub stale_after_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding the threads_<edition> folders
    pub dir: String,
    /// Newsletter title used in the index heading
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Show the preview pane at startup
    pub preview: bool,
    /// Terminal width below which the preview pane is suppressed
    pub preview_min_width: u16,
    /// Width of the thread list when the preview is visible
    pub list_width: u16,
    /// Body lines kept per cached preview
    pub preview_max_lines: usize,
}

/// Colours for the selector, as hex strings or terminal colour names
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub bg_panel: String,
    pub fg: String,
    pub fg_muted: String,
    pub border: String,
    pub border_active: String,
    pub primary: String,
    pub secondary: String,
    pub success: String,
    pub selected_bg: String,
    pub done: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_msg_count: 5,
            max_msg_count: 40,
            min_age_days: 21,
            max_age_days: 90,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            lei: "lei".to_string(),
            git: "git".to_string(),
            repo: None,
            preview_timeout_secs: 10,
            stale_after_days: 3,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            title: "Git Rev News".to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            preview: true,
            preview_min_width: 105,
            list_width: 75,
            preview_max_lines: 200,
        }
    }
}

/// Dark panels, gold for keys and borders, green for selected threads
impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            bg_panel: "#262422".to_string(),
            fg: "#f7f7f5".to_string(),
            fg_muted: "#8c8985".to_string(),
            border: "#524f4c".to_string(),
            border_active: "#d4a366".to_string(), // primary
            primary: "#d4a366".to_string(),
            secondary: "#8fa5ae".to_string(), // blue
            success: "#52c41a".to_string(),
            selected_bg: "#393634".to_string(),
            done: "#8fa5ae".to_string(), // secondary
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("threadpick/config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/threadpick/config.toml"))
    }

    pub fn load() -> Self {
        let config_path = Self::path();

        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Config parse error: {}", e),
                },
                Err(e) => tracing::warn!("Config read error: {}", e),
            }
        }

        Self::default()
    }

    pub fn criteria(&self) -> Criteria {
        Criteria {
            min_msg_count: self.filter.min_msg_count,
            max_msg_count: self.filter.max_msg_count,
            min_age_days: self.filter.min_age_days,
            max_age_days: self.filter.max_age_days,
        }
    }
}

impl ArchiveConfig {
    pub fn repo_path(&self) -> Option<PathBuf> {
        self.repo
            .as_deref()
            .map(|r| PathBuf::from(shellexpand::tilde(r).into_owned()))
    }
}

impl OutputConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).into_owned())
    }
}

impl ThemeConfig {
    pub fn bg_panel(&self) -> ratatui::style::Color {
        parse_color(&self.bg_panel)
    }
    pub fn fg(&self) -> ratatui::style::Color {
        parse_color(&self.fg)
    }
    pub fn fg_muted(&self) -> ratatui::style::Color {
        parse_color(&self.fg_muted)
    }
    pub fn border(&self) -> ratatui::style::Color {
        parse_color(&self.border)
    }
    pub fn border_active(&self) -> ratatui::style::Color {
        parse_color(&self.border_active)
    }
    pub fn primary(&self) -> ratatui::style::Color {
        parse_color(&self.primary)
    }
    pub fn secondary(&self) -> ratatui::style::Color {
        parse_color(&self.secondary)
    }
    pub fn success(&self) -> ratatui::style::Color {
        parse_color(&self.success)
    }
    pub fn selected_bg(&self) -> ratatui::style::Color {
        parse_color(&self.selected_bg)
    }
    pub fn done(&self) -> ratatui::style::Color {
        parse_color(&self.done)
    }
}

/// Parse color string to ratatui Color
pub fn parse_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;

    // Try hex first (#RRGGBB)
    if s.starts_with('#') && s.len() == 7 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[1..3], 16),
            u8::from_str_radix(&s[3..5], 16),
            u8::from_str_radix(&s[5..7], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }

    match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        _ => Color::White,
    }
}
