//! Theme and styling for the TUI.
//!
//! Colors come from a [`Palette`] resolved from the persisted theme mode
//! and accent color, so `:theme` and `:accent` take effect on the next
//! frame.

use ratatui::style::{Color, Modifier, Style};

use taskboard_proto::Priority;

use crate::session::{DEFAULT_ACCENT, ThemeMode, parse_hex_color};

/// Success indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error indicator color.
pub const ERROR: Color = Color::Red;

/// Resolved colors for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Primary foreground.
    pub fg: Color,
    /// Secondary (dimmed) foreground.
    pub fg_dim: Color,
    /// Background for bars and badges.
    pub bg_bar: Color,
    /// Accent for focus and selection.
    pub accent: Color,
    /// Whether this is the dark variant.
    pub dark: bool,
}

impl Palette {
    /// Builds the palette for a theme preference and `#RRGGBB` accent.
    ///
    /// `Auto` follows the terminal background as reported by `COLORFGBG`,
    /// defaulting to dark. An unparsable accent falls back to the default.
    #[must_use]
    pub fn resolve(mode: ThemeMode, accent: &str) -> Self {
        let dark = match mode {
            ThemeMode::Dark => true,
            ThemeMode::Light => false,
            ThemeMode::Auto => terminal_is_dark(std::env::var("COLORFGBG").ok().as_deref()),
        };
        let (r, g, b) = parse_hex_color(accent)
            .or_else(|| parse_hex_color(DEFAULT_ACCENT))
            .unwrap_or((0x3B, 0x82, 0xF6));
        let accent = Color::Rgb(r, g, b);
        if dark {
            Self {
                fg: Color::White,
                fg_dim: Color::Gray,
                bg_bar: Color::Rgb(30, 30, 50),
                accent,
                dark,
            }
        } else {
            Self {
                fg: Color::Black,
                fg_dim: Color::DarkGray,
                bg_bar: Color::Rgb(225, 228, 235),
                accent,
                dark,
            }
        }
    }

    /// Normal text style.
    #[must_use]
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg)
    }

    /// Dimmed text style (timestamps, metadata).
    #[must_use]
    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    /// Bold text style.
    #[must_use]
    pub fn bold(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    /// Highlighted text style (focused panel borders).
    #[must_use]
    pub fn highlighted(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Selected item style (in lists).
    #[must_use]
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(if self.dark { Color::Black } else { Color::White })
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Style of a card that is being carried to a new position.
    #[must_use]
    pub fn carried(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    /// Style for the status bar background.
    #[must_use]
    pub fn status_bar_bg(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg_bar)
    }

    /// Style for panel titles (bold accent).
    #[must_use]
    pub fn panel_title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Style for unread count badges.
    #[must_use]
    pub fn unread_badge(&self) -> Style {
        Style::default()
            .fg(WARNING)
            .bg(self.bg_bar)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for a priority badge.
    #[must_use]
    pub fn priority(&self, priority: Option<Priority>) -> Style {
        let color = match priority {
            Some(Priority::High) => ERROR,
            Some(Priority::Medium) => WARNING,
            Some(Priority::Low) => SUCCESS,
            None => self.fg_dim,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

/// Interprets `COLORFGBG` (`"fg;bg"`, e.g. `"15;0"`). Background colors
/// 7 and 9..=15 are light; anything unparsable counts as dark.
fn terminal_is_dark(colorfgbg: Option<&str>) -> bool {
    let Some(bg) = colorfgbg
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
    else {
        return true;
    };
    !(bg == 7 || (9..=15).contains(&bg))
}

/// Badge text for a priority.
#[must_use]
pub const fn priority_label(priority: Option<Priority>) -> &'static str {
    match priority {
        Some(p) => p.label(),
        None => "No priority",
    }
}
