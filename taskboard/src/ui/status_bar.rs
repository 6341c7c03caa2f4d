//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Key help for the current mode.
#[must_use]
pub fn help_text(app: &App) -> &'static str {
    if app.prompt.is_some() {
        return "Enter: run | Esc: cancel | :help lists commands";
    }
    if app.carry.is_some() {
        return "←→↑↓: choose slot | Enter/Space: drop | Esc: cancel";
    }
    match app.focus {
        PanelFocus::Board => {
            "Space: pick up | ←→↑↓/hjkl: navigate | </>: move column | :: command | Tab: switch panel | r: refresh | q: quit"
        }
        PanelFocus::Notifications => {
            "Enter: mark read | a: mark all read | ↑↓/jk: navigate | Tab: switch panel | q: quit"
        }
    }
}

/// Render the status bar at the bottom of the screen: a summary line and
/// either the open prompt or the latest status message.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = &app.palette;

    let (dot_color, mode_text) = if app.online {
        (theme::SUCCESS, "Online")
    } else {
        (theme::WARNING, "Offline demo")
    };
    let account = app.current_user.as_ref().map_or_else(
        || "signed out".to_string(),
        |u| format!("{} ({})", u.username, u.role),
    );

    let summary = Line::from(vec![
        Span::styled(concat!("Taskboard v", env!("CARGO_PKG_VERSION")), palette.bold()),
        Span::raw(" | "),
        Span::styled("●", palette.normal().fg(dot_color)),
        Span::raw(format!(" {mode_text} | {account} | ")),
        Span::styled(help_text(app), palette.dimmed()),
    ]);

    let second = if let Some(prompt) = &app.prompt {
        Line::from(vec![
            Span::styled(":", palette.highlighted()),
            Span::styled(format!("{prompt}█"), palette.normal()),
        ])
    } else if let Some(status) = &app.status {
        let style = if status.is_error {
            palette.normal().fg(theme::ERROR)
        } else {
            palette.normal()
        };
        Line::styled(status.text.clone(), style)
    } else {
        Line::raw("")
    };

    let paragraph = Paragraph::new(vec![summary, second]).style(palette.status_bar_bg());
    frame.render_widget(paragraph, area);
}
