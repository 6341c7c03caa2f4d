//! Notification list.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use super::date::format_relative;
use super::theme;
use crate::app::{App, PanelFocus};

/// Render the notification list with unread markers.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = &app.palette;
    let is_focused = app.focus == PanelFocus::Notifications;
    let cache = app.notifications();
    let items = cache.snapshot();
    let unread = cache.unread_count();
    let now = Utc::now();

    let mut list_items: Vec<ListItem> = Vec::with_capacity(items.len() + 1);
    if let Some(error) = cache.last_error() {
        list_items.push(ListItem::new(Line::styled(error, palette.normal().fg(theme::ERROR))));
    }
    if items.is_empty() {
        list_items.push(ListItem::new(Line::styled("No notifications", palette.dimmed())));
    }
    let offset = list_items.len();

    list_items.extend(items.iter().map(|n| {
        let (marker, text_style) = if n.read {
            ("  ", palette.dimmed())
        } else {
            ("● ", palette.bold())
        };
        ListItem::new(vec![
            Line::from(vec![
                Span::styled(marker, palette.normal().fg(palette.accent)),
                Span::styled(n.message.clone(), text_style),
            ]),
            Line::styled(format!("  {}", format_relative(n.created_at, now)), palette.dimmed()),
        ])
    }));

    let mut title = vec![Span::styled("Notifications", palette.panel_title())];
    if unread > 0 {
        title.push(Span::raw(" "));
        title.push(Span::styled(format!("({unread})"), palette.unread_badge()));
    }
    if cache.is_loading() {
        title.push(Span::styled(" …", palette.dimmed()));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            palette.highlighted()
        } else {
            palette.normal()
        });

    let mut state = ListState::default();
    if is_focused && !items.is_empty() {
        state.select(Some(offset + app.selected_notification));
    }

    let list = List::new(list_items)
        .block(block)
        .highlight_style(palette.selected());
    frame.render_stateful_widget(list, area, &mut state);
}
