//! Account list shown after `:users`.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::App;

/// Render the listed accounts with their roles.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = &app.palette;
    let items: Vec<ListItem> = app
        .users
        .iter()
        .map(|user| {
            let role_style = if user.role.is_admin() {
                palette.highlighted()
            } else {
                palette.dimmed()
            };
            ListItem::new(Line::from(vec![
                Span::styled(user.username.clone(), palette.normal()),
                Span::styled(format!(" <{}>", user.email), palette.dimmed()),
                Span::styled(format!(" {}", user.role), role_style),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(Span::styled("Users", palette.panel_title()))
        .borders(Borders::ALL)
        .border_style(palette.normal());

    frame.render_widget(List::new(items).block(block), area);
}
