//! Terminal UI rendering.

pub mod board_view;
pub mod date;
pub mod notifications_view;
pub mod status_bar;
pub mod task_details;
pub mod theme;
pub mod users_view;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Status bar and prompt at the bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main_chunks[0]);

    let board_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(content_chunks[0]);

    board_view::render(frame, board_chunks[0], app);
    task_details::render(frame, board_chunks[1], app);

    if app.users.is_empty() {
        notifications_view::render(frame, content_chunks[1], app);
    } else {
        let side_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(content_chunks[1]);
        notifications_view::render(frame, side_chunks[0], app);
        users_view::render(frame, side_chunks[1], app);
    }

    status_bar::render(frame, main_chunks[1], app);
}
