//! Kanban columns and cards.

use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use taskboard_proto::Task;

use super::date::format_relative;
use super::theme::{Palette, priority_label};
use crate::app::{App, PanelFocus};
use crate::board::LoadState;

/// Render the board: one bordered list per column, in column order.
///
/// While a card is carried the board is drawn as it would look after the
/// drop, with the carried card marked.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = &app.palette;
    let board = app.preview_board();
    let columns = board.ordered_columns();

    if columns.is_empty() {
        let text = match app.board().load_state() {
            LoadState::Failed(message) => Line::styled(
                format!("Could not load board: {message} (press r to retry)"),
                palette.normal().fg(super::theme::ERROR),
            ),
            LoadState::Ready => Line::styled("This board has no columns", palette.dimmed()),
            LoadState::Idle | LoadState::Loading => Line::styled("Loading board...", palette.dimmed()),
        };
        let block = Block::default()
            .title(Span::styled("Board", palette.panel_title()))
            .borders(Borders::ALL)
            .border_style(palette.normal());
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|_| Constraint::Ratio(1, u32::try_from(columns.len()).unwrap_or(u32::MAX)))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let carried = app.carry.as_ref().map(|c| &c.task_id);
    let board_focused = app.focus == PanelFocus::Board;
    let now = Utc::now();

    for (idx, (column, chunk)) in columns.iter().zip(chunks.iter()).enumerate() {
        let tasks = board.tasks_in(&column.id);
        let is_selected_column = match &app.carry {
            Some(carry) => carry.dest_column == idx,
            None => idx == app.selected_column,
        };

        let items: Vec<ListItem> = tasks
            .iter()
            .map(|task| {
                let style = if carried == Some(&task.id) {
                    palette.carried()
                } else {
                    palette.normal()
                };
                ListItem::new(card_lines(task, now, palette)).style(style)
            })
            .collect();

        let mut state = ListState::default();
        let highlight_row = match &app.carry {
            Some(carry) if carry.dest_column == idx => Some(carry.dest_index),
            Some(_) => None,
            None if is_selected_column && board_focused => Some(app.selected_row),
            None => None,
        };
        state.select(highlight_row.filter(|_| !tasks.is_empty()));

        let title = Line::from(vec![
            Span::styled(column.title.clone(), palette.panel_title()),
            Span::styled(format!(" ({})", tasks.len()), palette.dimmed()),
        ]);
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if is_selected_column && board_focused {
                palette.highlighted()
            } else {
                palette.normal()
            });

        let list = List::new(items)
            .block(block)
            .highlight_style(if app.carry.is_some() {
                palette.carried()
            } else {
                palette.selected()
            });
        frame.render_stateful_widget(list, *chunk, &mut state);
    }
}

/// The lines of one card: badge and title, then metadata.
fn card_lines<'a>(task: &'a Task, now: DateTime<Utc>, palette: &Palette) -> Vec<Line<'a>> {
    vec![
        Line::from(vec![
            Span::styled(
                format!("[{}] ", priority_label(task.priority)),
                palette.priority(task.priority),
            ),
            Span::raw(task.title.as_str()),
        ]),
        Line::styled(format!("  {}", card_meta(task, now)), palette.dimmed()),
        Line::raw(""),
    ]
}

/// Assignee, counters, and age of a card, joined by `·`.
#[must_use]
pub fn card_meta(task: &Task, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();
    if let Some(assignee) = &task.assignee {
        parts.push(format!("@{assignee}"));
    }
    let comments = task.comments.len();
    if comments > 0 {
        parts.push(format!("{comments} comment{}", if comments == 1 { "" } else { "s" }));
    }
    let attachments = task.attachments.count();
    if attachments > 0 {
        parts.push(format!(
            "{attachments} attachment{}",
            if attachments == 1 { "" } else { "s" }
        ));
    }
    parts.push(format_relative(task.created_at, now));
    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use taskboard_proto::{Attachments, Comment, CommentId, TaskId};

    fn task() -> Task {
        let created = Utc::now() - Duration::days(3);
        Task {
            id: TaskId::from("t1"),
            title: "Update design".to_string(),
            description: String::new(),
            priority: None,
            assignee: None,
            state: "todo".into(),
            attachments: Attachments::default(),
            comments: Vec::new(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn meta_for_bare_card_is_just_age() {
        assert_eq!(card_meta(&task(), Utc::now()), "3 days ago");
    }

    #[test]
    fn meta_includes_assignee_and_counters() {
        let mut t = task();
        t.assignee = Some("ann".to_string());
        t.attachments = Attachments::Count(2);
        t.comments.push(Comment {
            id: CommentId::from("c1"),
            content: "looks good".to_string(),
            author: "bob".to_string(),
            created_at: Utc::now(),
        });
        assert_eq!(
            card_meta(&t, Utc::now()),
            "@ann · 1 comment · 2 attachments · 3 days ago"
        );
    }
}
