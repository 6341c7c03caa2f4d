//! Details of the selected card.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::date::{format_absolute, format_relative};
use super::theme::priority_label;
use crate::app::App;

/// Render the selected card's description and comments.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = &app.palette;
    let block = Block::default()
        .title(Span::styled("Details", palette.panel_title()))
        .borders(Borders::ALL)
        .border_style(palette.normal());

    let Some(task) = app.selected_task() else {
        let hint = Line::styled("No card selected", palette.dimmed());
        frame.render_widget(Paragraph::new(hint).block(block), area);
        return;
    };

    let now = Utc::now();
    let board = app.board().snapshot();
    let column = board
        .columns
        .get(&task.state)
        .map_or_else(|| task.state.to_string(), |c| c.title.clone());

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("[{}] ", priority_label(task.priority)),
                palette.priority(task.priority),
            ),
            Span::styled(task.title.clone(), palette.bold()),
        ]),
        Line::styled(
            format!(
                "{column} · {} · created {} · updated {}",
                task.assignee.as_deref().map_or_else(|| "unassigned".to_string(), |a| format!("@{a}")),
                format_absolute(task.created_at, &app.timestamp_format),
                format_relative(task.updated_at, now),
            ),
            palette.dimmed(),
        ),
        Line::raw(""),
    ];

    if task.description.trim().is_empty() {
        lines.push(Line::styled("No description", palette.dimmed()));
    } else {
        lines.extend(task.description.lines().map(|l| Line::styled(l.to_string(), palette.normal())));
    }

    let attachments = task.attachments.count();
    if attachments > 0 {
        lines.push(Line::raw(""));
        lines.push(Line::styled(format!("Attachments: {attachments}"), palette.dimmed()));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        format!("Comments ({})", task.comments.len()),
        palette.panel_title(),
    ));
    for comment in &task.comments {
        lines.push(Line::from(vec![
            Span::styled(comment.author.clone(), palette.bold()),
            Span::styled(
                format!(" {}", format_relative(comment.created_at, now)),
                palette.dimmed(),
            ),
        ]));
        lines.push(Line::styled(format!("  {}", comment.content), palette.normal()));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
