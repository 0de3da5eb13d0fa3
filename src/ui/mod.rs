//! Drawing. Nothing here changes repository state; the only mutation is
//! keeping list scroll offsets in view of the area they are drawn into.

mod overlays;
mod panes;

use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, StatusLevel};
use crate::pane::PaneId;
use crate::theme::{Palette, palette};

/// Status messages dim after this long.
const STATUS_FADE: Duration = Duration::from_secs(8);

pub fn render(app: &mut App, f: &mut Frame) {
    let p = palette(app.theme);
    let area = f.area();
    f.render_widget(Block::default().style(Style::default().bg(p.bg).fg(p.fg)), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Percentage(20),
        ])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    panes::render_branches(app, f, left[0], &p);
    panes::render_files(app, f, left[1], &p);
    panes::render_remotes(app, f, left[2], &p);
    panes::render_log(app, f, right[0], &p);
    panes::render_detail(app, f, right[1], &p);

    render_status(app, f, rows[1], &p);
    render_hints(app, f, rows[2], &p);

    overlays::render_overlays(app, f, rows[0], &p);
}

/// Bordered block for a pane, highlighted when focused.
pub(crate) fn pane_block<'a>(app: &App, pane: PaneId, title: String, p: &Palette) -> Block<'a> {
    let focused = app.focus == pane;
    let border = if focused {
        p.accent_primary
    } else {
        p.border_inactive
    };
    let mut spans = vec![Span::styled(
        format!(" {} {} ", pane.number(), title),
        Style::default().fg(border).add_modifier(if focused {
            Modifier::BOLD
        } else {
            Modifier::empty()
        }),
    )];
    let busy = app.busy(pane);
    if busy > 0 {
        let label = if busy == 1 {
            " busy ".to_string()
        } else {
            format!(" busy ×{} ", busy)
        };
        spans.push(Span::styled(label, Style::default().fg(p.accent_secondary)));
    }
    Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(border))
        .title(Line::from(spans))
}

fn render_status(app: &App, f: &mut Frame, area: Rect, p: &Palette) {
    let Some(status) = &app.status else {
        return;
    };
    let color = if status.at.elapsed() > STATUS_FADE {
        p.muted
    } else {
        match status.level {
            StatusLevel::Info => p.fg,
            StatusLevel::Warn => p.warn_fg,
            StatusLevel::Error => p.error_fg,
        }
    };
    let line = Line::from(Span::styled(format!(" {}", status.text), Style::default().fg(color)));
    f.render_widget(Paragraph::new(line), area);
}

fn render_hints(app: &App, f: &mut Frame, area: Rect, p: &Palette) {
    let key_style = Style::default()
        .fg(p.accent_tertiary)
        .add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(p.muted);

    let mut pairs: Vec<(String, String)> = match app.overlays.top() {
        Some(overlay) => overlay
            .hints()
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect(),
        None => app
            .pane(app.focus)
            .bindings()
            .iter()
            .map(|b| (key_label(b.code), b.hint.to_string()))
            .collect(),
    };
    if app.overlays.is_empty() {
        pairs.push(("1-5".to_string(), "focus".to_string()));
        pairs.push(("q".to_string(), "quit".to_string()));
    }

    let mut spans = vec![Span::raw(" ")];
    for (k, v) in pairs {
        spans.push(Span::styled(k, key_style));
        spans.push(Span::styled(format!(" {}  ", v), text_style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn key_label(code: crossterm::event::KeyCode) -> String {
    use crossterm::event::KeyCode;
    match code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        other => format!("{:?}", other),
    }
}
