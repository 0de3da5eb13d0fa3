use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::pane_block;
use crate::app::App;
use crate::branch::{BranchRow, BranchTab};
use crate::cache::HeadState;
use crate::operation::short_rev;
use crate::pane::{PaneController, PaneId};
use crate::theme::Palette;

/// Keep the cursor of `pane` visible in `height` rows; returns (offset, selected).
fn window(app: &mut App, pane: PaneId, height: usize) -> (usize, Option<usize>) {
    let cursor = app.pane_mut(pane).cursor_mut();
    cursor.scroll_into_view(height);
    (cursor.offset(), cursor.selected())
}

/// Draw pre-built rows into `inner`, highlighting the selected one when focused.
fn render_rows(
    f: &mut Frame,
    inner: Rect,
    rows: Vec<Line<'static>>,
    offset: usize,
    selected: Option<usize>,
    focused: bool,
    p: &Palette,
) {
    let lines: Vec<Line> = rows
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(inner.height as usize)
        .map(|(idx, line)| {
            if Some(idx) == selected {
                let style = if focused {
                    Style::default().bg(p.selection_bg).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().bg(p.selection_bg)
                };
                line.style(style)
            } else {
                line
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn inner(area: Rect) -> Rect {
    area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    })
}

fn empty_hint(f: &mut Frame, area: Rect, text: &str, p: &Palette) {
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(p.muted),
        ))),
        area,
    );
}

pub fn render_branches(app: &mut App, f: &mut Frame, area: Rect, p: &Palette) {
    let head = match &app.cache.head {
        Some(HeadState::Branch(name)) => match app.cache.current_branch() {
            Some(b) if !b.track_label().is_empty() => format!("{} {}", name, b.track_label()),
            _ => name.clone(),
        },
        Some(HeadState::Unborn(name)) => format!("{} (no commits)", name),
        Some(HeadState::Detached(rev)) => format!("HEAD detached at {}", short_rev(rev)),
        None => "…".to_string(),
    };
    let block = pane_block(app, PaneId::Branches, format!("Branches · {}", head), p);
    f.render_widget(block, area);
    let body = inner(area);
    if body.height == 0 {
        return;
    }

    let mut tabs = Vec::new();
    for tab in BranchTab::all() {
        let style = if tab == app.branches.tab {
            Style::default()
                .fg(p.accent_primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(p.muted)
        };
        tabs.push(Span::styled(tab.label(), style));
        tabs.push(Span::raw("  "));
    }
    f.render_widget(
        Paragraph::new(Line::from(tabs)),
        Rect {
            height: 1,
            ..body
        },
    );

    let list_area = Rect {
        y: body.y + 1,
        height: body.height.saturating_sub(1),
        ..body
    };
    let rows: Vec<Line<'static>> = app
        .branches
        .rows(&app.cache)
        .into_iter()
        .map(|row| match row {
            BranchRow::Branch(b) => {
                let marker = if b.is_current { "* " } else { "  " };
                let name_style = if b.is_current {
                    Style::default().fg(p.accent_secondary).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(p.fg)
                };
                let mut spans = vec![
                    Span::styled(marker, Style::default().fg(p.accent_secondary)),
                    Span::styled(b.name.clone(), name_style),
                ];
                if let Some(up) = &b.upstream {
                    spans.push(Span::styled(format!("  {}", up), Style::default().fg(p.muted)));
                }
                let track = b.track_label();
                if !track.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", track),
                        Style::default().fg(p.accent_tertiary),
                    ));
                }
                Line::from(spans)
            }
            BranchRow::Tag(t) => Line::from(vec![
                Span::styled(format!("  {}", t.name), Style::default().fg(p.fg)),
                Span::styled(
                    format!("  {}", short_rev(&t.target)),
                    Style::default().fg(p.muted),
                ),
            ]),
        })
        .collect();

    if rows.is_empty() {
        let text = match app.branches.tab {
            BranchTab::Local => "No branches",
            BranchTab::Remote => "No remote branches",
            BranchTab::Tags => "No tags",
        };
        return empty_hint(f, list_area, text, p);
    }
    let (offset, selected) = window(app, PaneId::Branches, list_area.height as usize);
    let focused = app.focus == PaneId::Branches;
    render_rows(f, list_area, rows, offset, selected, focused, p);
}

pub fn render_files(app: &mut App, f: &mut Frame, area: Rect, p: &Palette) {
    let staged = app.cache.files.iter().filter(|f| f.staged).count();
    let conflicted = app.cache.conflicted_paths().len();
    let title = if conflicted > 0 {
        format!("Files ({} conflicted / {})", conflicted, app.cache.files.len())
    } else {
        format!("Files ({} staged / {})", staged, app.cache.files.len())
    };
    f.render_widget(pane_block(app, PaneId::Files, title, p), area);
    let body = inner(area);

    let rows: Vec<Line<'static>> = app
        .cache
        .files
        .iter()
        .map(|file| {
            let (side, side_color) = if file.is_conflicted() {
                ("!!", p.error_fg)
            } else if file.staged {
                ("S ", p.diff_add_fg)
            } else {
                ("  ", p.fg)
            };
            let color = if file.is_conflicted() {
                p.error_fg
            } else if file.staged {
                p.diff_add_fg
            } else {
                p.diff_del_fg
            };
            let mut spans = vec![
                Span::styled(side, Style::default().fg(side_color)),
                Span::styled(
                    format!("{} ", file.status.marker()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(file.path.clone(), Style::default().fg(p.fg)),
            ];
            if let Some(from) = &file.renamed_from {
                spans.push(Span::styled(format!(" ← {}", from), Style::default().fg(p.muted)));
            }
            Line::from(spans)
        })
        .collect();

    if rows.is_empty() {
        return empty_hint(f, body, "Working tree clean", p);
    }
    let (offset, selected) = window(app, PaneId::Files, body.height as usize);
    let focused = app.focus == PaneId::Files;
    render_rows(f, body, rows, offset, selected, focused, p);
}

pub fn render_log(app: &mut App, f: &mut Frame, area: Rect, p: &Palette) {
    let title = match app.log.filter() {
        Some(filter) if !filter.query.is_empty() => format!(
            "Log · /{} ({} of {})",
            filter.query,
            filter.matches.len(),
            app.cache.commits.len()
        ),
        _ => format!("Log ({})", app.cache.commits.len()),
    };
    f.render_widget(pane_block(app, PaneId::Log, title, p), area);
    let body = inner(area);

    let rows: Vec<Line<'static>> = app
        .log
        .items(&app.cache)
        .into_iter()
        .map(|c| {
            let mut spans = vec![
                Span::styled(format!("{} ", c.short), Style::default().fg(p.accent_secondary)),
                Span::styled(format!("{} ", c.date), Style::default().fg(p.muted)),
            ];
            if c.is_merge() {
                spans.push(Span::styled("⑂ ", Style::default().fg(p.accent_tertiary)));
            }
            spans.push(Span::styled(c.summary.clone(), Style::default().fg(p.fg)));
            spans.push(Span::styled(format!("  {}", c.author), Style::default().fg(p.muted)));
            Line::from(spans)
        })
        .collect();

    if rows.is_empty() {
        let text = if app.log.filter().is_some() {
            "No matching commits"
        } else {
            "No commits yet"
        };
        return empty_hint(f, body, text, p);
    }
    let (offset, selected) = window(app, PaneId::Log, body.height as usize);
    let focused = app.focus == PaneId::Log;
    render_rows(f, body, rows, offset, selected, focused, p);
}

pub fn render_remotes(app: &mut App, f: &mut Frame, area: Rect, p: &Palette) {
    let title = format!("Remotes ({})", app.cache.remotes.len());
    f.render_widget(pane_block(app, PaneId::Remotes, title, p), area);
    let body = inner(area);

    let rows: Vec<Line<'static>> = app
        .cache
        .remotes
        .iter()
        .map(|r| {
            Line::from(vec![
                Span::styled(r.name.clone(), Style::default().fg(p.accent_tertiary)),
                Span::styled(format!("  {}", r.url), Style::default().fg(p.muted)),
            ])
        })
        .collect();

    if rows.is_empty() {
        return empty_hint(f, body, "No remotes", p);
    }
    let (offset, selected) = window(app, PaneId::Remotes, body.height as usize);
    let focused = app.focus == PaneId::Remotes;
    render_rows(f, body, rows, offset, selected, focused, p);
}

pub fn render_detail(app: &mut App, f: &mut Frame, area: Rect, p: &Palette) {
    let title = if app.detail.is_loading() {
        format!("{} …", app.detail.title())
    } else {
        app.detail.title().to_string()
    };
    f.render_widget(pane_block(app, PaneId::Detail, title, p), area);
    let body = inner(area);

    // The cursor is the first visible line.
    let top = app.detail.cursor().selected().unwrap_or(0);
    let lines: Vec<Line> = app
        .detail
        .lines()
        .iter()
        .skip(top)
        .take(body.height as usize)
        .map(|l| {
            let color = if l.starts_with("+++") || l.starts_with("---") {
                p.fg
            } else if l.starts_with('+') {
                p.diff_add_fg
            } else if l.starts_with('-') {
                p.diff_del_fg
            } else if l.starts_with("@@") || l.starts_with("──") {
                p.diff_hunk_fg
            } else if l.starts_with("<<<<<<<") || l.starts_with(">>>>>>>") || l.starts_with("=======") {
                p.warn_fg
            } else {
                p.fg
            };
            Line::from(Span::styled(l.clone(), Style::default().fg(color)))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), body);
}
