use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::App;
use crate::input::TextInput;
use crate::overlay::{AddRemoteForm, Overlay, RemoteField};
use crate::theme::Palette;

/// Draw every open overlay, oldest first, so the top one ends up in front.
pub fn render_overlays(app: &App, f: &mut Frame, area: Rect, p: &Palette) {
    let depth = app.overlays.len();
    for (idx, overlay) in app.overlays.iter().enumerate() {
        let is_top = idx + 1 == depth;
        render_overlay(overlay, is_top, f, area, p);
    }
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn popup_block<'a>(title: &str, p: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::ROUNDED)
        .border_style(Style::default().fg(p.accent_primary))
        .style(Style::default().bg(p.overlay_bg).fg(p.fg))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(p.accent_primary)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_overlay(overlay: &Overlay, is_top: bool, f: &mut Frame, area: Rect, p: &Palette) {
    match overlay {
        Overlay::CommitMessage(o) | Overlay::NewBranch(o) => {
            let rect = popup_area(area, 64, 5);
            f.render_widget(Clear, rect);
            let block = popup_block(overlay.title(), p);
            let inner = block.inner(rect);
            f.render_widget(block, rect);
            render_input(f, inner, None, &o.input, is_top, p);
            render_error(f, inner, 1, o.error.as_deref(), p);
        }
        Overlay::AddRemote(form) => render_add_remote(form, overlay.title(), is_top, f, area, p),
        Overlay::Confirm(prompt) => {
            let height = prompt.lines.len() as u16 + 5;
            let rect = popup_area(area, 64, height);
            f.render_widget(Clear, rect);
            let block = popup_block(overlay.title(), p);
            let inner = block.inner(rect);
            f.render_widget(block, rect);

            let mut lines: Vec<Line> = prompt
                .lines
                .iter()
                .map(|l| Line::from(l.as_str()))
                .collect();
            lines.push(Line::default());
            let mut choices = Vec::new();
            for (key, label) in prompt.choices() {
                choices.push(Span::styled(
                    format!("[{}]", key),
                    Style::default()
                        .fg(p.accent_secondary)
                        .add_modifier(Modifier::BOLD),
                ));
                choices.push(Span::raw(format!(" {}   ", label)));
            }
            lines.push(Line::from(choices));
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
        }
        Overlay::FuzzyFind(find) => {
            // Sits at the bottom so the filtered log stays visible.
            let width = area.width.min(64);
            let rect = Rect {
                x: area.x + (area.width - width) / 2,
                y: area.y + area.height.saturating_sub(3),
                width,
                height: 3.min(area.height),
            };
            f.render_widget(Clear, rect);
            let block = popup_block(overlay.title(), p);
            let inner = block.inner(rect);
            f.render_widget(block, rect);
            render_input(f, inner, Some("/"), &find.input, is_top, p);
        }
    }
}

fn render_input(
    f: &mut Frame,
    area: Rect,
    label: Option<&str>,
    input: &TextInput,
    focused: bool,
    p: &Palette,
) {
    if area.height == 0 {
        return;
    }
    let label = label.unwrap_or("");
    let line = Line::from(vec![
        Span::styled(label.to_string(), Style::default().fg(p.accent_tertiary)),
        Span::styled(input.text().to_string(), Style::default().fg(p.fg)),
    ]);
    let row = Rect { height: 1, ..area };
    f.render_widget(Paragraph::new(line), row);
    if focused {
        let x = row.x + (label.len() + input.cursor_width()) as u16;
        f.set_cursor_position(Position::new(x.min(row.right().saturating_sub(1)), row.y));
    }
}

fn render_error(f: &mut Frame, area: Rect, row: u16, error: Option<&str>, p: &Palette) {
    let Some(error) = error else {
        return;
    };
    if area.height <= row {
        return;
    }
    let rect = Rect {
        y: area.y + row,
        height: 1,
        ..area
    };
    f.render_widget(
        Paragraph::new(Span::styled(error.to_string(), Style::default().fg(p.error_fg))),
        rect,
    );
}

fn render_add_remote(
    form: &AddRemoteForm,
    title: &str,
    is_top: bool,
    f: &mut Frame,
    area: Rect,
    p: &Palette,
) {
    let rect = popup_area(area, 64, 6);
    f.render_widget(Clear, rect);
    let block = popup_block(title, p);
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    for (row, field, label) in [
        (0u16, RemoteField::Name, "Name: "),
        (1, RemoteField::Url, "URL:  "),
    ] {
        if inner.height <= row {
            break;
        }
        let line_area = Rect {
            y: inner.y + row,
            height: 1,
            ..inner
        };
        let focused = is_top && form.focus == field;
        let label_style = if form.focus == field {
            Style::default()
                .fg(p.accent_primary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.muted)
        };
        f.render_widget(Paragraph::new(Span::styled(label, label_style)), line_area);
        let input_area = Rect {
            x: line_area.x + label.len() as u16,
            width: line_area.width.saturating_sub(label.len() as u16),
            ..line_area
        };
        render_input(f, input_area, None, form.field(field), focused, p);
    }
    render_error(f, inner, 3, form.error.as_deref(), p);
}
