//! UI rendering

use std::time::Instant;

use eecalc_core::TransitionKind;
use eecalc_core::sheet::{CellRecord, CellResult};
use eecalc_core::starters::STARTERS;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::app::App;

pub(crate) const HEADER_HEIGHT: u16 = 1;
pub(crate) const SHEET_MIN_HEIGHT: u16 = 6;
pub(crate) const STATUS_BAR_HEIGHT: u16 = 1;
/// Input line plus output line.
pub(crate) const ROWS_PER_CELL: u16 = 2;

pub(crate) fn split_main_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(SHEET_MIN_HEIGHT),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// First cell to draw so that `focused` stays on screen.
pub(crate) fn first_visible(focused: usize, visible: usize) -> usize {
    if visible == 0 {
        return focused;
    }
    focused.saturating_sub(visible - 1)
}

/// The leading `fraction` of `text`, by characters, rounded up.
pub(crate) fn reveal(text: &str, fraction: f32) -> String {
    let total = text.chars().count();
    let shown = ((total as f32) * fraction.clamp(0.0, 1.0)).ceil() as usize;
    text.chars().take(shown).collect()
}

pub fn draw(f: &mut Frame, app: &App) {
    let [header, sheet, status] = split_main_chunks(f.area());
    draw_header(f, app, header);
    draw_sheet(f, app, sheet);
    draw_status_bar(f, app, status);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" eecalc ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" sheet {} ", app.sheet)),
    ];
    match (&app.server, app.is_online()) {
        (Some(server), true) => {
            spans.push(Span::styled(format!("@ {}", server), Style::default().fg(Color::Green)))
        }
        _ => spans.push(Span::styled("offline", Style::default().fg(Color::Yellow))),
    }
    let nickname = app.controller.nickname();
    if !nickname.is_empty() {
        spans.push(Span::styled(format!("  [{}]", nickname), Style::default().fg(Color::Cyan)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_sheet(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Cells ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cells = app.controller.cells();
    let focused = cells.focused();
    let visible = (inner.height / ROWS_PER_CELL) as usize;
    let first = first_visible(focused.unwrap_or(0), visible);
    let now = Instant::now();

    let mut lines: Vec<Line> = Vec::new();
    for cell in cells.cells().iter().skip(first).take(visible) {
        let is_focused = focused == Some(cell.index);
        lines.push(input_line(app, cell, is_focused, now));
        lines.push(output_line(app, cell, now));
    }
    f.render_widget(Paragraph::new(lines), inner);

    if let Some(index) = focused
        && index >= first
        && index < first + visible
        && let Some(cell) = cells.get(index)
    {
        let prefix = cell_prefix(cell.index).chars().count();
        let cursor = app.controller.cursor().min(cell.text.len());
        let before = cell.text.get(..cursor).map_or(0, |s| s.chars().count());
        if let Some((x, y)) = cursor_position(inner, prefix + before, index - first) {
            f.set_cursor_position((x, y));
        }
    }
}

/// Screen position of a cursor `column` characters into the `row`th visible
/// cell, or `None` when it falls outside `inner`.
pub(crate) fn cursor_position(inner: Rect, column: usize, row: usize) -> Option<(u16, u16)> {
    let x = inner.x.checked_add(u16::try_from(column).ok()?)?;
    let y = u16::try_from(row)
        .ok()?
        .checked_mul(ROWS_PER_CELL)
        .and_then(|dy| inner.y.checked_add(dy))?;
    (x < inner.right() && y < inner.bottom()).then_some((x, y))
}

fn cell_prefix(index: usize) -> String {
    format!("[{}] ", index)
}

fn input_line<'a>(app: &App, cell: &'a CellRecord, is_focused: bool, now: Instant) -> Line<'a> {
    let transitions = app.controller.transitions();
    let prefix_style = if is_focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let (text, text_style) = if cell.is_deleting() {
        let progress = transitions
            .progress(cell.id(), TransitionKind::Remove, now)
            .unwrap_or(1.0);
        (
            reveal(&cell.text, 1.0 - progress),
            Style::default().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
        )
    } else if let Some(progress) = transitions.progress(cell.id(), TransitionKind::Appear, now) {
        (reveal(&cell.text, progress), Style::default().add_modifier(Modifier::DIM))
    } else {
        (cell.text.clone(), Style::default())
    };

    Line::from(vec![
        Span::styled(cell_prefix(cell.index), prefix_style),
        Span::styled(text, text_style),
    ])
}

fn output_line<'a>(app: &App, cell: &'a CellRecord, now: Instant) -> Line<'a> {
    let flashing = app
        .controller
        .transitions()
        .progress(cell.id(), TransitionKind::Flash, now)
        .is_some();
    let indent = " ".repeat(cell_prefix(cell.index).chars().count());
    let (marker, style) = match &cell.result {
        CellResult::Empty => return Line::raw(""),
        CellResult::Error(_) => ("! ", Style::default().fg(Color::Red)),
        CellResult::Number(_) | CellResult::Display(_) if flashing => (
            "= ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        CellResult::Number(_) | CellResult::Display(_) => ("= ", Style::default().fg(Color::Green)),
    };
    Line::from(vec![
        Span::raw(indent),
        Span::styled(format!("{}{}", marker, cell.result.render()), style),
    ])
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let hints = format!(
        "Enter calc | Bksp on empty: delete | Up/Down move | ^R recalc | ^L reload fns | ^S save | Alt-1..{} starters | Esc quit",
        STARTERS.len()
    );
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.status_message),
            Style::default().fg(Color::Black).bg(Color::White),
        ),
        Span::styled(format!(" {}", hints), Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
