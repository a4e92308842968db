use std::io::stdout;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame as TermFrame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use storyboard_core::model::Transformation;
use storyboard_core::views::{page_size_for_width, time_axis};
use storyboard_core::{DatasetFetcher, FetchResponse, Frame, Storyboard};
use storyboard_protocol::{HierarchyLink, ParentAnchor, RowView, VisibleFrame};

use crate::app::{App, Flow};
use crate::config::TuiConfig;

const ROW_HEIGHT: u16 = 4;

pub fn run_tui<F: DatasetFetcher>(
    app: &mut App<F>,
    responses: &Receiver<FetchResponse>,
    config: &TuiConfig,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, responses, config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop<F: DatasetFetcher>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App<F>,
    responses: &Receiver<FetchResponse>,
    config: &TuiConfig,
) -> Result<()> {
    let tick = Duration::from_millis(config.tick_ms.max(1));
    let mut last_size = None;
    loop {
        let size = terminal.size()?;
        app.session.set_page_size(page_size_for_width(
            f64::from(size.width),
            config.frame_width_cols,
        ));
        app.session.drain(responses);
        app.clamp_cursor();

        let resized = last_size != Some(size);
        last_size = Some(size);
        if std::mem::take(&mut app.session.sink_mut().dirty) || resized {
            terminal.draw(|frame| draw(frame, app))?;
        }

        if !event::poll(tick)? {
            continue;
        }
        let flow = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.handle_key(KeyCode::Up),
                MouseEventKind::ScrollDown => app.handle_key(KeyCode::Down),
                MouseEventKind::ScrollLeft => app.handle_key(KeyCode::Char('[')),
                MouseEventKind::ScrollRight => app.handle_key(KeyCode::Char(']')),
                // The scrubber is the second-to-last line.
                MouseEventKind::Down(MouseButton::Left)
                    if mouse.row + 2 == size.height && size.width > 1 =>
                {
                    app.scrub_at(f64::from(mouse.column) / f64::from(size.width - 1));
                    Flow::Continue
                }
                _ => Flow::Continue,
            },
            _ => Flow::Continue,
        };
        if flow == Flow::Quit {
            return Ok(());
        }
    }
}

fn draw<F: DatasetFetcher>(frame: &mut TermFrame, app: &App<F>) {
    let storyboard = app.session.storyboard();
    let rows = storyboard.rows();
    let links = storyboard.hierarchy_links();
    let area = frame.area();

    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(rows.iter().map(|_| Constraint::Length(ROW_HEIGHT)));
    constraints.extend([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)]);
    let chunks = Layout::vertical(constraints).split(area);

    let header = Paragraph::new(format!(
        " storyboard  {} roots | {} loading | ←→ move  [ ] page  Home/End  ↑↓ row  Enter zoom  click axis scrub  q quit",
        storyboard.tree().len(),
        storyboard.gate().in_flight(),
    ))
    .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(header, chunks[0]);

    for (i, row) in rows.iter().enumerate() {
        let link = links.iter().find(|link| link.depth == row.depth);
        draw_row(frame, chunks[i + 1], storyboard, app, row, link);
    }

    let axis_area = chunks[chunks.len() - 2];
    if let Some(row) = rows.get(app.row) {
        draw_axis(frame, axis_area, storyboard, row);
    }

    let status = app
        .session
        .sink()
        .status
        .clone()
        .unwrap_or_else(|| format!(" {}", describe_path(storyboard)));
    let status_style = if app.session.sink().status.is_some() {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default().fg(Color::Gray)
    };
    frame.render_widget(
        Paragraph::new(status).style(status_style),
        chunks[chunks.len() - 1],
    );
}

fn describe_path(storyboard: &Storyboard) -> String {
    storyboard
        .path()
        .levels()
        .iter()
        .map(|level| match level.zoomed_from_frame {
            None => format!("root@{}", level.start),
            Some(parent) => format!("{parent}@{}", level.start),
        })
        .collect::<Vec<_>>()
        .join(" › ")
}

fn link_label(link: Option<&HierarchyLink>) -> String {
    match link.map(|link| (link.zoomed_from_frame, link.anchor)) {
        None => String::new(),
        Some((parent, ParentAnchor::Visible { .. })) => format!(" ↑ #{parent}"),
        Some((parent, ParentAnchor::OffLeft)) => format!(" ↖ #{parent}"),
        Some((parent, ParentAnchor::OffRight)) => format!(" ↗ #{parent}"),
    }
}

fn draw_row<F: DatasetFetcher>(
    frame: &mut TermFrame,
    area: Rect,
    storyboard: &Storyboard,
    app: &App<F>,
    row: &RowView,
    link: Option<&HierarchyLink>,
) {
    let title = format!(
        " {}{} {}-{} of {} {}",
        if row.can_page_left { "◀ " } else { "" },
        row.depth,
        row.start,
        row.start + row.frames.len(),
        row.total,
        if row.can_page_right { "▶" } else { "" },
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title + &link_label(link))
        .border_style(if row.depth == app.row {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if row.frames.is_empty() {
        frame.render_widget(
            Paragraph::new("no children").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let source_row = storyboard.tree().row_at(storyboard.path(), row.depth).ok();
    let cells = Layout::horizontal(cell_constraints(source_row, row)).split(inner);

    for (slot, (visible, cell)) in row.frames.iter().zip(cells.iter()).enumerate() {
        let transformation = source_row
            .and_then(|frames| frames.get(visible.index))
            .and_then(|frame| frame.payload.transformation.as_ref())
            .map_or("static", Transformation::name);
        let selected = row.depth == app.row && slot == app.slot;
        let expanded = row.zoomed_child == Some(visible.index);
        frame.render_widget(frame_cell(visible, transformation, selected, expanded), *cell);
    }
}

/// Cell widths proportional to each visible frame's duration. Every cell
/// keeps a minimum share so instants stay visible.
fn cell_constraints(source_row: Option<&[Frame]>, row: &RowView) -> Vec<Constraint> {
    let end = row.start + row.frames.len();
    let widths = source_row
        .and_then(|frames| frames.get(row.start..end))
        .map(time_axis::relative_widths)
        .unwrap_or_default();
    if widths.len() != row.frames.len() {
        return row.frames.iter().map(|_| Constraint::Fill(1)).collect();
    }
    widths
        .iter()
        .map(|share| Constraint::Fill((share * 100.0).round().max(10.0) as u16))
        .collect()
}

fn frame_cell(
    visible: &VisibleFrame,
    transformation: &str,
    selected: bool,
    expanded: bool,
) -> Paragraph<'static> {
    let marker = if visible.children_unloaded {
        "+"
    } else if visible.childless {
        "·"
    } else {
        "▾"
    };
    let mut style = Style::default().fg(if expanded { Color::Yellow } else { Color::White });
    if selected {
        style = style.bg(Color::Blue).add_modifier(Modifier::BOLD);
    }
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(format!("{marker} #{} ", visible.id), style),
            Span::styled(transformation.to_string(), style.fg(Color::Green)),
        ]),
        Line::from(Span::styled(
            format!(
                "  {:.0}-{:.0}",
                visible.time_range.start, visible.time_range.end
            ),
            style.fg(Color::Gray),
        )),
    ])
    .style(style)
}

/// Time scrubber for the whole selected row.
fn draw_axis(frame: &mut TermFrame, area: Rect, storyboard: &Storyboard, row: &RowView) {
    let Ok(frames) = storyboard.tree().row_at(storyboard.path(), row.depth) else {
        return;
    };
    let Some(span) = time_axis::row_span(frames) else {
        return;
    };
    let width = usize::from(area.width);
    let mut line = vec![' '; width];
    for tick in time_axis::ticks(span, (width / 10).max(1)) {
        let col = (tick.position * width.saturating_sub(1) as f64) as usize;
        for (offset, ch) in std::iter::once('|').chain(tick.label.chars()).enumerate() {
            if let Some(cell) = line.get_mut(col + offset) {
                *cell = ch;
            }
        }
    }
    frame.render_widget(
        Paragraph::new(line.into_iter().collect::<String>())
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
