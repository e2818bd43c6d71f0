use chrono::Utc;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget, Wrap};

use crate::api::format_age;
use crate::app::{App, DetailsLoad, DetailsPanel, InputMode};
use crate::context::Palette;
use crate::logs::LogViewer;
use crate::model::ConnectionState;
use crate::session::{Connector, SessionController};
use crate::surface::TerminalSurface;

const KEY: Color = Color::Rgb(103, 232, 249);
const STRING: Color = Color::Rgb(125, 211, 252);
const NUMBER: Color = Color::Rgb(251, 146, 60);
const SCALAR: Color = Color::Rgb(147, 197, 253);

pub fn render<C: Connector + Clone>(frame: &mut Frame, app: &App<C>) {
    let palette = app.ctx().palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    if let Some(exec) = app.exec() {
        render_exec(frame, app, exec, palette);
    } else if let Some(details) = app.details() {
        render_details(frame, app, details, palette);
    } else {
        render_footer(frame, split_main(frame.area())[2], app, palette);
    }

    if let Some(viewer) = app.logs() {
        render_log_dialog(frame, viewer, palette);
    }

    if app.ctx().show_help {
        render_help_modal(frame, app, palette);
    }
}

fn split_main(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(area)
}

/// Area the exec terminal occupies inside a full-screen frame of `area`.
pub fn exec_terminal_area(area: Rect) -> Rect {
    split_main(area)[1]
}

fn log_dialog_area(area: Rect) -> Rect {
    centered_rect(92, 86, area)
}

/// Area the log terminal occupies inside the dialog drawn over `area`.
pub fn log_terminal_area(area: Rect) -> Rect {
    let inner = Block::default()
        .borders(Borders::ALL)
        .inner(log_dialog_area(area));
    let [_, body] = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
    body
}

fn render_exec<C: Connector + Clone>(
    frame: &mut Frame,
    app: &App<C>,
    exec: &SessionController<C>,
    palette: Palette,
) {
    let [header, body, footer] = split_main(frame.area());

    let target_label = exec
        .target()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let state = exec.state();
    let left = Line::from(vec![
        Span::styled(
            " exec ",
            Style::default()
                .fg(Color::Black)
                .bg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(target_label, Style::default().fg(palette.fg)),
    ]);
    render_header_line(frame, header, left, state_indicator(state, palette), palette);

    if let Some(error) = exec.parameter_error() {
        render_error_panel(frame, body, &error.to_string(), palette);
    } else if let Some(surface) = exec.surface().filter(|surface| surface.is_attached()) {
        let view = TerminalView {
            surface,
            palette,
            show_cursor: state == ConnectionState::Connected && surface.input_enabled(),
        };
        frame.render_widget(&view, body);
        if let Some(position) = view.cursor(body) {
            frame.set_cursor_position(position);
        }
    } else {
        frame.render_widget(
            Paragraph::new("Waiting for terminal size…")
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted)),
            body,
        );
    }

    render_footer(frame, footer, app, palette);
}

fn render_error_panel(frame: &mut Frame, area: Rect, message: &str, palette: Palette) {
    let panel = centered_rect(60, 30, area);
    frame.render_widget(Clear, panel);
    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(palette.error)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to leave.",
            Style::default().fg(palette.muted),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Error")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.error))
                    .style(Style::default().bg(palette.panel)),
            ),
        panel,
    );
}

fn render_log_dialog<C: Connector>(frame: &mut Frame, viewer: &LogViewer<C>, palette: Palette) {
    let dialog = log_dialog_area(frame.area());
    frame.render_widget(Clear, dialog);

    let target = viewer.target();
    let title = format!(
        " Logs: {} ({}) ",
        target.pod,
        target.container.as_deref().unwrap_or("default")
    );
    let block = Block::default()
        .title(title)
        .title_bottom(
            Line::from(format!(" {}/{} @ {} ", target.namespace, target.pod, target.context))
                .right_aligned(),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.panel).fg(palette.fg));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let [toolbar, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
    let prefs = viewer.prefs();
    let scroll_x = viewer.surface().map(TerminalSurface::scroll_x).unwrap_or(0);
    let mut spans = vec![
        toggle_span("t", "Timestamps", prefs.show_timestamps, palette),
        Span::raw("  "),
        toggle_span("w", "Wrap", prefs.wrap_enabled, palette),
    ];
    if !prefs.wrap_enabled && scroll_x > 0 {
        spans.push(Span::styled(
            format!("  col {}", scroll_x + 1),
            Style::default().fg(palette.muted),
        ));
    }
    render_header_line(
        frame,
        toolbar,
        Line::from(spans),
        state_indicator(viewer.state(), palette),
        palette,
    );

    match viewer.surface().filter(|surface| surface.is_attached()) {
        Some(surface) => frame.render_widget(
            &TerminalView {
                surface,
                palette,
                show_cursor: false,
            },
            body,
        ),
        None => {
            let message = match viewer.session().parameter_error() {
                Some(error) => Span::styled(error.to_string(), Style::default().fg(palette.error)),
                None => Span::styled(
                    format!("Connecting to logs for {}…", target.pod),
                    Style::default().fg(palette.warn),
                ),
            };
            frame.render_widget(Paragraph::new(Line::from(message)), body);
        }
    }
}

fn toggle_span(key: &str, label: &str, enabled: bool, palette: Palette) -> Span<'static> {
    let style = if enabled {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.muted)
    };
    let state = if enabled { "on" } else { "off" };
    Span::styled(format!("[{key}] {label}: {state}"), style)
}

fn render_details<C: Connector + Clone>(
    frame: &mut Frame,
    app: &App<C>,
    details: &DetailsPanel,
    palette: Palette,
) {
    let [header, body, footer] = split_main(frame.area());
    let query = &details.query;
    let namespace = if query.namespace.is_empty() {
        "cluster"
    } else {
        query.namespace.as_str()
    };
    let left = Line::from(vec![
        Span::styled(
            format!(" {}: {} ", query.kind, query.name),
            Style::default()
                .fg(Color::Black)
                .bg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {namespace} @ {}", query.context),
            Style::default().fg(palette.muted),
        ),
    ]);
    render_header_line(frame, header, left, Line::from(""), palette);

    let loaded = match &details.load {
        DetailsLoad::Loaded(loaded) => loaded,
        other => {
            let (message, color) = match other {
                DetailsLoad::WaitingForScopes => ("Waiting for resource scopes…".to_string(), palette.muted),
                DetailsLoad::Loading => ("Loading details...".to_string(), palette.muted),
                DetailsLoad::Incomplete => (
                    "Namespace required for namespaced resources.".to_string(),
                    palette.warn,
                ),
                DetailsLoad::Failed(error) => (format!("Error: {error}"), palette.error),
                DetailsLoad::Loaded(_) => (String::new(), palette.fg),
            };
            frame.render_widget(
                Paragraph::new(message)
                    .style(Style::default().fg(color))
                    .wrap(Wrap { trim: false })
                    .block(panel_block("Details", palette)),
                body,
            );
            render_footer(frame, footer, app, palette);
            return;
        }
    };

    let events_height = if loaded.events.is_empty() {
        3
    } else {
        (loaded.events.len() as u16 + 3).min(body.height / 2).max(4)
    };
    let [events_area, manifest_area] = Layout::vertical([
        Constraint::Length(events_height),
        Constraint::Min(3),
    ])
    .areas(body);

    if loaded.events.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No events found.",
                Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::ITALIC),
            ))
            .block(panel_block("Recent Events", palette)),
            events_area,
        );
    } else {
        let now = Utc::now();
        let rows = loaded.events.iter().map(|event| {
            let type_style = if event.is_warning() {
                Style::default().fg(palette.error)
            } else {
                Style::default().fg(palette.muted)
            };
            let age = match format_age(&event.last_seen, now) {
                age if age == "-" && !event.age.is_empty() => event.age.clone(),
                age => age,
            };
            Row::new(vec![
                Cell::from(event.event_type.clone()).style(type_style),
                Cell::from(event.reason.clone()).style(Style::default().fg(palette.fg)),
                Cell::from(age).style(Style::default().fg(palette.muted)),
                Cell::from(format!("{} ({})", event.message, event.count))
                    .style(Style::default().fg(palette.fg)),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(9),
                Constraint::Length(20),
                Constraint::Length(6),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec!["Type", "Reason", "Age", "Message"])
                .style(Style::default().fg(palette.muted).add_modifier(Modifier::BOLD)),
        )
        .block(panel_block("Recent Events", palette));
        frame.render_widget(table, events_area);
    }

    frame.render_widget(
        Paragraph::new(highlight_yaml_text(&loaded.manifest, palette))
            .scroll((details.scroll, 0))
            .block(panel_block("YAML Manifest", palette)),
        manifest_area,
    );

    render_footer(frame, footer, app, palette);
}

fn panel_block(title: &str, palette: Palette) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .style(Style::default().bg(palette.panel))
}

fn render_header_line(
    frame: &mut Frame,
    area: Rect,
    left: Line<'static>,
    right: Line<'static>,
    palette: Palette,
) {
    let right_width = right.width() as u16;
    if right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left).style(Style::default().bg(palette.bg)),
            area,
        );
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left).style(Style::default().bg(palette.bg)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right).style(Style::default().bg(palette.bg)),
        chunks[1],
    );
}

fn state_indicator(state: ConnectionState, palette: Palette) -> Line<'static> {
    let color = match state {
        ConnectionState::Connected => palette.accent,
        ConnectionState::Connecting => palette.warn,
        ConnectionState::Error => palette.error,
        ConnectionState::Idle | ConnectionState::Disconnected => palette.muted,
    };
    Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(format!("{state} "), Style::default().fg(color)),
    ])
}

fn render_footer<C: Connector + Clone>(
    frame: &mut Frame,
    area: Rect,
    app: &App<C>,
    palette: Palette,
) {
    let hints = match app.mode() {
        InputMode::Terminal => "Ctrl+] close session",
        InputMode::LogViewer => "t timestamps  w wrap  ←/→ scroll  PgUp/PgDn  Esc close",
        InputMode::Details => "l logs  s exec  r refresh  j/k scroll  F2 theme  ? help  q quit",
    };
    let status_color = if looks_like_failure(app.status()) {
        palette.error
    } else {
        palette.fg
    };
    let hint_width = hints.chars().count() as u16 + 1;
    let status_width = area.width.saturating_sub(hint_width).max(1) as usize;
    let chunks = Layout::horizontal([Constraint::Min(1), Constraint::Length(hint_width)]).split(area);
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {}", compact_text(app.status(), status_width.saturating_sub(1))),
            Style::default().fg(status_color),
        ))
        .style(Style::default().bg(palette.panel)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(palette.muted)))
            .alignment(Alignment::Right)
            .style(Style::default().bg(palette.panel)),
        chunks[1],
    );
}

fn looks_like_failure(status: &str) -> bool {
    let status = status.to_ascii_lowercase();
    ["failed", "error", "missing", "refused", "timed out"]
        .iter()
        .any(|needle| status.contains(needle))
}

fn render_help_modal<C: Connector + Clone>(frame: &mut Frame, app: &App<C>, palette: Palette) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "kubeterm help  mode:{}  theme:{:?}",
            help_mode_label(app.mode()),
            app.ctx().theme
        )),
        Line::from(""),
    ];
    for line in [
        "Details: l logs (pods)  s exec (pods)  r refresh  j/k PgUp/PgDn scroll  g top",
        "Logs: t toggle timestamps (reconnects)  w toggle wrap  ←/→ horizontal scroll",
        "      ↑/↓ PgUp/PgDn scrollback  End follow  Esc/q close",
        "Exec: every key goes to the remote shell  Ctrl+] closes the session",
        "Global: F2 theme  ? help  q quit",
    ] {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().bg(palette.panel)),
        )
        .style(Style::default().fg(palette.fg));

    frame.render_widget(modal, area);
}

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Terminal => "exec",
        InputMode::LogViewer => "logs",
        InputMode::Details => "details",
    }
}

/// Draws the visible part of a terminal surface cell by cell, honouring the
/// horizontal scroll offset used by no-wrap mode.
struct TerminalView<'a> {
    surface: &'a TerminalSurface,
    palette: Palette,
    show_cursor: bool,
}

impl TerminalView<'_> {
    fn cursor(&self, area: Rect) -> Option<Position> {
        if !self.show_cursor {
            return None;
        }
        let screen = self.surface.screen()?;
        if screen.hide_cursor() || screen.scrollback() > 0 {
            return None;
        }
        let (row, col) = screen.cursor_position();
        let col = col.checked_sub(self.surface.scroll_x())?;
        (row < area.height && col < area.width).then(|| Position::new(area.x + col, area.y + row))
    }

    fn cell_style(&self, cell: &vt100::Cell) -> Style {
        let mut fg = convert_color(cell.fgcolor(), self.palette.fg);
        let mut bg = convert_color(cell.bgcolor(), self.palette.bg);
        if cell.inverse() {
            std::mem::swap(&mut fg, &mut bg);
        }
        let mut style = Style::default().fg(fg).bg(bg);
        if cell.bold() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if cell.italic() {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if cell.underline() {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

impl Widget for &TerminalView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(screen) = self.surface.screen() else {
            return;
        };
        let (rows, cols) = screen.size();
        let offset = self.surface.scroll_x();
        let blank = Style::default().bg(self.palette.bg).fg(self.palette.fg);

        for y in 0..area.height {
            for x in 0..area.width {
                let Some(target) = buf.cell_mut((area.x + x, area.y + y)) else {
                    continue;
                };
                let col = offset.saturating_add(x);
                let cell = (y < rows && col < cols)
                    .then(|| screen.cell(y, col))
                    .flatten();
                match cell {
                    Some(cell) if cell.is_wide_continuation() => {
                        target.set_symbol("");
                    }
                    Some(cell) => {
                        let contents = cell.contents();
                        if contents.is_empty() {
                            target.set_char(' ');
                        } else {
                            target.set_symbol(contents);
                        }
                        target.set_style(self.cell_style(cell));
                    }
                    None => {
                        target.set_char(' ');
                        target.set_style(blank);
                    }
                }
            }
        }
    }
}

fn convert_color(color: vt100::Color, default: Color) -> Color {
    match color {
        vt100::Color::Default => default,
        vt100::Color::Idx(idx) => Color::Indexed(idx),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

fn highlight_yaml_text(input: &str, palette: Palette) -> Text<'static> {
    let lines = input
        .lines()
        .map(|line| highlight_yaml_line(line, palette))
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str, palette: Palette) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if let Some(comment) = trimmed.strip_prefix('#') {
        spans.push(Span::styled(
            format!("#{comment}"),
            Style::default().fg(palette.muted),
        ));
        return Line::from(spans);
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(palette.accent)));
        spans.extend(highlight_yaml_content(rest, palette));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed, palette));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str, palette: Palette) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(palette.fg),
        )];
    };

    let mut spans = vec![
        Span::styled(key.to_string(), Style::default().fg(KEY)),
        Span::styled(":", Style::default().fg(palette.muted)),
    ];
    if value.trim().is_empty() {
        return spans;
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim(), palette)),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str, palette: Palette) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        STRING
    } else if matches!(value, "true" | "false" | "null" | "~") {
        palette.warn
    } else if value.parse::<f64>().is_ok() {
        NUMBER
    } else if value.starts_with('{') || value.starts_with('[') {
        palette.muted
    } else {
        SCALAR
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        TerminalView, compact_text, exec_terminal_area, highlight_yaml_line, log_terminal_area,
        split_yaml_key_value,
    };
    use crate::context::Theme;
    use crate::surface::{ContainerSize, FitMode, SurfaceOptions, TerminalSurface};
    use ratatui::buffer::Buffer;
    use ratatui::layout::{Position, Rect};
    use ratatui::style::Color;
    use ratatui::widgets::Widget;

    fn surface(width: u32, height: u32) -> TerminalSurface {
        let mut surface = TerminalSurface::new(SurfaceOptions::default());
        surface.initialize(Some(ContainerSize::new(width, height)));
        surface
    }

    #[test]
    fn exec_area_leaves_room_for_header_and_footer() {
        let area = exec_terminal_area(Rect::new(0, 0, 120, 40));
        assert_eq!(area, Rect::new(0, 1, 120, 38));
    }

    #[test]
    fn log_area_fits_inside_dialog() {
        let screen = Rect::new(0, 0, 100, 50);
        let area = log_terminal_area(screen);
        assert!(area.width > 0 && area.width < 100);
        assert!(area.height > 0 && area.height < 50);
    }

    #[test]
    fn terminal_view_copies_cells_and_colors() {
        let mut surface = surface(20, 3);
        surface.write_text("\x1b[31mhi\x1b[0m there");
        let view = TerminalView {
            surface: &surface,
            palette: Theme::Dark.palette(),
            show_cursor: true,
        };
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        (&view).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), "h");
        assert_eq!(buf[(0, 0)].fg, Color::Indexed(1));
        assert_eq!(buf[(3, 0)].symbol(), "t");
        assert_eq!(view.cursor(area), Some(Position::new(8, 0)));
    }

    #[test]
    fn terminal_view_honours_horizontal_scroll() {
        let mut surface = surface(10, 2);
        surface.fit(FitMode::NoWrap { columns: 40 });
        surface.write_text("0123456789abcdefghij");
        surface.scroll_right(10, 10);
        let view = TerminalView {
            surface: &surface,
            palette: Theme::Dark.palette(),
            show_cursor: false,
        };
        let area = Rect::new(0, 0, 10, 2);
        let mut buf = Buffer::empty(area);
        (&view).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "a");
        assert_eq!(view.cursor(area), None);
    }

    #[test]
    fn terminal_view_keeps_combining_marks() {
        let mut surface = surface(10, 2);
        surface.write_text("e\u{301}x");
        let view = TerminalView {
            surface: &surface,
            palette: Theme::Dark.palette(),
            show_cursor: false,
        };
        let area = Rect::new(0, 0, 10, 2);
        let mut buf = Buffer::empty(area);
        (&view).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "e\u{301}");
        assert_eq!(buf[(1, 0)].symbol(), "x");
        assert_eq!(buf[(2, 0)].symbol(), " ");
    }

    #[test]
    fn yaml_key_split_requires_plain_key() {
        assert_eq!(split_yaml_key_value("name: web"), Some(("name", " web")));
        assert_eq!(split_yaml_key_value("not a key: x"), None);
        let line = highlight_yaml_line("  replicas: 3", Theme::Dark.palette());
        assert_eq!(line.spans.len(), 5);
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("abcdef", 4), "abc…");
        assert_eq!(compact_text("abc", 4), "abc");
    }
}
