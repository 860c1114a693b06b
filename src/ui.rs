use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode};
use crate::delta::DeltaMarker;
use crate::model::ResourceKind;
use crate::view::PageKind;
use crate::view::master_detail::ViewScope;
use crate::view::actions::Hint;
use crate::view::table::TableCell;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const INCREASE: Color = Color::Rgb(74, 222, 128);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);

const PF_HEADER: &str = "PF";

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    match app.view().front_page() {
        PageKind::Master => render_table(frame, root[1], app),
        PageKind::Details => render_details(frame, root[1], app),
    }
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(
        &mut spans,
        format!(" krill  {} ", app.context()),
        Color::White,
        PL_A,
        PL_B,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", display_cluster_endpoint(app.cluster())),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(
            " {} @ {} [{}] ",
            app.kind().title(),
            scope_label(app),
            app.view().front_page().name()
        ),
        Color::White,
        PL_C,
        BG,
    );
    spans.push(Span::styled(
        format!(
            " history:{} ({}) ",
            app.history_depth(),
            app.history_top().unwrap_or_default()
        ),
        Style::default().fg(MUTED).bg(BG),
    ));
    if !app.port_forwards().is_empty() {
        spans.push(Span::styled(
            format!(" pf:{} ", app.port_forwards().len()),
            Style::default().fg(ACCENT).bg(BG),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG).fg(Color::White)),
        area,
    );
}

fn scope_label(app: &App) -> String {
    match app.view().scope() {
        ViewScope::Namespaced(scope) => scope.label(),
        ViewScope::NotNamespaced => "cluster".to_string(),
    }
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let master = app.view().master_page();
    let include_pf_column = matches!(app.kind(), ResourceKind::Pods | ResourceKind::Services);
    let mut headers = master.headers().to_vec();
    if include_pf_column {
        headers.push(PF_HEADER.to_string());
    }
    let visible_rows = master.visible_rows();

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.clone()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = visible_rows.iter().map(|row| {
        let mut cells = row.cells.iter().map(table_cell).collect::<Vec<_>>();
        if include_pf_column {
            cells.push(
                Cell::from(app.port_forward_marker(row)).style(Style::default().fg(ACCENT)),
            );
        }
        Row::new(cells)
    });

    let mut title = format!("{} ({})", master.title(), visible_rows.len());
    if let Some(workload) = master.workload() {
        title.push_str(&format!(" <{workload}>"));
    }
    if !master.filter().is_empty() {
        title.push_str(&format!(" /{}", master.filter()));
    }
    if let Some(refreshed) = master.last_refreshed() {
        title.push_str(&format!(" {}", refreshed.format("%H:%M:%S")));
    }
    let border = match master.error() {
        Some(error) => {
            title.push_str(&format!(
                " [error: {}]",
                compact_text(error.lines().next().unwrap_or_default(), 60)
            ));
            ERROR
        }
        None => ACCENT,
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_constraints(&headers))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(master.selected().checked_sub(1));
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_cell(cell: &TableCell) -> Cell<'static> {
    let text = Style::default().fg(Color::White);
    match delta_color(cell.delta) {
        Some(color) => Cell::from(Line::from(vec![
            Span::styled(cell.text.clone(), text.fg(color)),
            Span::styled(
                cell.delta.glyph(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ])),
        None => Cell::from(cell.text.clone()).style(text),
    }
}

fn delta_color(marker: DeltaMarker) -> Option<Color> {
    match marker {
        DeltaMarker::None => None,
        DeltaMarker::Increase => Some(INCREASE),
        DeltaMarker::Decrease => Some(ERROR),
        DeltaMarker::Indeterminate => Some(WARN),
    }
}

fn render_details(frame: &mut Frame, area: Rect, app: &App) {
    let details = app.view().details_page();
    let block = Block::default()
        .title(format!(
            "{} [{}/{}]",
            details.title(),
            usize::from(details.scroll()) + 1,
            details.line_count().max(1)
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let paragraph = Paragraph::new(highlight_yaml_text(details.text()))
        .block(block)
        .style(Style::default().fg(Color::White))
        .scroll((details.scroll(), 0));

    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    match app.mode() {
        InputMode::Command | InputMode::Filter => {
            let prompt = if app.mode() == InputMode::Command {
                ":"
            } else {
                "/"
            };
            push_powerline_segment(&mut spans, " input ", Color::Black, WARN, BG);
            spans.push(Span::styled(
                format!(" {prompt}{}█", app.input()),
                Style::default().fg(Color::White).bg(BG),
            ));
        }
        InputMode::Normal => {
            let (status, status_fg, status_bg) = match app.pending_confirmation_prompt() {
                Some(prompt) => (prompt.to_string(), Color::Black, WARN),
                None => (app.status().to_string(), Color::White, PL_B),
            };
            let width_hint = area.width.saturating_sub(24).min(120) as usize;
            push_powerline_segment(
                &mut spans,
                format!(" {} ", compact_text(&status, width_hint.max(24))),
                status_fg,
                status_bg,
                BG,
            );
            if app.pending_confirmation_prompt().is_none() {
                spans.extend(hint_spans(&app.view().hints()));
            }
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn hint_spans(hints: &[Hint]) -> Vec<Span<'static>> {
    hints
        .iter()
        .flat_map(|hint| {
            [
                Span::styled(format!(" <{}>", hint.key), Style::default().fg(ACCENT)),
                Span::styled(
                    format!(" {}", hint.description),
                    Style::default().fg(MUTED),
                ),
            ]
        })
        .collect()
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "krill help  mode:{}  scope:{}  view:{}",
            help_mode_label(app.mode()),
            app.namespace_scope(),
            app.view().title()
        )),
        Line::from(""),
    ];
    let actions = app.view().actions();
    if !actions.is_empty() {
        lines.push(Line::styled(
            format!("{} ({} keys)", app.view().title(), actions.len()),
            Style::default().fg(ACCENT),
        ));
        for hint in actions.all_hints() {
            lines.push(Line::from(format!("  {:<10} {}", hint.key, hint.description)));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::styled("Global", Style::default().fg(ACCENT)));
    for (key, description) in GLOBAL_HELP {
        lines.push(Line::from(format!("  {key:<10} {description}")));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

const GLOBAL_HELP: [(&str, &str); 9] = [
    ("j/k", "Move selection"),
    ("g/G", "First / last row"),
    ("pgup/pgdn", "Page up / down"),
    (":", "Command (:pods kube-system, :ns, :q)"),
    ("/", "Filter rows"),
    ("r", "Refresh now"),
    ("esc", "Back / clear filter"),
    ("p", "Previous view"),
    ("q", "Quit"),
];

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "normal",
        InputMode::Command => "command",
        InputMode::Filter => "filter",
    }
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    input.lines().map(highlight_yaml_line).collect::<Vec<_>>().into()
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, trimmed) = line.split_at(indent_len);

    let mut spans = vec![Span::raw(indent.to_string())];
    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
    } else if !trimmed.is_empty() {
        spans.extend(highlight_yaml_content(trimmed));
    }
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(
            key.to_string(),
            Style::default().fg(Color::Rgb(103, 232, 249)),
        ),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    let value = value.trim();
    if !value.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            value.to_string(),
            Style::default().fg(yaml_value_color(value)),
        ));
    }
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

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else {
        Color::Rgb(147, 197, 253)
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
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

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
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

/// Narrow fixed widths for short numeric columns; the rest share the
/// remaining space.
fn column_constraints(headers: &[String]) -> Vec<Constraint> {
    if headers.is_empty() {
        return vec![Constraint::Percentage(100)];
    }

    headers
        .iter()
        .map(|header| match header.as_str() {
            "READY" | "RESTARTS" | "CPU" | "MEM" | "AGE" | "DATA" | "COUNT" | "UP-TO-DATE"
            | "AVAILABLE" | "CURRENT" | PF_HEADER => Constraint::Length(11),
            "MESSAGE" => Constraint::Fill(3),
            _ => Constraint::Fill(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{column_constraints, compact_text, display_cluster_endpoint, split_yaml_key_value};
    use ratatui::layout::Constraint;

    #[test]
    fn compact_text_adds_ellipsis() {
        assert_eq!(compact_text("short", 10), "short");
        assert_eq!(compact_text("abcdefgh", 5), "abcd…");
        assert_eq!(compact_text("abc", 1), "…");
    }

    #[test]
    fn cluster_endpoint_drops_scheme() {
        assert_eq!(
            display_cluster_endpoint("https://10.0.0.1:6443/"),
            "10.0.0.1:6443"
        );
        assert_eq!(display_cluster_endpoint("local"), "local");
    }

    #[test]
    fn yaml_keys_split_once() {
        assert_eq!(
            split_yaml_key_value("image: nginx:1.27"),
            Some(("image", " nginx:1.27"))
        );
        assert_eq!(split_yaml_key_value("plain text: here"), None);
    }

    #[test]
    fn numeric_columns_are_narrow() {
        let headers = ["NAME", "READY", "MESSAGE"].map(str::to_string);
        assert_eq!(
            column_constraints(&headers),
            vec![
                Constraint::Fill(1),
                Constraint::Length(11),
                Constraint::Fill(3)
            ]
        );
        assert_eq!(column_constraints(&[]), vec![Constraint::Percentage(100)]);
    }
}
