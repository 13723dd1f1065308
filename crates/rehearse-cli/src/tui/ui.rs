//! TUI rendering using ratatui.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};

use rehearse_core::orchestrator::CommandRecord;
use rehearse_core::report::rate_marker;
use rehearse_core::runner::CompletionKind;

use super::app::{App, View};

/// Render the current view.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // session header
            Constraint::Min(3),    // main content
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    render_session_header(f, app, chunks[0]);

    match app.current_view {
        View::FeatureList => render_feature_list(f, app, chunks[1]),
        View::FeatureDetail(feature) => render_feature_detail(f, app, feature, chunks[1]),
        View::RecordDetail(record) => render_record_detail(f, app, record, chunks[1]),
        View::Failures => render_failures(f, app, chunks[1]),
        View::Help => render_help(f, chunks[1]),
    }

    render_status_bar(f, app, chunks[2]);
}

fn render_session_header(f: &mut Frame, app: &App, area: Rect) {
    let report = &app.report;
    let s = &report.summary;
    let status = if report.interrupted {
        Span::styled("interrupted", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("completed", Style::default().fg(Color::Green))
    };

    let line = Line::from(vec![
        Span::raw(format!(" {} | ", report.tool)),
        status,
        Span::raw(format!(
            " | {}/{} passed ({:.1}%) | {} planned | {:.1}s",
            s.passed,
            s.total,
            s.success_rate,
            s.planned_commands,
            s.total_duration.as_secs_f64()
        )),
        if s.degraded_passes > 0 {
            Span::styled(
                format!(" | {} degraded", s.degraded_passes),
                Style::default().fg(Color::Magenta),
            )
        } else {
            Span::raw("")
        },
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Session {} ", report.session_id)),
    );
    f.render_widget(header, area);
}

fn render_feature_list(f: &mut Frame, app: &App, area: Rect) {
    let header_cells = ["", "Feature", "Passed", "Failed", "Total", "Rate", "Avg"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1);

    let rows = app.features().iter().enumerate().map(|(i, feature)| {
        let style = if i == app.selected_feature {
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let marker = if feature.total_commands == 0 {
            Span::styled("-", Style::default().fg(Color::DarkGray))
        } else {
            rate_colored(feature.success_rate)
        };

        Row::new(vec![
            Cell::from(marker),
            Cell::from(feature.name.clone()),
            Cell::from(feature.passed.to_string()),
            Cell::from(feature.failed.to_string()),
            Cell::from(feature.total_commands.to_string()),
            Cell::from(format!("{:.1}%", feature.success_rate)),
            Cell::from(format!("{:.2}s", feature.avg_duration.as_secs_f64())),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Percentage(35),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Features "));

    f.render_widget(table, area);
}

fn render_feature_detail(f: &mut Frame, app: &App, feature: usize, area: Rect) {
    let title = app
        .features()
        .get(feature)
        .map(|s| {
            format!(
                " {} | {}/{} passed | exit 0: {} ",
                s.name, s.passed, s.total_commands, s.successful_commands
            )
        })
        .unwrap_or_else(|| " Unknown feature ".to_string());

    let rows = app
        .records_of(feature)
        .enumerate()
        .map(|(i, record)| record_row(record, i == app.selected_record));

    let table = Table::new(rows, record_widths())
        .header(record_header())
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
}

fn render_failures(f: &mut Frame, app: &App, area: Rect) {
    let rows = app
        .failures()
        .enumerate()
        .map(|(i, record)| record_row(record, i == app.selected_failure));

    let table = Table::new(rows, record_widths())
        .header(record_header())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Failures ({}) ", app.failure_count())),
        );

    f.render_widget(table, area);
}

fn record_header() -> Row<'static> {
    let cells = ["Verdict", "Command", "Exit", "Outcome", "Duration"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    Row::new(cells).height(1)
}

fn record_widths() -> [Constraint; 5] {
    [
        Constraint::Length(8),
        Constraint::Percentage(60),
        Constraint::Length(6),
        Constraint::Length(18),
        Constraint::Length(10),
    ]
}

fn record_row(record: &CommandRecord, selected: bool) -> Row<'static> {
    let style = if selected {
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(verdict_colored(record)),
        Cell::from(truncate(&record.command, 70)),
        Cell::from(record.result.exit_code.to_string()),
        Cell::from(kind_label(record.result.kind)),
        Cell::from(format!("{}ms", record.result.duration.as_millis())),
    ])
    .style(style)
}

fn render_record_detail(f: &mut Frame, app: &App, index: usize, area: Rect) {
    let Some(record) = app.record(index) else {
        let missing = Paragraph::new("Record not found")
            .block(Block::default().borders(Borders::ALL).title(" Command "));
        f.render_widget(missing, area);
        return;
    };

    let label = |text: &str| Span::styled(format!("{text}: "), Style::default().fg(Color::Yellow));
    let mut lines = vec![
        Line::from(vec![label("Command"), Span::raw(record.command.clone())]),
        Line::from(vec![
            label("Verdict"),
            verdict_colored(record),
            Span::raw(format!("  ({:?})", record.verdict.basis)),
        ]),
        Line::from(vec![
            label("Phase"),
            Span::raw(format!("{}  Category: {}", record.phase, record.category)),
        ]),
        Line::from(vec![
            label("Exit"),
            Span::raw(format!(
                "{}  {}  {}ms  at {}",
                record.result.exit_code,
                kind_label(record.result.kind),
                record.result.duration.as_millis(),
                record.timestamp.format("%H:%M:%S%.3f")
            )),
        ]),
        Line::from(vec![
            label("Expected"),
            Span::raw(record.verdict.expected_behavior.clone()),
        ]),
        Line::from(""),
        section("Evidence"),
    ];
    lines.extend(
        record
            .verdict
            .evidence
            .iter()
            .map(|e| Line::from(format!("  - {e}"))),
    );
    lines.push(Line::from(""));
    lines.push(section("stdout"));
    lines.extend(output_lines(&record.result.stdout));
    lines.push(Line::from(""));
    lines.push(section("stderr"));
    lines.extend(output_lines(&record.result.stderr));

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Command "));
    f.render_widget(detail, area);
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

fn output_lines(text: &str) -> Vec<Line<'static>> {
    if text.trim().is_empty() {
        return vec![Line::from(Span::styled(
            "  (empty)",
            Style::default().fg(Color::DarkGray),
        ))];
    }
    text.lines().map(|l| Line::from(format!("  {l}"))).collect()
}

fn render_help(f: &mut Frame, area: Rect) {
    let heading = |text: &'static str| {
        Line::from(vec![Span::styled(
            text,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )])
    };
    let text = vec![
        Line::from(""),
        heading("  Navigation"),
        Line::from("    j/Down    Move down (scroll in command view)"),
        Line::from("    k/Up      Move up"),
        Line::from("    Enter     Drill into selected"),
        Line::from("    Esc/q     Back / Quit"),
        Line::from("    Tab       Toggle Features / Failures"),
        Line::from(""),
        heading("  Other"),
        Line::from("    ?         Show this help"),
        Line::from("    Ctrl+C    Quit"),
        Line::from(""),
    ];

    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Help "));
    f.render_widget(help, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let view_name = match app.current_view {
        View::FeatureList => "Features",
        View::FeatureDetail(_) => "Feature Detail",
        View::RecordDetail(_) => "Command",
        View::Failures => "Failures",
        View::Help => "Help",
    };

    let failures = app.failure_count();
    let status_msg = app.status_message.as_deref().unwrap_or("");

    let bar = Line::from(vec![
        Span::styled(
            format!(" {view_name} "),
            Style::default().bg(Color::Blue).fg(Color::White),
        ),
        Span::raw("  "),
        if failures > 0 {
            Span::styled(
                format!("{failures} failed commands"),
                Style::default().fg(Color::Red),
            )
        } else {
            Span::styled("no failures", Style::default().fg(Color::DarkGray))
        },
        Span::raw("  "),
        Span::styled(status_msg, Style::default().fg(Color::Green)),
        Span::raw("  q:back  ?:help  Tab:switch view"),
    ]);

    f.render_widget(Paragraph::new(bar), area);
}

// -- Helpers --

fn verdict_colored(record: &CommandRecord) -> Span<'static> {
    let (text, color) = if record.verdict.is_degraded_pass() {
        ("PASS*", Color::Magenta)
    } else if record.verdict.passed {
        ("PASS", Color::Green)
    } else {
        ("FAIL", Color::Red)
    };
    Span::styled(text, Style::default().fg(color))
}

fn rate_colored(rate: f64) -> Span<'static> {
    let marker = rate_marker(rate);
    let color = match marker {
        "[OK]" => Color::Green,
        "[WARN]" => Color::Yellow,
        _ => Color::Red,
    };
    Span::styled(marker, Style::default().fg(color))
}

fn kind_label(kind: CompletionKind) -> &'static str {
    match kind {
        CompletionKind::Completed => "completed",
        CompletionKind::TimedOut => "timed out",
        CompletionKind::ToolUnavailable => "tool unavailable",
        CompletionKind::LaunchError => "launch error",
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}...", &s[..cut]),
    }
}
