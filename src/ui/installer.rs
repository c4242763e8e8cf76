//! Installation progress and final report screens

use crate::app::RunProgress;
use crate::report::{RunReport, RunStatus};
use crate::theme::{Styles, Theme};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Gauge plus the step list, scrolled to the active step
pub fn render_installation_ui_in_area(f: &mut Frame, area: Rect, progress: &RunProgress) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let label = match (progress.active_description(), progress.cancel_requested) {
        (_, true) => "Cancelling after the current step...".to_string(),
        (Some(step), false) => step.to_string(),
        (None, false) => format!("{}/{} steps", progress.finished_count(), progress.steps.len()),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Installation Progress "))
        .gauge_style(Styles::progress())
        .percent(progress.percent().min(100))
        .label(label);
    f.render_widget(gauge, chunks[0]);

    render_step_list(f, chunks[1], progress);
}

fn render_step_list(f: &mut Frame, area: Rect, progress: &RunProgress) {
    let items: Vec<ListItem> = progress
        .steps
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let active = progress.active == Some(index);
            let style = Theme::step_style(row.outcome.as_ref(), active);
            let mut spans = vec![
                Span::styled(format!("{} ", Theme::step_icon(row.outcome.as_ref(), active)), style),
                Span::styled(row.description.clone(), style),
            ];
            if let Some(outcome) = &row.outcome {
                spans.push(Span::styled(format!("  [{}]", outcome), Styles::text_muted()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    // Keep the active (or last finished) step in view
    let focus = progress
        .active
        .or_else(|| progress.finished_count().checked_sub(1));
    let mut state = ListState::default();
    state.select(focus);

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Steps "));
    f.render_stateful_widget(list, area, &mut state);
}

/// Final outcome: status line, failed step with its stderr, warnings
pub fn render_completion_ui_in_area(f: &mut Frame, area: Rect, progress: &RunProgress) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(error) = &progress.start_error {
        lines.push(Line::from(Span::styled("Installation could not start", Styles::error())));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), Styles::text())));
    } else if let Some(report) = &progress.report {
        lines.extend(report_lines(report));
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Result "))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn report_lines(report: &RunReport) -> Vec<Line<'static>> {
    let status_style = match report.status {
        RunStatus::Succeeded => Styles::success(),
        RunStatus::SucceededWithWarnings | RunStatus::Cancelled => Styles::warning(),
        RunStatus::Failed => Styles::error(),
    };
    let mut lines = vec![
        Line::from(Span::styled(report.status.to_string(), status_style)),
        Line::from(Span::styled(
            format!("{} steps recorded", report.records.len()),
            Styles::text_secondary(),
        )),
    ];

    if let Some(failure) = report.failure() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Failed step: ", Styles::error()),
            Span::styled(
                format!("{} ({}) - {}", failure.step_id, failure.description, failure.outcome),
                Styles::text(),
            ),
        ]));
        if let Some(stderr) = failure.outcome.stderr().filter(|s| !s.trim().is_empty()) {
            lines.push(Line::from(Span::styled("stderr:", Styles::text_secondary())));
            for l in stderr.lines() {
                lines.push(Line::from(Span::styled(format!("  {}", l), Styles::text_muted())));
            }
        }
    }

    let warnings = report.warnings();
    if !warnings.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Warnings:", Styles::warning())));
        for w in warnings {
            lines.push(Line::from(Span::styled(format!("  {}", w), Styles::warning())));
        }
    }
    lines
}
