//! Wizard screens
//!
//! - text entry (hostname, username, passwords, manual timezone, SSH port)
//! - single-choice lists (timezone, partition type, yes/no questions)
//! - software selection, which marks already-selected entries
//! - the confirmation summary
//!
//! Passwords are masked and never appear on the summary.

use crate::app::App;
use crate::theme::{Colors, Styles};
use crate::wizard::{ChoiceList, ConfigurationWizard, TextField, WizardState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

// ============================================================================
// Text entry
// ============================================================================

pub fn render_text_field(f: &mut Frame, area: Rect, field: &TextField) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(centered_width(area, 60));

    let content = if field.value().is_empty() {
        Line::from(Span::styled(field.placeholder(), Styles::text_muted()))
    } else {
        Line::from(vec![
            Span::styled(field.display_value(), Styles::text()),
            Span::styled("█", Style::default().fg(Colors::PRIMARY)),
        ])
    };
    let input = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Styles::border_active()),
    );
    f.render_widget(input, chunks[0]);
}

// ============================================================================
// Choice lists
// ============================================================================

pub fn render_choice_list(f: &mut Frame, area: Rect, wizard: &ConfigurationWizard, list: &ChoiceList) {
    let software = wizard.state() == WizardState::AskSoftware;
    let items: Vec<ListItem> = list
        .items()
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let text = if software {
                let mark = if wizard.is_selected(index) { "[x]" } else { "[ ]" };
                let packages = wizard
                    .catalog()
                    .get(index)
                    .map(|e| e.identifier())
                    .unwrap_or_default();
                format!("{} {}  ({})", mark, label, packages)
            } else {
                label.clone()
            };
            ListItem::new(Line::from(text))
        })
        .collect();

    let title = if software {
        format!(" {} selected ", wizard.selected_software().len())
    } else {
        String::new()
    };
    let widget = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border_active())
                .title(title),
        )
        .style(Styles::unselected())
        .highlight_style(Styles::selected())
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(list.highlighted()));
    f.render_stateful_widget(widget, centered_width(area, 70), &mut state);
}

// ============================================================================
// Confirmation
// ============================================================================

pub fn render_confirm(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(5)])
        .split(centered_width(area, 80));

    let summary: Vec<Line> = match app.wizard().preview() {
        Some(config) => config
            .summary_lines()
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Styles::text())))
            .collect(),
        None => vec![Line::from(Span::styled("No configuration collected", Styles::error()))],
    };
    let summary = Paragraph::new(summary)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border_active())
                .title(" Configuration "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(summary, chunks[0]);

    let mut warnings = vec![Line::from(vec![
        Span::styled(
            "  WARNING: ",
            Style::default().fg(Colors::ERROR).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{} will be COMPLETELY ERASED!", app.target().disk.display()),
            Styles::error(),
        ),
    ])];
    if let Some(warning) = app.boot_warning() {
        warnings.push(Line::from(Span::styled(format!("  {}", warning), Styles::warning())));
    }
    if app.dry_run() {
        warnings.push(Line::from(Span::styled(
            "  Dry run: commands are logged, not executed",
            Styles::success(),
        )));
    }
    f.render_widget(Paragraph::new(warnings).wrap(Wrap { trim: false }), chunks[1]);
}

/// Horizontally centered sub-area at most `percent` of the width
pub(crate) fn centered_width(area: Rect, percent: u16) -> Rect {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent) / 2),
            Constraint::Percentage(percent),
            Constraint::Percentage((100 - percent) / 2),
        ])
        .split(area)[1]
}
