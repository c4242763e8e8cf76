//! Centralized theme and styling for the TUI
//!
//! All colors and pre-built styles live here; UI code never constructs a
//! color inline.

use crate::report::StepOutcome;
use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

pub struct Colors;

impl Colors {
    /// Primary accent - borders, titles, header art
    pub const PRIMARY: Color = Color::Cyan;

    /// Secondary accent - instructions, emphasis
    pub const SECONDARY: Color = Color::Yellow;

    pub const FG_PRIMARY: Color = Color::White;
    pub const FG_SECONDARY: Color = Color::Gray;
    pub const FG_MUTED: Color = Color::DarkGray;

    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    /// Highlighted list row (black on yellow)
    pub const SELECTED_BG: Color = Color::Yellow;
    pub const SELECTED_FG: Color = Color::Black;

    pub const PROGRESS: Color = Color::Green;
    pub const BG_GAUGE: Color = Color::Rgb(40, 40, 50);

    // Installation progress
    pub const STEP_ACTIVE: Color = Color::Yellow;
    pub const STEP_COMPLETE: Color = Color::Green;
    pub const STEP_SKIPPED: Color = Color::Blue;
    pub const STEP_PENDING: Color = Color::Gray;
    pub const STEP_FAILED: Color = Color::Red;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

pub struct Styles;

impl Styles {
    pub fn text() -> Style {
        Style::default().fg(Colors::FG_PRIMARY)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Colors::FG_MUTED)
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(Colors::FG_SECONDARY)
    }

    /// Main title style (cyan, bold)
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_active() -> Style {
        Style::default().fg(Colors::PRIMARY)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Colors::SELECTED_FG)
            .bg(Colors::SELECTED_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn unselected() -> Style {
        Style::default().fg(Colors::FG_SECONDARY)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::SUCCESS)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::WARNING)
    }

    pub fn error() -> Style {
        Style::default().fg(Colors::ERROR)
    }

    pub fn instructions() -> Style {
        Style::default().fg(Colors::SECONDARY)
    }

    pub fn progress() -> Style {
        Style::default().fg(Colors::PROGRESS).bg(Colors::BG_GAUGE)
    }
}

// =============================================================================
// SEMANTIC LOOKUPS
// =============================================================================

pub struct Theme;

impl Theme {
    /// Style for a step row. `None` means the step has not finished.
    pub fn step_style(outcome: Option<&StepOutcome>, active: bool) -> Style {
        match outcome {
            Some(StepOutcome::Succeeded) => Style::default().fg(Colors::STEP_COMPLETE),
            Some(StepOutcome::Skipped { .. }) => Style::default().fg(Colors::STEP_SKIPPED),
            Some(StepOutcome::Failed { .. }) | Some(StepOutcome::TimedOut { .. }) => Style::default()
                .fg(Colors::STEP_FAILED)
                .add_modifier(Modifier::BOLD),
            None if active => Style::default()
                .fg(Colors::STEP_ACTIVE)
                .add_modifier(Modifier::BOLD),
            None => Style::default().fg(Colors::STEP_PENDING),
        }
    }

    /// Leading marker for a step row
    pub fn step_icon(outcome: Option<&StepOutcome>, active: bool) -> &'static str {
        match outcome {
            Some(StepOutcome::Succeeded) => "✓",
            Some(StepOutcome::Skipped { .. }) => "↷",
            Some(StepOutcome::Failed { .. }) => "✗",
            Some(StepOutcome::TimedOut { .. }) => "⧗",
            None if active => "▶",
            None => "·",
        }
    }
}
