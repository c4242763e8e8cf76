//! UI rendering module
//!
//! Stateless rendering of the `App`. Layout, top to bottom:
//! header art (dropped on short terminals), title bar, body, status line,
//! key hints.

mod header;
mod installer;
mod screens;

use crate::app::App;
use crate::input::instructions;
use crate::wizard::{Widget, WizardState};
use header::{render_instructions, render_status, HeaderRenderer, HEADER_HEIGHT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

/// Below this height the header art is skipped
const MIN_HEIGHT_FOR_HEADER: u16 = 30;

pub struct UiRenderer {
    header: HeaderRenderer,
}

impl Default for UiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl UiRenderer {
    pub fn new() -> Self {
        Self {
            header: HeaderRenderer::new(),
        }
    }

    pub fn render(&self, f: &mut Frame, app: &App) {
        let area = f.area();
        let header_height = if area.height >= MIN_HEIGHT_FOR_HEADER { HEADER_HEIGHT } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(header_height),
                Constraint::Length(3), // Title
                Constraint::Min(5),    // Body
                Constraint::Length(1), // Status
                Constraint::Length(1), // Instructions
            ])
            .split(area);

        let wizard = app.wizard();
        let state = wizard.state();

        self.header.render_header(f, chunks[0]);
        let step = state.step_number().map(|n| (n, WizardState::TOTAL_STEPS));
        self.header.render_title(f, chunks[1], state.title(), step);
        self.render_body(f, chunks[2], app);

        let info = format!("{} | Target: {}", app.host(), app.target().disk.display());
        render_status(f, chunks[3], wizard.error(), &info);
        render_instructions(f, chunks[4], instructions(state));
    }

    fn render_body(&self, f: &mut Frame, area: Rect, app: &App) {
        let wizard = app.wizard();
        match (wizard.state(), wizard.widget()) {
            (WizardState::Running, _) => {
                if let Some(progress) = app.progress() {
                    installer::render_installation_ui_in_area(f, area, progress);
                }
            }
            (WizardState::Done, _) => {
                if let Some(progress) = app.progress() {
                    installer::render_completion_ui_in_area(f, area, progress);
                }
            }
            (WizardState::Confirm, _) => screens::render_confirm(f, area, app),
            (_, Widget::Text(field)) => screens::render_text_field(f, area, field),
            (_, Widget::Choice(list)) => screens::render_choice_list(f, area, wizard, list),
            (_, Widget::None) => {}
        }
    }
}
