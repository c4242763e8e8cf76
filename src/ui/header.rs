//! Header and common widget rendering
//!
//! ASCII art header, title bar, instruction line and status line.

use crate::theme::{Colors, Styles};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const ART: [&str; 6] = [
    " █████╗ ██████╗  ██████╗██╗  ██╗██████╗ ██████╗  ██████╗ ██╗   ██╗",
    "██╔══██╗██╔══██╗██╔════╝██║  ██║██╔══██╗██╔══██╗██╔═══██╗██║   ██║",
    "███████║██████╔╝██║     ███████║██████╔╝██████╔╝██║   ██║██║   ██║",
    "██╔══██║██╔══██╗██║     ██╔══██║██╔═══╝ ██╔══██╗██║   ██║╚██╗ ██╔╝",
    "██║  ██║██║  ██║╚██████╗██║  ██║██║     ██║  ██║╚██████╔╝ ╚████╔╝ ",
    "╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝╚═╝  ╚═╝╚═╝     ╚═╝  ╚═╝ ╚═════╝   ╚═══╝  ",
];

/// Rows the header needs, including a blank spacer line
pub const HEADER_HEIGHT: u16 = ART.len() as u16 + 1;

pub struct HeaderRenderer {
    header_lines: Vec<Line<'static>>,
}

impl Default for HeaderRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderRenderer {
    pub fn new() -> Self {
        Self {
            header_lines: ART
                .iter()
                .map(|row| Line::from(Span::styled(*row, Style::default().fg(Colors::PRIMARY))))
                .collect(),
        }
    }

    pub fn render_header(&self, f: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let header = Paragraph::new(self.header_lines.clone())
            .block(Block::default().borders(Borders::NONE))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    /// Title bar with an optional "step N of M" suffix
    pub fn render_title(&self, f: &mut Frame, area: Rect, title: &str, step: Option<(usize, usize)>) {
        let text = match step {
            Some((n, total)) => format!("{}  ({}/{})", title, n, total),
            None => title.to_string(),
        };
        let title_widget = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).border_style(Styles::border_active()))
            .alignment(Alignment::Center)
            .style(Styles::title());
        f.render_widget(title_widget, area);
    }
}

pub fn render_instructions(f: &mut Frame, area: Rect, text: &str) {
    let instructions = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Styles::instructions());
    f.render_widget(instructions, area);
}

/// One-line status: validation error if present, otherwise host facts
pub fn render_status(f: &mut Frame, area: Rect, error: Option<&str>, info: &str) {
    let line = match error {
        Some(message) => Line::from(vec![
            Span::styled("✗ ", Styles::error()),
            Span::styled(message.to_string(), Styles::error()),
        ]),
        None => Line::from(Span::styled(info.to_string(), Styles::text_muted())),
    };
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
