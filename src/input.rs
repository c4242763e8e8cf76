//! Input handling module
//!
//! Decodes crossterm key events into wizard actions. Text fields take every
//! printable character (including space, which is valid in passwords), so
//! the mapping depends on whether the current state edits text.

use crate::wizard::{WizardInput, WizardState};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Application-level action for one key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Wizard(WizardInput),
    /// Stop the running plan before its next step
    CancelRun,
    None,
}

/// Map a key event for the given wizard state.
pub fn map_key(key: KeyEvent, state: WizardState) -> KeyAction {
    // Windows terminals report release events too
    if key.kind == KeyEventKind::Release {
        return KeyAction::None;
    }

    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');

    match state {
        WizardState::Running => {
            if ctrl_c || key.code == KeyCode::Esc {
                KeyAction::CancelRun
            } else {
                KeyAction::None
            }
        }
        WizardState::Done => match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => KeyAction::Wizard(WizardInput::Quit),
            _ if ctrl_c => KeyAction::Wizard(WizardInput::Quit),
            _ => KeyAction::None,
        },
        _ if ctrl_c => KeyAction::Wizard(WizardInput::Quit),
        _ if state.is_text_entry() => map_text_key(key),
        _ => map_list_key(key, state),
    }
}

fn map_text_key(key: KeyEvent) -> KeyAction {
    let input = match key.code {
        KeyCode::Enter => WizardInput::Confirm,
        KeyCode::Esc => WizardInput::Quit,
        KeyCode::Backspace => WizardInput::Backspace,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => WizardInput::Char(c),
        _ => return KeyAction::None,
    };
    KeyAction::Wizard(input)
}

fn map_list_key(key: KeyEvent, state: WizardState) -> KeyAction {
    let input = match key.code {
        KeyCode::Enter => WizardInput::Confirm,
        KeyCode::Esc | KeyCode::Char('q') => WizardInput::Quit,
        KeyCode::Up | KeyCode::Char('k') => WizardInput::Up,
        KeyCode::Down | KeyCode::Char('j') => WizardInput::Down,
        KeyCode::PageUp => WizardInput::PageUp,
        KeyCode::PageDown => WizardInput::PageDown,
        KeyCode::Home | KeyCode::Char('g') => WizardInput::Home,
        KeyCode::End | KeyCode::Char('G') => WizardInput::End,
        KeyCode::Char(' ') | KeyCode::Tab if state == WizardState::AskSoftware => {
            WizardInput::SelectAndContinue
        }
        _ => return KeyAction::None,
    };
    KeyAction::Wizard(input)
}

/// Key hints shown under the active widget
pub fn instructions(state: WizardState) -> &'static str {
    match state {
        WizardState::AskSoftware => {
            "↑/↓: Navigate | Space/Tab: Add to selection | Enter: Finish selecting | Esc: Quit"
        }
        WizardState::Confirm => "Enter: Start installation (erases the target disk) | Esc: Quit",
        WizardState::Running => "Esc/Ctrl+C: Cancel after the current step",
        WizardState::Done => "Enter/q: Exit",
        s if s.is_text_entry() => "Type to edit | Backspace: Delete | Enter: Confirm | Esc: Quit",
        _ => "↑/↓: Navigate | Enter: Select | Esc: Quit",
    }
}
