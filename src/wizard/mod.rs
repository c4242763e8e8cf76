//! Configuration wizard
//!
//! A forward-only state machine that collects one field per state and emits
//! a single immutable `Configuration` when the user confirms. The wizard is
//! independent of the terminal: it consumes `WizardInput` actions and the
//! UI reads its state back for rendering.

pub mod fields;
pub mod transitions;

pub use fields::{ChoiceList, TextField};
pub use transitions::{next_state, Guard, GuardContext, Transition, WizardState, TRANSITIONS};

use crate::catalog::SoftwareCatalog;
use crate::config::{
    parse_ssh_port, validate_name, validate_required, validate_timezone, Configuration, ConfigurationDraft,
    SshSettings, DEFAULT_SSH_PORT,
};
use crate::error::{ProvisionError, Result};
use crate::types::{PartitionType, Toggle};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Timezones offered before falling back to manual entry
pub const TIMEZONE_CHOICES: &[&str] = &["America/New_York", "Europe/London", "Asia/Tokyo"];
/// List entry that switches to manual timezone entry
pub const TIMEZONE_OTHER: &str = "Other";

/// Widget-level actions, already decoded from key events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardInput {
    Char(char),
    Backspace,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    /// Accept the current field. In software selection: finish selecting.
    Confirm,
    /// Software selection only: add the highlighted entry and keep browsing
    SelectAndContinue,
    Quit,
}

/// Result of feeding one input to the wizard
#[derive(Debug)]
pub enum WizardOutcome {
    /// Input consumed, state unchanged
    Pending,
    /// Moved to the contained state
    Advanced(WizardState),
    /// Confirm refused; state unchanged
    Rejected(ProvisionError),
    /// The user confirmed. Emitted exactly once per wizard.
    Submitted(Configuration),
    Quit,
    /// Input has no meaning in the current state
    Ignored,
}

/// Widget active in the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    Text(TextField),
    Choice(ChoiceList),
    /// Confirm/Running/Done screens have no editable widget
    None,
}

pub struct ConfigurationWizard {
    state: WizardState,
    catalog: SoftwareCatalog,
    draft: ConfigurationDraft,
    widget: Widget,
    guards: GuardContext,
    error: Option<String>,
    preview: Option<Configuration>,
    submitted: bool,
}

impl ConfigurationWizard {
    pub fn new(catalog: SoftwareCatalog) -> Self {
        let state = WizardState::default();
        let mut wizard = Self {
            state,
            catalog,
            draft: ConfigurationDraft::default(),
            widget: Widget::None,
            guards: GuardContext::default(),
            error: None,
            preview: None,
            submitted: false,
        };
        wizard.widget = wizard.widget_for(state);
        wizard
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    pub fn catalog(&self) -> &SoftwareCatalog {
        &self.catalog
    }

    /// Last validation message, cleared by the next input
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Identifiers selected so far in software selection
    pub fn selected_software(&self) -> &[String] {
        &self.draft.software
    }

    /// Whether the catalog entry at `index` is already selected
    pub fn is_selected(&self, index: usize) -> bool {
        self.catalog
            .get(index)
            .is_some_and(|entry| self.draft.software.contains(&entry.identifier()))
    }

    /// Partition type chosen so far, for the firmware warning
    pub fn partition_type(&self) -> Option<PartitionType> {
        self.draft.partition_type
    }

    /// Validated configuration shown on the confirm screen
    pub fn preview(&self) -> Option<&Configuration> {
        self.preview.as_ref()
    }

    /// Called by the app when the provisioning run has ended.
    pub fn mark_finished(&mut self) {
        if self.state == WizardState::Running {
            self.enter(WizardState::Done);
        }
    }

    pub fn handle_input(&mut self, input: WizardInput) -> WizardOutcome {
        match self.state {
            WizardState::Running => return WizardOutcome::Ignored,
            WizardState::Done => {
                return match input {
                    WizardInput::Quit => WizardOutcome::Quit,
                    _ => WizardOutcome::Ignored,
                };
            }
            _ => {}
        }

        self.error = None;
        match input {
            WizardInput::Quit => {
                tracing::info!(state = %self.state, "wizard quit before confirmation");
                WizardOutcome::Quit
            }
            WizardInput::Confirm => self.confirm(),
            WizardInput::SelectAndContinue => self.select_software(),
            other => self.edit_widget(other),
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    fn edit_widget(&mut self, input: WizardInput) -> WizardOutcome {
        match (&mut self.widget, input) {
            (Widget::Text(field), WizardInput::Char(c)) => field.push(c),
            (Widget::Text(field), WizardInput::Backspace) => field.pop(),
            (Widget::Choice(list), WizardInput::Up) => list.up(),
            (Widget::Choice(list), WizardInput::Down) => list.down(),
            (Widget::Choice(list), WizardInput::PageUp) => list.page_up(),
            (Widget::Choice(list), WizardInput::PageDown) => list.page_down(),
            (Widget::Choice(list), WizardInput::Home) => list.home(),
            (Widget::Choice(list), WizardInput::End) => list.end(),
            _ => return WizardOutcome::Ignored,
        }
        WizardOutcome::Pending
    }

    fn select_software(&mut self) -> WizardOutcome {
        if self.state != WizardState::AskSoftware {
            return WizardOutcome::Ignored;
        }
        let Widget::Choice(list) = &self.widget else {
            return WizardOutcome::Ignored;
        };
        let Some(entry) = self.catalog.get(list.highlighted()) else {
            return WizardOutcome::Pending;
        };
        let identifier = entry.identifier();
        if !self.draft.software.contains(&identifier) {
            tracing::debug!(software = %identifier, "software selected");
            self.draft.software.push(identifier);
        }
        WizardOutcome::Pending
    }

    // ========================================================================
    // Confirmation
    // ========================================================================

    fn confirm(&mut self) -> WizardOutcome {
        if self.state == WizardState::Confirm {
            return self.submit();
        }
        match self.accept_current() {
            Ok(()) => self.advance(),
            Err(e) => {
                tracing::debug!(state = %self.state, error = %e, "input rejected");
                self.error = Some(e.to_string());
                WizardOutcome::Rejected(e)
            }
        }
    }

    /// Store the current widget value into the draft.
    fn accept_current(&mut self) -> Result<()> {
        let state = self.state;
        let typed = match &self.widget {
            Widget::Text(field) => Some(field.value().to_string()),
            _ => None,
        };
        let highlighted = match &self.widget {
            Widget::Choice(list) => list.selected().map(str::to_string),
            _ => None,
        };
        let text = || typed.clone().unwrap_or_default();
        let choice = || {
            highlighted
                .clone()
                .ok_or_else(|| ProvisionError::validation(format!("{}: nothing selected", state.title())))
        };

        match state {
            WizardState::AskHostname => {
                let value = text();
                validate_name("Hostname", &value)?;
                self.draft.hostname = value.trim().to_string();
            }
            WizardState::AskUsername => {
                let value = text();
                validate_name("Username", &value)?;
                self.draft.username = value.trim().to_string();
            }
            WizardState::AskRootPassword => {
                let value = text();
                validate_required("Root Password", &value)?;
                self.draft.root_password = value;
            }
            WizardState::AskUserPassword => {
                let value = text();
                validate_required("User Password", &value)?;
                self.draft.user_password = value;
            }
            WizardState::AskTimezone => {
                let value = choice()?;
                self.guards.timezone_other = value == TIMEZONE_OTHER;
                if !self.guards.timezone_other {
                    self.draft.timezone = value;
                }
            }
            WizardState::AskTimezoneManual => {
                let value = text();
                validate_timezone(&value)?;
                self.draft.timezone = value.trim().to_string();
            }
            WizardState::AskPartitionType => {
                let value = choice()?;
                let partition_type = PartitionType::from_str(&value)
                    .map_err(|_| ProvisionError::validation(format!("Unknown partition type '{}'", value)))?;
                self.draft.partition_type = Some(partition_type);
            }
            WizardState::AskAutoReboot => {
                self.draft.auto_reboot = parse_toggle(&choice()?)?;
            }
            WizardState::AskSshServer => {
                let enabled = parse_toggle(&choice()?)?;
                self.guards.ssh_enabled = enabled;
                self.draft.ssh = enabled.then(SshSettings::default);
            }
            WizardState::AskSshPort => {
                let port = parse_ssh_port(&text())?;
                self.ssh_mut()?.port = port;
            }
            WizardState::AskRootLogin => {
                let allowed = parse_toggle(&choice()?)?;
                self.ssh_mut()?.permit_root_login = allowed;
            }
            WizardState::AskPasswordLogin => {
                let allowed = parse_toggle(&choice()?)?;
                self.ssh_mut()?.password_authentication = allowed;
            }
            WizardState::AskSoftware => {
                self.preview = Some(self.draft.clone().finalize()?);
            }
            WizardState::Confirm | WizardState::Running | WizardState::Done => {}
        }
        Ok(())
    }

    fn ssh_mut(&mut self) -> Result<&mut SshSettings> {
        self.draft
            .ssh
            .as_mut()
            .ok_or_else(|| ProvisionError::state("SSH settings requested while SSH is disabled"))
    }

    fn submit(&mut self) -> WizardOutcome {
        if self.submitted {
            return WizardOutcome::Ignored;
        }
        let Some(config) = self.preview.clone() else {
            let e = ProvisionError::state("No validated configuration to submit");
            self.error = Some(e.to_string());
            return WizardOutcome::Rejected(e);
        };
        self.submitted = true;
        tracing::info!(config = ?config, "configuration confirmed");
        self.enter(WizardState::Running);
        WizardOutcome::Submitted(config)
    }

    fn advance(&mut self) -> WizardOutcome {
        match next_state(self.state, &self.guards) {
            Some(next) => {
                tracing::debug!(from = %self.state, to = %next, "wizard advanced");
                self.enter(next);
                WizardOutcome::Advanced(next)
            }
            None => WizardOutcome::Ignored,
        }
    }

    fn enter(&mut self, state: WizardState) {
        self.state = state;
        self.widget = self.widget_for(state);
    }

    fn widget_for(&self, state: WizardState) -> Widget {
        let yes_no = || Widget::Choice(ChoiceList::new(Toggle::iter().map(|t| t.to_string()).collect()));
        match state {
            WizardState::AskHostname => Widget::Text(TextField::new("e.g. archbox")),
            WizardState::AskUsername => Widget::Text(TextField::new("e.g. alice")),
            WizardState::AskRootPassword => Widget::Text(TextField::masked("root password")),
            WizardState::AskUserPassword => Widget::Text(TextField::masked("user password")),
            WizardState::AskTimezone => Widget::Choice(ChoiceList::new(
                TIMEZONE_CHOICES
                    .iter()
                    .chain(std::iter::once(&TIMEZONE_OTHER))
                    .map(|s| s.to_string())
                    .collect(),
            )),
            WizardState::AskTimezoneManual => Widget::Text(TextField::new("Region/City")),
            WizardState::AskPartitionType => Widget::Choice(ChoiceList::new(
                PartitionType::iter().map(|p| p.to_string()).collect(),
            )),
            WizardState::AskAutoReboot
            | WizardState::AskSshServer
            | WizardState::AskRootLogin
            | WizardState::AskPasswordLogin => yes_no(),
            WizardState::AskSshPort => {
                Widget::Text(TextField::new("1-65535").with_value(DEFAULT_SSH_PORT.to_string()))
            }
            WizardState::AskSoftware => Widget::Choice(ChoiceList::new(
                self.catalog.entries().iter().map(|e| e.title.clone()).collect(),
            )),
            WizardState::Confirm | WizardState::Running | WizardState::Done => Widget::None,
        }
    }
}

fn parse_toggle(label: &str) -> Result<bool> {
    Toggle::from_str(label)
        .map(|t| t.as_bool())
        .map_err(|_| ProvisionError::validation(format!("Expected Yes or No, got '{}'", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(wizard: &mut ConfigurationWizard, text: &str) {
        for c in text.chars() {
            wizard.handle_input(WizardInput::Char(c));
        }
    }

    fn answer(wizard: &mut ConfigurationWizard, text: &str) {
        type_text(wizard, text);
        assert!(matches!(wizard.handle_input(WizardInput::Confirm), WizardOutcome::Advanced(_)));
    }

    fn choose(wizard: &mut ConfigurationWizard, label: &str) {
        if let Widget::Choice(list) = &mut wizard.widget {
            assert!(list.highlight(label), "{} not offered", label);
        }
        assert!(matches!(wizard.handle_input(WizardInput::Confirm), WizardOutcome::Advanced(_)));
    }

    #[test]
    fn test_empty_hostname_rejected() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        type_text(&mut wizard, "   ");
        let outcome = wizard.handle_input(WizardInput::Confirm);
        assert!(matches!(outcome, WizardOutcome::Rejected(ProvisionError::Validation(_))));
        assert_eq!(wizard.state(), WizardState::AskHostname);
        assert!(wizard.error().is_some());
        assert!(wizard.preview().is_none());
    }

    #[test]
    fn test_error_cleared_by_next_input() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        wizard.handle_input(WizardInput::Confirm);
        assert!(wizard.error().is_some());
        wizard.handle_input(WizardInput::Char('a'));
        assert!(wizard.error().is_none());
    }

    #[test]
    fn test_ssh_port_prefilled() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        answer(&mut wizard, "archbox");
        answer(&mut wizard, "alice");
        answer(&mut wizard, "pw");
        answer(&mut wizard, "pw");
        choose(&mut wizard, "Europe/London");
        choose(&mut wizard, "GPT");
        choose(&mut wizard, "No");
        choose(&mut wizard, "Yes");
        assert_eq!(wizard.state(), WizardState::AskSshPort);
        match wizard.widget() {
            Widget::Text(field) => assert_eq!(field.value(), "22"),
            other => panic!("unexpected widget {:?}", other),
        }
    }

    #[test]
    fn test_software_selection_is_a_set() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        wizard.enter(WizardState::AskSoftware);
        wizard.handle_input(WizardInput::SelectAndContinue);
        wizard.handle_input(WizardInput::SelectAndContinue);
        wizard.handle_input(WizardInput::Down);
        wizard.handle_input(WizardInput::SelectAndContinue);
        assert_eq!(wizard.selected_software(), ["ohmyzsh", "kitty"]);
        assert!(wizard.is_selected(0));
        assert!(!wizard.is_selected(2));
    }

    #[test]
    fn test_select_outside_software_is_ignored() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        assert!(matches!(wizard.handle_input(WizardInput::SelectAndContinue), WizardOutcome::Ignored));
    }

    #[test]
    fn test_quit_before_confirm() {
        let mut wizard = ConfigurationWizard::new(SoftwareCatalog::default());
        answer(&mut wizard, "archbox");
        assert!(matches!(wizard.handle_input(WizardInput::Quit), WizardOutcome::Quit));
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("Yes").unwrap());
        assert!(!parse_toggle("No").unwrap());
        assert!(parse_toggle("Maybe").is_err());
    }
}
