//! Wizard states and the transition table
//!
//! Each row is `(from, guard, to)`. On confirm, the first row whose `from`
//! matches the current state and whose guard holds decides the next state.
//! There are no backward rows.
//!
//! ```text
//! AskHostname → AskUsername → AskRootPassword → AskUserPassword → AskTimezone
//!   AskTimezone ─(Other)→ AskTimezoneManual → AskPartitionType
//!   AskTimezone ─(listed)→ AskPartitionType
//! AskPartitionType → AskAutoReboot → AskSshServer
//!   AskSshServer ─(yes)→ AskSshPort → AskRootLogin → AskPasswordLogin → AskSoftware
//!   AskSshServer ─(no)→ AskSoftware
//! AskSoftware → Confirm → Running → Done
//! ```

use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum WizardState {
    #[default]
    AskHostname,
    AskUsername,
    AskRootPassword,
    AskUserPassword,
    AskTimezone,
    AskTimezoneManual,
    AskPartitionType,
    AskAutoReboot,
    AskSshServer,
    AskSshPort,
    AskRootLogin,
    AskPasswordLogin,
    AskSoftware,
    Confirm,
    Running,
    Done,
}

impl WizardState {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AskHostname => "Enter Hostname",
            Self::AskUsername => "Enter Username",
            Self::AskRootPassword => "Enter Root Password",
            Self::AskUserPassword => "Enter User Password",
            Self::AskTimezone => "Select Timezone",
            Self::AskTimezoneManual => "Enter Timezone (e.g. Europe/Berlin)",
            Self::AskPartitionType => "Select Partition Type",
            Self::AskAutoReboot => "Reboot Automatically When Done?",
            Self::AskSshServer => "Enable SSH Server?",
            Self::AskSshPort => "SSH Port",
            Self::AskRootLogin => "Allow Root Login over SSH?",
            Self::AskPasswordLogin => "Allow Password Login over SSH?",
            Self::AskSoftware => "Select Additional Software",
            Self::Confirm => "Confirm Installation",
            Self::Running => "Installing Arch Linux",
            Self::Done => "Installation Finished",
        }
    }

    /// Number of screens up to and including Confirm
    pub const TOTAL_STEPS: usize = 14;

    /// 1-based position for the title bar. None once the run has started.
    /// Skipped branches leave gaps in the numbering.
    pub fn step_number(&self) -> Option<usize> {
        if self.is_collecting() {
            Some(*self as usize + 1)
        } else {
            None
        }
    }

    /// States that collect a value. Quit is honored only here and in Done.
    pub fn is_collecting(&self) -> bool {
        !matches!(self, Self::Running | Self::Done)
    }

    /// States whose widget is a text field
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            Self::AskHostname
                | Self::AskUsername
                | Self::AskRootPassword
                | Self::AskUserPassword
                | Self::AskTimezoneManual
                | Self::AskSshPort
        )
    }
}

/// Condition on already-collected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    SshEnabled,
    SshDisabled,
    TimezoneOther,
    TimezoneListed,
}

/// Facts the guards read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardContext {
    pub ssh_enabled: bool,
    pub timezone_other: bool,
}

impl Guard {
    pub fn holds(&self, ctx: &GuardContext) -> bool {
        match self {
            Self::Always => true,
            Self::SshEnabled => ctx.ssh_enabled,
            Self::SshDisabled => !ctx.ssh_enabled,
            Self::TimezoneOther => ctx.timezone_other,
            Self::TimezoneListed => !ctx.timezone_other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: WizardState,
    pub guard: Guard,
    pub to: WizardState,
}

const fn row(from: WizardState, guard: Guard, to: WizardState) -> Transition {
    Transition { from, guard, to }
}

use WizardState::*;

pub const TRANSITIONS: &[Transition] = &[
    row(AskHostname, Guard::Always, AskUsername),
    row(AskUsername, Guard::Always, AskRootPassword),
    row(AskRootPassword, Guard::Always, AskUserPassword),
    row(AskUserPassword, Guard::Always, AskTimezone),
    row(AskTimezone, Guard::TimezoneOther, AskTimezoneManual),
    row(AskTimezone, Guard::TimezoneListed, AskPartitionType),
    row(AskTimezoneManual, Guard::Always, AskPartitionType),
    row(AskPartitionType, Guard::Always, AskAutoReboot),
    row(AskAutoReboot, Guard::Always, AskSshServer),
    row(AskSshServer, Guard::SshEnabled, AskSshPort),
    row(AskSshServer, Guard::SshDisabled, AskSoftware),
    row(AskSshPort, Guard::Always, AskRootLogin),
    row(AskRootLogin, Guard::Always, AskPasswordLogin),
    row(AskPasswordLogin, Guard::Always, AskSoftware),
    row(AskSoftware, Guard::Always, Confirm),
    row(Confirm, Guard::Always, Running),
    row(Running, Guard::Always, Done),
];

/// Next state from `from` given `ctx`, or None at the end of the table.
pub fn next_state(from: WizardState, ctx: &GuardContext) -> Option<WizardState> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.guard.holds(ctx))
        .map(|t| t.to)
}
