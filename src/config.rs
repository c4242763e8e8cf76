//! Configuration management module
//!
//! `Configuration` is the immutable snapshot the wizard hands to the
//! provisioning pipeline. It is produced exactly once, by validating a
//! `ConfigurationDraft`, and has no mutating methods afterwards.

use crate::error::{ProvisionError, Result};
use crate::types::PartitionType;
use serde::Serialize;
use std::fmt;

/// Default SSH port pre-filled by the wizard
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH daemon policy. Only exists when SSH is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SshSettings {
    pub port: u16,
    pub permit_root_login: bool,
    pub password_authentication: bool,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            permit_root_login: false,
            password_authentication: true,
        }
    }
}

/// Unvalidated configuration values as collected by the wizard.
#[derive(Clone, Default)]
pub struct ConfigurationDraft {
    pub hostname: String,
    pub username: String,
    pub root_password: String,
    pub user_password: String,
    pub timezone: String,
    pub partition_type: Option<PartitionType>,
    pub auto_reboot: bool,
    pub ssh: Option<SshSettings>,
    pub software: Vec<String>,
}

impl ConfigurationDraft {
    /// Validate every field and produce the immutable snapshot.
    pub fn finalize(self) -> Result<Configuration> {
        validate_name("Hostname", &self.hostname)?;
        validate_name("Username", &self.username)?;
        validate_required("Root Password", &self.root_password)?;
        validate_required("User Password", &self.user_password)?;
        validate_timezone(&self.timezone)?;

        let partition_type = self
            .partition_type
            .ok_or_else(|| ProvisionError::validation("Partition type is required"))?;

        if let Some(ssh) = &self.ssh {
            if ssh.port == 0 {
                return Err(ProvisionError::validation("SSH port must be between 1 and 65535"));
            }
        }

        let mut software: Vec<String> = Vec::with_capacity(self.software.len());
        for id in self.software {
            let id = id.trim().to_string();
            if id.is_empty() || software.contains(&id) {
                continue;
            }
            validate_name("Software identifier", &id)?;
            software.push(id);
        }

        Ok(Configuration {
            hostname: self.hostname.trim().to_string(),
            username: self.username.trim().to_string(),
            root_password: self.root_password,
            user_password: self.user_password,
            timezone: self.timezone.trim().to_string(),
            partition_type,
            auto_reboot: self.auto_reboot,
            ssh: self.ssh,
            software,
        })
    }
}

impl fmt::Debug for ConfigurationDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationDraft")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("timezone", &self.timezone)
            .field("partition_type", &self.partition_type)
            .field("auto_reboot", &self.auto_reboot)
            .field("ssh", &self.ssh)
            .field("software", &self.software)
            .finish_non_exhaustive()
    }
}

/// Immutable installation configuration.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    hostname: String,
    username: String,
    #[serde(skip_serializing)]
    root_password: String,
    #[serde(skip_serializing)]
    user_password: String,
    timezone: String,
    partition_type: PartitionType,
    auto_reboot: bool,
    ssh: Option<SshSettings>,
    software: Vec<String>,
}

impl Configuration {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn root_password(&self) -> &str {
        &self.root_password
    }

    pub fn user_password(&self) -> &str {
        &self.user_password
    }

    /// Zoneinfo identifier, e.g. `Europe/London`
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn partition_type(&self) -> PartitionType {
        self.partition_type
    }

    pub fn auto_reboot(&self) -> bool {
        self.auto_reboot
    }

    pub fn ssh(&self) -> Option<&SshSettings> {
        self.ssh.as_ref()
    }

    pub fn ssh_enabled(&self) -> bool {
        self.ssh.is_some()
    }

    /// Selected software identifiers in selection order, without duplicates
    pub fn software(&self) -> &[String] {
        &self.software
    }

    /// Human-readable summary lines for the confirm screen. Never includes passwords.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Hostname:        {}", self.hostname),
            format!("Username:        {}", self.username),
            "Passwords:       ********".to_string(),
            format!("Timezone:        {}", self.timezone),
            format!("Partition type:  {}", self.partition_type),
            format!("Auto reboot:     {}", yes_no(self.auto_reboot)),
        ];
        match &self.ssh {
            Some(ssh) => {
                lines.push(format!("SSH server:      Yes (port {})", ssh.port));
                lines.push(format!("  Root login:    {}", yes_no(ssh.permit_root_login)));
                lines.push(format!("  Password auth: {}", yes_no(ssh.password_authentication)));
            }
            None => lines.push("SSH server:      No".to_string()),
        }
        if self.software.is_empty() {
            lines.push("Software:        (none)".to_string());
        } else {
            lines.push(format!("Software:        {}", self.software.join(", ")));
        }
        lines
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("root_password", &"<redacted>")
            .field("user_password", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("partition_type", &self.partition_type)
            .field("auto_reboot", &self.auto_reboot)
            .field("ssh", &self.ssh)
            .field("software", &self.software)
            .finish()
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Required scalar: non-blank and free of control characters.
pub fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProvisionError::validation(format!("{} is required", field)));
    }
    if value.chars().any(char::is_control) {
        return Err(ProvisionError::validation(format!(
            "{} cannot contain control characters",
            field
        )));
    }
    Ok(())
}

/// A value passed to commands as a positional word: required, and never
/// starting with `-` where it would parse as an option.
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    validate_required(field, value)?;
    if value.trim_start().starts_with('-') {
        return Err(ProvisionError::validation(format!("{} cannot start with '-'", field)));
    }
    Ok(())
}

/// Timezone must be a relative path below /usr/share/zoneinfo.
pub fn validate_timezone(value: &str) -> Result<()> {
    validate_required("Timezone", value)?;
    let tz = value.trim();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '/');
    if tz.starts_with('/') || !tz.chars().all(allowed) || tz.split('/').any(|p| p.is_empty() || p == "..") {
        return Err(ProvisionError::validation(format!(
            "Timezone '{}' is not a valid zoneinfo name (e.g. Europe/London)",
            tz
        )));
    }
    Ok(())
}

/// Parse the SSH port field.
pub fn parse_ssh_port(value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ProvisionError::validation(format!(
            "SSH port '{}' must be a number between 1 and 65535",
            value.trim()
        ))),
    }
}
