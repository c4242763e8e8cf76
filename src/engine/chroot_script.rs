//! Chroot configuration script
//!
//! Renders the bash program that `arch-chroot` runs once inside the new root.
//! User-supplied values are quoted exactly once, into `readonly` assignments
//! at the top of the script. Everything below the header only refers to those
//! variables inside double quotes, so a value is always data and never code.
//!
//! Required sections call `fail <section>`, which exits non-zero and names
//! the section on stderr. Optional package installs call `warn` instead; the
//! executor collects those lines as step warnings.

use crate::config::{Configuration, SshSettings};
use crate::engine::shell::{self, readonly_assignment};
use crate::error::Result;
use crate::types::BootloaderTarget;
use std::path::Path;

/// Prefix of stderr lines reported as warnings
pub const WARNING_PREFIX: &str = "archprov-warning:";

/// Prefix of the stderr line naming a failed section
pub const ERROR_PREFIX: &str = "archprov-error:";

/// Packages installed right after the system update
const BASE_SYSTEM_PACKAGES: &[&str] = &["base-devel", "linux-headers", "networkmanager"];

/// Section headings, in render order
pub const SECTIONS: &[&str] = &[
    "Timezone and locale",
    "Hostname",
    "Root password",
    "User account",
    "System update",
    "NetworkManager",
    "SSH server",
    "Bootloader",
    "Optional software",
    "Cleanup",
];

struct ScriptWriter {
    out: String,
}

impl ScriptWriter {
    fn new() -> Self {
        Self { out: String::with_capacity(4096) }
    }

    fn line(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    fn section(&mut self, title: &str) {
        self.out.push('\n');
        self.line(format!("# --- {} ---", title));
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render the chroot program for `config`. `disk` is the GRUB target for
/// BIOS installs.
///
/// # Errors
///
/// `Script` if any value contains a NUL byte.
pub fn render_chroot_script(config: &Configuration, disk: &Path) -> Result<String> {
    let mut w = ScriptWriter::new();
    let bootloader = config.partition_type().bootloader_target();

    w.line("#!/bin/bash");
    w.line("set -uo pipefail");
    w.line("");
    w.line(readonly_assignment("NEW_HOSTNAME", "Hostname", config.hostname())?);
    w.line(readonly_assignment("NEW_USER", "Username", config.username())?);
    w.line(readonly_assignment("ROOT_PASSWORD", "Root password", config.root_password())?);
    w.line(readonly_assignment("USER_PASSWORD", "User password", config.user_password())?);
    w.line(readonly_assignment("TIMEZONE", "Timezone", config.timezone())?);
    w.line(readonly_assignment("BOOT_DISK", "Target disk", &disk.to_string_lossy())?);
    w.line("");
    w.line(format!("fail() {{ echo \"{} section '$1' failed\" >&2; exit 1; }}", ERROR_PREFIX));
    w.line(format!("warn() {{ echo \"{} $1\" >&2; }}", WARNING_PREFIX));

    w.section(SECTIONS[0]);
    w.line("ln -sf \"/usr/share/zoneinfo/$TIMEZONE\" /etc/localtime || fail timezone");
    w.line("hwclock --systohc || warn 'hwclock --systohc failed'");
    w.line("grep -qxF 'en_US.UTF-8 UTF-8' /etc/locale.gen || echo 'en_US.UTF-8 UTF-8' >> /etc/locale.gen || fail locale");
    w.line("locale-gen || fail locale");
    w.line("echo 'LANG=en_US.UTF-8' > /etc/locale.conf || fail locale");

    w.section(SECTIONS[1]);
    w.line("printf '%s\\n' \"$NEW_HOSTNAME\" > /etc/hostname || fail hostname");
    w.line("{");
    w.line("    echo '127.0.0.1 localhost'");
    w.line("    echo '::1       localhost'");
    w.line("    printf '127.0.1.1 %s.localdomain %s\\n' \"$NEW_HOSTNAME\" \"$NEW_HOSTNAME\"");
    w.line("} >> /etc/hosts || fail hosts");

    w.section(SECTIONS[2]);
    w.line("printf 'root:%s\\n' \"$ROOT_PASSWORD\" | chpasswd || fail root-password");

    w.section(SECTIONS[3]);
    w.line("if ! id -u -- \"$NEW_USER\" >/dev/null 2>&1; then");
    w.line("    useradd -m -G wheel -- \"$NEW_USER\" || fail user");
    w.line("fi");
    w.line("printf '%s:%s\\n' \"$NEW_USER\" \"$USER_PASSWORD\" | chpasswd || fail user-password");
    w.line("printf '%s ALL=(ALL) ALL\\n' \"$NEW_USER\" > /etc/sudoers.d/10-archprov || fail sudoers");
    w.line("chmod 440 /etc/sudoers.d/10-archprov || fail sudoers");
    w.line("visudo -cf /etc/sudoers.d/10-archprov >/dev/null || { rm -f /etc/sudoers.d/10-archprov; fail sudoers; }");

    w.section(SECTIONS[4]);
    w.line("pacman -Syu --noconfirm || fail system-update");
    w.line(format!(
        "pacman -S --noconfirm --needed {} || fail base-packages",
        shell::join(BASE_SYSTEM_PACKAGES)?
    ));

    w.section(SECTIONS[5]);
    w.line("systemctl enable NetworkManager || fail networkmanager");

    if let Some(ssh) = config.ssh() {
        w.section(SECTIONS[6]);
        render_ssh(&mut w, ssh);
    }

    w.section(SECTIONS[7]);
    w.line("pacman -S --noconfirm --needed grub efibootmgr || fail bootloader");
    match bootloader {
        BootloaderTarget::X86_64Efi => w.line(format!(
            "grub-install --target={} --efi-directory=/boot/efi --bootloader-id=GRUB || fail bootloader",
            bootloader
        )),
        BootloaderTarget::I386Pc => w.line(format!(
            "grub-install --target={} \"$BOOT_DISK\" || fail bootloader",
            bootloader
        )),
    }
    w.line("grub-mkconfig -o /boot/grub/grub.cfg || fail bootloader");

    if !config.software().is_empty() {
        w.section(SECTIONS[8]);
        for id in config.software() {
            let packages: Vec<&str> = id.split_whitespace().collect();
            w.line(format!(
                "pacman -S --noconfirm --needed {} || warn {}",
                shell::join(&packages)?,
                shell::quote_field("Software identifier", &format!("failed to install {}", id))?
            ));
        }
    }

    w.section(SECTIONS[9]);
    w.line("pacman -Scc --noconfirm || warn 'package cache cleanup failed'");
    w.line("echo 'archprov: chroot configuration complete'");

    Ok(w.finish())
}

fn render_ssh(w: &mut ScriptWriter, ssh: &SshSettings) {
    let yes_no = |v: bool| if v { "yes" } else { "no" };

    w.line("pacman -S --noconfirm --needed openssh || fail ssh");
    w.line("systemctl enable sshd || fail ssh");
    w.line("set_sshd_option() {");
    w.line("    if grep -qE \"^#?$1[[:space:]]\" /etc/ssh/sshd_config; then");
    w.line("        sed -i -E \"s|^#?$1[[:space:]].*|$1 $2|\" /etc/ssh/sshd_config");
    w.line("    else");
    w.line("        printf '%s %s\\n' \"$1\" \"$2\" >> /etc/ssh/sshd_config");
    w.line("    fi");
    w.line("}");
    // Port is a u16, no quoting involved
    w.line(format!("set_sshd_option Port {} || fail ssh", ssh.port));
    w.line(format!(
        "set_sshd_option PermitRootLogin {} || fail ssh",
        yes_no(ssh.permit_root_login)
    ));
    w.line(format!(
        "set_sshd_option PasswordAuthentication {} || fail ssh",
        yes_no(ssh.password_authentication)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationDraft;
    use crate::types::PartitionType;

    fn draft() -> ConfigurationDraft {
        ConfigurationDraft {
            hostname: "archbox".to_string(),
            username: "alice".to_string(),
            root_password: "root pw".to_string(),
            user_password: "user'pw".to_string(),
            timezone: "Asia/Tokyo".to_string(),
            partition_type: Some(PartitionType::Efi),
            auto_reboot: false,
            ssh: None,
            software: vec![],
        }
    }

    fn render(d: ConfigurationDraft) -> String {
        let config = d.finalize().expect("valid test configuration"); // test: known-good input
        render_chroot_script(&config, Path::new("/dev/sda")).expect("renderable") // test: no NUL bytes
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let mut d = draft();
        d.ssh = Some(SshSettings::default());
        d.software = vec!["git".to_string()];
        let script = render(d);
        let mut last = 0;
        for title in SECTIONS {
            let pos = script
                .find(&format!("# --- {} ---", title))
                .unwrap_or_else(|| panic!("missing section {}", title));
            assert!(pos >= last, "section {} out of order", title);
            last = pos;
        }
    }

    #[test]
    fn test_efi_grub_install() {
        let script = render(draft());
        assert!(script.contains(
            "grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id=GRUB"
        ));
        assert!(!script.contains("i386-pc"));
    }

    #[test]
    fn test_bios_grub_install_targets_disk() {
        let mut d = draft();
        d.partition_type = Some(PartitionType::Mbr);
        let script = render(d);
        assert!(script.contains("readonly BOOT_DISK=/dev/sda"));
        assert!(script.contains("grub-install --target=i386-pc \"$BOOT_DISK\""));
        assert!(!script.contains("x86_64-efi"));
    }

    #[test]
    fn test_ssh_block_only_when_enabled() {
        let script = render(draft());
        assert!(!script.contains("sshd"));

        let mut d = draft();
        d.ssh = Some(SshSettings {
            port: 2222,
            permit_root_login: true,
            password_authentication: false,
        });
        let script = render(d);
        assert!(script.contains("Port 2222"));
        assert!(script.contains("PermitRootLogin yes"));
        assert!(script.contains("PasswordAuthentication no"));
    }

    #[test]
    fn test_one_install_per_software_entry() {
        let mut d = draft();
        d.software = vec!["git".to_string(), "nodejs npm".to_string()];
        let script = render(d);
        assert!(script.contains("pacman -S --noconfirm --needed git || warn"));
        assert!(script.contains("pacman -S --noconfirm --needed nodejs npm || warn"));
        assert!(script.contains("pacman -Scc --noconfirm"));
    }

    #[test]
    fn test_sudoers_written_after_useradd() {
        let script = render(draft());
        let useradd = script.find("useradd -m -G wheel").unwrap();
        let sudoers = script.find("ALL=(ALL) ALL").unwrap();
        assert!(useradd < sudoers);
        assert!(script.contains("useradd -m -G wheel -- \"$NEW_USER\" || fail user"));
    }

    #[test]
    fn test_values_only_appear_in_header() {
        let script = render(draft());
        let header_end = script.find("fail()").unwrap();
        assert_eq!(script.matches("archbox").count(), 1);
        assert!(script.find("archbox").unwrap() < header_end);
        assert!(!script[header_end..].contains("user'pw"));
    }

    #[test]
    fn test_nul_in_disk_path_is_script_error() {
        let config = draft().finalize().unwrap();
        assert!(render_chroot_script(&config, Path::new("/dev/sda\0")).is_err());
    }
}
