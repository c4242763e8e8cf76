//! Provisioning Plan Builder
//!
//! Expands a `Configuration` plus a target (disk, root, detected RAM) into a
//! totally ordered `ProvisioningPlan`. The order of the plan is the
//! dependency order; the executor never reorders it.
//!
//! | Phase     | Steps                                                     | Fatal |
//! |-----------|-----------------------------------------------------------|-------|
//! | Host      | hostname, user, passwords, timezone, hwclock, locale      | no    |
//! | Disk      | mklabel, mkpart*, flags, mkfs*, mounts (root first)       | yes   |
//! | Swap      | fallocate (RAM + 2048 MiB), chmod, mkswap, swapon         | no    |
//! | Bootstrap | pacstrap base base-devel linux linux-firmware             | yes   |
//! | Fstab     | genfstab -U root >> root/etc/fstab                        | yes   |
//! | Chroot    | one bash program via arch-chroot                          | yes   |
//! | Teardown  | swapoff, umount deepest-first                             | no    |
//! | Reboot    | only with auto-reboot                                     | no    |
//!
//! Pure logic, no I/O.

use crate::config::Configuration;
use crate::engine::chroot_script::render_chroot_script;
use crate::engine::partition::{partition_path, PartitionLayout, PartitionSpec};
use crate::engine::shell;
use crate::error::{ProvisionError, Result};
use crate::types::{BootloaderTarget, ExecutionContext};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::Display;

/// Packages installed by pacstrap into the new root
pub const BASE_PACKAGES: &[&str] = &["base", "base-devel", "linux", "linux-firmware"];

/// Extra swap on top of installed RAM
pub const SWAP_HEADROOM_MIB: u64 = 2048;

/// Locale generated on both the live system and the target
pub const LOCALE_GEN_LINE: &str = "en_US.UTF-8 UTF-8";
pub const LOCALE_CONF_LINE: &str = "LANG=en_US.UTF-8";

// ============================================================================
// Step Types
// ============================================================================

/// Idempotency predicate. When it holds, the step's effect is already
/// present and the step is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Probe {
    /// A file or directory exists
    PathExists(PathBuf),
    /// A file contains an exact line
    FileContainsLine { path: PathBuf, line: String },
    /// Something is mounted at the path (`mountpoint -q`)
    IsMountPoint(PathBuf),
    /// The path is listed in /proc/swaps
    SwapActive(PathBuf),
    /// A command exits 0 (e.g. `id -u <user>`)
    CommandSucceeds { program: String, args: Vec<String> },
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathExists(path) => write!(f, "exists {}", path.display()),
            Self::FileContainsLine { path, line } => {
                write!(f, "{} contains '{}'", path.display(), line)
            }
            Self::IsMountPoint(path) => write!(f, "mountpoint {}", path.display()),
            Self::SwapActive(path) => write!(f, "swap active {}", path.display()),
            Self::CommandSucceeds { program, args } => {
                write!(f, "succeeds: {} {}", program, args.join(" "))
            }
        }
    }
}

/// What a step runs
#[derive(Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Run a program directly, no shell. `stdin` carries secrets such as
    /// `chpasswd` input so they never appear in argv.
    Exec {
        program: String,
        args: Vec<String>,
        stdin: Option<String>,
    },
    /// Feed a bash program on stdin
    Script { body: String },
}

impl StepAction {
    pub fn command_line(&self) -> String {
        match self {
            Self::Exec { program, args, .. } if args.is_empty() => program.clone(),
            Self::Exec { program, args, .. } => format!("{} {}", program, args.join(" ")),
            Self::Script { body } => format!("bash script ({} lines)", body.lines().count()),
        }
    }
}

// stdin and script bodies may hold passwords
impl fmt::Debug for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec { program, args, stdin } => f
                .debug_struct("Exec")
                .field("program", program)
                .field("args", args)
                .field("stdin", &stdin.as_ref().map(|s| format!("<{} bytes>", s.len())))
                .finish(),
            Self::Script { body } => f
                .debug_struct("Script")
                .field("body", &format!("<{} bytes>", body.len()))
                .finish(),
        }
    }
}

/// Plan phase, used for display and ordering checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
pub enum Phase {
    Host,
    Disk,
    Swap,
    Bootstrap,
    Fstab,
    Chroot,
    Teardown,
    Reboot,
}

/// One unit of provisioning work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStep {
    pub id: String,
    pub description: String,
    pub phase: Phase,
    pub context: ExecutionContext,
    pub action: StepAction,
    /// Failure halts the rest of the plan
    pub fatal: bool,
    pub skip_if: Option<Probe>,
}

impl ProvisioningStep {
    pub fn exec(id: impl Into<String>, description: impl Into<String>, phase: Phase, program: &str, args: &[&str]) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            phase,
            context: ExecutionContext::Host,
            action: StepAction::Exec {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                stdin: None,
            },
            fatal: false,
            skip_if: None,
        }
    }

    pub fn script(id: impl Into<String>, description: impl Into<String>, phase: Phase, body: String) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            phase,
            context: ExecutionContext::Host,
            action: StepAction::Script { body },
            fatal: false,
            skip_if: None,
        }
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn skip_if(mut self, probe: Probe) -> Self {
        self.skip_if = Some(probe);
        self
    }

    pub fn in_chroot(mut self) -> Self {
        self.context = ExecutionContext::Chroot;
        self
    }

    pub fn with_stdin(mut self, input: String) -> Self {
        if let StepAction::Exec { stdin, .. } = &mut self.action {
            *stdin = Some(input);
        }
        self
    }

    pub fn is_mount(&self) -> bool {
        self.phase == Phase::Disk && self.id.starts_with("disk-mount-")
    }

    pub fn is_unmount(&self) -> bool {
        self.phase == Phase::Teardown && self.id.starts_with("teardown-umount-")
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.context, self.id, self.action.command_line())?;
        if self.fatal {
            write!(f, " fatal")?;
        }
        if let Some(probe) = &self.skip_if {
            write!(f, " skip-if {}", probe)?;
        }
        Ok(())
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Where the system is installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub disk: PathBuf,
    pub root: PathBuf,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            disk: PathBuf::from("/dev/sda"),
            root: PathBuf::from("/mnt"),
        }
    }
}

impl Target {
    pub fn new(disk: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            disk: disk.into(),
            root: root.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.disk.starts_with("/dev/") || self.disk == Path::new("/dev/") {
            return Err(ProvisionError::validation(format!(
                "Invalid disk path '{}' - must start with /dev/",
                self.disk.display()
            )));
        }
        if !self.root.is_absolute() || self.root == Path::new("/") {
            return Err(ProvisionError::validation(format!(
                "Target root '{}' must be an absolute path other than /",
                self.root.display()
            )));
        }
        Ok(())
    }

    pub fn swapfile(&self) -> PathBuf {
        self.root.join("swapfile")
    }

    pub fn fstab(&self) -> PathBuf {
        self.root.join("etc/fstab")
    }
}

/// Ordered steps for one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisioningPlan {
    pub steps: Vec<ProvisioningStep>,
    pub target: Target,
    pub layout: PartitionLayout,
    pub bootloader: BootloaderTarget,
}

impl ProvisioningPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&ProvisioningStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The single step executed inside the new root
    pub fn chroot_step(&self) -> Option<&ProvisioningStep> {
        self.steps.iter().find(|s| s.context == ExecutionContext::Chroot)
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Provisioning plan for {}", self.target.disk.display()),
            format!("  Root: {}", self.target.root.display()),
            format!("  Bootloader: {}", self.bootloader),
            format!("  Steps ({}):", self.steps.len()),
        ];
        for (i, step) in self.steps.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, step));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Plan Calculation
// ============================================================================

/// Build the provisioning plan for `config` against `target`.
///
/// # Errors
///
/// - `Validation` if the target disk or root is unusable
/// - `Layout` if the partition layout fails its own checks
/// - `Script` if a value cannot be rendered into the chroot script
///
/// Nothing is executed.
pub fn build_plan(config: &Configuration, target: &Target, ram_mib: u64) -> Result<ProvisioningPlan> {
    target.validate()?;

    let layout = PartitionLayout::for_type(config.partition_type());
    layout.validate()?;

    let mut steps = Vec::new();
    steps.extend(host_steps(config)?);
    steps.extend(disk_steps(&layout, target));
    steps.extend(swap_steps(target, ram_mib));
    steps.extend(bootstrap_steps(target)?);

    let body = render_chroot_script(config, &target.disk)?;
    steps.push(
        ProvisioningStep::script(
            "chroot-configure",
            "Configure the new system inside arch-chroot",
            Phase::Chroot,
            body,
        )
        .in_chroot()
        .fatal(),
    );

    steps.extend(teardown_steps(&layout, target));

    if config.auto_reboot() {
        steps.push(ProvisioningStep::exec("reboot", "Reboot into the new system", Phase::Reboot, "reboot", &[]));
    }

    let plan = ProvisioningPlan {
        steps,
        target: target.clone(),
        bootloader: config.partition_type().bootloader_target(),
        layout,
    };
    tracing::debug!("{}", plan.summary());
    Ok(plan)
}

fn host_steps(config: &Configuration) -> Result<Vec<ProvisioningStep>> {
    let hostname = config.hostname();
    let username = config.username();
    let zoneinfo = format!("/usr/share/zoneinfo/{}", config.timezone());

    let locale_script = format!(
        "echo {} >> /etc/locale.gen\n",
        shell::quote(LOCALE_GEN_LINE)?
    );
    let locale_conf_script = format!("echo {} > /etc/locale.conf\n", shell::quote(LOCALE_CONF_LINE)?);

    Ok(vec![
        ProvisioningStep::exec("host-hostname", "Set live hostname", Phase::Host, "hostnamectl", &["set-hostname", "--", hostname]),
        ProvisioningStep::exec("host-user", format!("Create user {}", username), Phase::Host, "useradd", &["-m", "-G", "wheel", "--", username])
            .skip_if(Probe::CommandSucceeds {
                program: "id".to_string(),
                args: vec!["-u".to_string(), "--".to_string(), username.to_string()],
            }),
        ProvisioningStep::exec("host-root-password", "Set root password", Phase::Host, "chpasswd", &[])
            .with_stdin(format!("root:{}\n", config.root_password())),
        ProvisioningStep::exec("host-user-password", format!("Set password for {}", username), Phase::Host, "chpasswd", &[])
            .with_stdin(format!("{}:{}\n", username, config.user_password())),
        ProvisioningStep::exec("host-timezone", format!("Link timezone {}", config.timezone()), Phase::Host, "ln", &["-sf", &zoneinfo, "/etc/localtime"]),
        ProvisioningStep::exec("host-hwclock", "Sync hardware clock", Phase::Host, "hwclock", &["--systohc"]),
        ProvisioningStep::script("host-locale-entry", "Enable en_US.UTF-8 in locale.gen", Phase::Host, locale_script)
            .skip_if(Probe::FileContainsLine {
                path: PathBuf::from("/etc/locale.gen"),
                line: LOCALE_GEN_LINE.to_string(),
            }),
        ProvisioningStep::exec("host-locale-gen", "Generate locales", Phase::Host, "locale-gen", &[]),
        ProvisioningStep::script("host-locale-conf", "Write locale.conf", Phase::Host, locale_conf_script),
    ])
}

fn disk_steps(layout: &PartitionLayout, target: &Target) -> Vec<ProvisioningStep> {
    let disk = target.disk.to_string_lossy();
    let table = layout.table.to_string();
    let mut steps = vec![
        ProvisioningStep::exec(
            "disk-mklabel",
            format!("Write {} partition table to {}", table, disk),
            Phase::Disk,
            "parted",
            &[&disk, "--script", "mklabel", &table],
        )
        .fatal(),
    ];

    for spec in &layout.specs {
        let fs = spec.filesystem.to_string();
        let (start, end) = (spec.start.to_string(), spec.end.to_string());
        steps.push(
            ProvisioningStep::exec(
                format!("disk-mkpart-{}", spec.number),
                format!("Create partition {} ({} {}–{})", spec.number, fs, start, end),
                Phase::Disk,
                "parted",
                &[&disk, "--script", "mkpart", "primary", &fs, &start, &end],
            )
            .fatal(),
        );
    }

    for spec in &layout.specs {
        let number = spec.number.to_string();
        for flag in &spec.flags {
            let flag = flag.to_string();
            steps.push(
                ProvisioningStep::exec(
                    format!("disk-flag-{}-{}", spec.number, flag),
                    format!("Set {} flag on partition {}", flag, spec.number),
                    Phase::Disk,
                    "parted",
                    &[&disk, "--script", "set", &number, &flag, "on"],
                )
                .fatal(),
            );
        }
    }

    for spec in &layout.specs {
        let device = partition_path(&target.disk, spec.number);
        let device = device.to_string_lossy();
        let (program, fixed) = spec.filesystem.mkfs_command();
        let mut args: Vec<&str> = fixed.to_vec();
        args.push(&device);
        steps.push(
            ProvisioningStep::exec(
                format!("disk-mkfs-{}", spec.number),
                format!("Format {} as {}", device, spec.filesystem),
                Phase::Disk,
                program,
                &args,
            )
            .fatal(),
        );
    }

    for spec in layout.mount_order() {
        steps.extend(mount_steps(spec, target));
    }
    steps
}

fn mount_steps(spec: &PartitionSpec, target: &Target) -> Vec<ProvisioningStep> {
    let device = partition_path(&target.disk, spec.number);
    let device = device.to_string_lossy();
    let mount_target = spec.mount_target(&target.root);
    let mount_str = mount_target.to_string_lossy();
    let slug = mount_slug(spec);

    let mut steps = Vec::new();
    if !spec.is_root() {
        steps.push(
            ProvisioningStep::exec(
                format!("disk-mkdir-{}", slug),
                format!("Create mount point {}", mount_str),
                Phase::Disk,
                "mkdir",
                &["-p", &mount_str],
            )
            .fatal()
            .skip_if(Probe::PathExists(mount_target.clone())),
        );
    }
    steps.push(
        ProvisioningStep::exec(
            format!("disk-mount-{}", slug),
            format!("Mount {} at {}", device, mount_str),
            Phase::Disk,
            "mount",
            &[&device, &mount_str],
        )
        .fatal()
        .skip_if(Probe::IsMountPoint(mount_target.clone())),
    );
    steps
}

fn swap_steps(target: &Target, ram_mib: u64) -> Vec<ProvisioningStep> {
    let swapfile = target.swapfile();
    let path = swapfile.to_string_lossy();
    let size = format!("{}M", ram_mib + SWAP_HEADROOM_MIB);

    vec![
        ProvisioningStep::exec("swap-allocate", format!("Allocate {} swap file", size), Phase::Swap, "fallocate", &["-l", &size, &path])
            .skip_if(Probe::PathExists(swapfile.clone())),
        ProvisioningStep::exec("swap-chmod", "Restrict swap file permissions", Phase::Swap, "chmod", &["600", &path]),
        ProvisioningStep::exec("swap-mkswap", "Format swap file", Phase::Swap, "mkswap", &[&path])
            .skip_if(Probe::SwapActive(swapfile.clone())),
        ProvisioningStep::exec("swap-on", "Activate swap file", Phase::Swap, "swapon", &[&path])
            .skip_if(Probe::SwapActive(swapfile.clone())),
    ]
}

fn bootstrap_steps(target: &Target) -> Result<Vec<ProvisioningStep>> {
    let root = target.root.to_string_lossy();
    let mut pacstrap_args: Vec<&str> = vec![root.as_ref()];
    pacstrap_args.extend_from_slice(BASE_PACKAGES);

    let genfstab = format!(
        "set -euo pipefail\ngenfstab -U {} >> {}\n",
        shell::quote_field("Target root", &root)?,
        shell::quote_field("fstab path", &target.fstab().to_string_lossy())?
    );

    Ok(vec![
        ProvisioningStep::exec("bootstrap-pacstrap", "Install the base system", Phase::Bootstrap, "pacstrap", &pacstrap_args)
            .fatal(),
        ProvisioningStep::script("fstab-generate", "Generate /etc/fstab", Phase::Fstab, genfstab).fatal(),
    ])
}

fn teardown_steps(layout: &PartitionLayout, target: &Target) -> Vec<ProvisioningStep> {
    let swapfile = target.swapfile();
    let mut steps = vec![ProvisioningStep::exec(
        "teardown-swapoff",
        "Deactivate swap file",
        Phase::Teardown,
        "swapoff",
        &[&swapfile.to_string_lossy()],
    )];

    for spec in layout.unmount_order() {
        let mount_target = spec.mount_target(&target.root);
        steps.push(ProvisioningStep::exec(
            format!("teardown-umount-{}", mount_slug(spec)),
            format!("Unmount {}", mount_target.display()),
            Phase::Teardown,
            "umount",
            &[&mount_target.to_string_lossy()],
        ));
    }
    steps
}

/// `/` → `root`, `/boot/efi` → `boot-efi`
fn mount_slug(spec: &PartitionSpec) -> String {
    if spec.is_root() {
        "root".to_string()
    } else {
        spec.mount_point.trim_matches('/').replace('/', "-")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationDraft, SshSettings};
    use crate::types::PartitionType;

    fn config(partition_type: PartitionType, auto_reboot: bool) -> Configuration {
        ConfigurationDraft {
            hostname: "archbox".to_string(),
            username: "alice".to_string(),
            root_password: "rootpw".to_string(),
            user_password: "userpw".to_string(),
            timezone: "Europe/London".to_string(),
            partition_type: Some(partition_type),
            auto_reboot,
            ssh: Some(SshSettings::default()),
            software: vec!["git".to_string()],
        }
        .finalize()
        .expect("valid test configuration") // test: known-good input
    }

    fn ids(plan: &ProvisioningPlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_efi_disk_sequence() {
        let plan = build_plan(&config(PartitionType::Efi, false), &Target::default(), 4096).unwrap();
        let disk: Vec<&str> = plan
            .steps
            .iter()
            .filter(|s| s.phase == Phase::Disk)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(
            disk,
            vec![
                "disk-mklabel",
                "disk-mkpart-1",
                "disk-mkpart-2",
                "disk-flag-1-esp",
                "disk-mkfs-1",
                "disk-mkfs-2",
                "disk-mount-root",
                "disk-mkdir-boot-efi",
                "disk-mount-boot-efi",
            ]
        );
        assert!(plan.steps.iter().filter(|s| s.phase == Phase::Disk).all(|s| s.fatal));
    }

    #[test]
    fn test_user_values_follow_end_of_options() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 1024).unwrap();
        assert_eq!(
            plan.step("host-hostname").unwrap().action.command_line(),
            "hostnamectl set-hostname -- archbox"
        );
        let user = plan.step("host-user").unwrap();
        assert_eq!(user.action.command_line(), "useradd -m -G wheel -- alice");
        assert_eq!(
            user.skip_if,
            Some(Probe::CommandSucceeds {
                program: "id".to_string(),
                args: vec!["-u".to_string(), "--".to_string(), "alice".to_string()],
            })
        );
    }

    #[test]
    fn test_mbr_uses_msdos_label() {
        let plan = build_plan(&config(PartitionType::Mbr, false), &Target::default(), 1024).unwrap();
        let mklabel = plan.step("disk-mklabel").unwrap();
        assert_eq!(mklabel.action.command_line(), "parted /dev/sda --script mklabel msdos");
        assert!(plan.step("disk-flag-1-esp").is_none());
        assert_eq!(plan.bootloader, BootloaderTarget::I386Pc);
    }

    #[test]
    fn test_mkfs_commands_target_partitions() {
        let target = Target::new("/dev/nvme0n1", "/mnt");
        let plan = build_plan(&config(PartitionType::Efi, false), &target, 1024).unwrap();
        assert_eq!(plan.step("disk-mkfs-1").unwrap().action.command_line(), "mkfs.fat -F32 /dev/nvme0n1p1");
        assert_eq!(plan.step("disk-mkfs-2").unwrap().action.command_line(), "mkfs.ext4 -F /dev/nvme0n1p2");
        assert_eq!(
            plan.step("disk-mount-boot-efi").unwrap().action.command_line(),
            "mount /dev/nvme0n1p1 /mnt/boot/efi"
        );
    }

    #[test]
    fn test_swap_sized_from_ram() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 8000).unwrap();
        assert_eq!(
            plan.step("swap-allocate").unwrap().action.command_line(),
            "fallocate -l 10048M /mnt/swapfile"
        );
        assert!(plan.steps.iter().filter(|s| s.phase == Phase::Swap).all(|s| !s.fatal));
    }

    #[test]
    fn test_phase_order_is_monotonic() {
        let plan = build_plan(&config(PartitionType::Efi, true), &Target::default(), 2048).unwrap();
        let phases: Vec<Phase> = plan.steps.iter().map(|s| s.phase).collect();
        let mut sorted = phases.clone();
        sorted.sort();
        assert_eq!(phases, sorted);
    }

    #[test]
    fn test_exactly_one_chroot_step() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 2048).unwrap();
        let chroot: Vec<&ProvisioningStep> = plan
            .steps
            .iter()
            .filter(|s| s.context == ExecutionContext::Chroot)
            .collect();
        assert_eq!(chroot.len(), 1);
        assert!(chroot[0].fatal);
        assert!(matches!(chroot[0].action, StepAction::Script { .. }));
    }

    #[test]
    fn test_reboot_only_when_requested() {
        let without = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 2048).unwrap();
        assert!(without.step("reboot").is_none());

        let with = build_plan(&config(PartitionType::Gpt, true), &Target::default(), 2048).unwrap();
        assert_eq!(ids(&with).last(), Some(&"reboot"));
    }

    #[test]
    fn test_unmount_deepest_first() {
        let plan = build_plan(&config(PartitionType::Efi, false), &Target::default(), 2048).unwrap();
        let swapoff = plan.position("teardown-swapoff").unwrap();
        let esp = plan.position("teardown-umount-boot-efi").unwrap();
        let root = plan.position("teardown-umount-root").unwrap();
        assert!(swapoff < esp);
        assert!(esp < root);
    }

    #[test]
    fn test_passwords_only_on_stdin() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 2048).unwrap();
        for step in plan.steps.iter().filter(|s| s.context == ExecutionContext::Host) {
            if let StepAction::Exec { args, .. } = &step.action {
                assert!(!args.iter().any(|a| a.contains("rootpw") || a.contains("userpw")));
            }
        }
        match &plan.step("host-root-password").unwrap().action {
            StepAction::Exec { stdin, .. } => assert_eq!(stdin.as_deref(), Some("root:rootpw\n")),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_secrets() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 2048).unwrap();
        let debug = format!("{:?}", plan.steps);
        assert!(!debug.contains("rootpw"));
        assert!(!debug.contains("userpw"));
    }

    #[test]
    fn test_invalid_disk_rejected_before_any_step() {
        let err = build_plan(&config(PartitionType::Gpt, false), &Target::new("sda", "/mnt"), 2048).unwrap_err();
        assert!(err.is_validation());
        let err = build_plan(&config(PartitionType::Gpt, false), &Target::new("/dev/sda", "/"), 2048).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_user_creation_is_probed() {
        let plan = build_plan(&config(PartitionType::Gpt, false), &Target::default(), 2048).unwrap();
        assert_eq!(
            plan.step("host-user").unwrap().skip_if,
            Some(Probe::CommandSucceeds {
                program: "id".to_string(),
                args: vec!["-u".to_string(), "alice".to_string()],
            })
        );
        assert!(plan.step("fstab-generate").unwrap().skip_if.is_none());
    }
}
