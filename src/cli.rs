use crate::command_runner::DEFAULT_COMMAND_TIMEOUT;
use crate::engine::Target;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// archprov - interactive Arch Linux provisioning
#[derive(Parser, Debug)]
#[command(name = "archprov")]
#[command(about = "Collects an installation configuration and provisions Arch Linux onto a disk")]
#[command(version)]
pub struct Cli {
    /// Target block device. Everything on it is destroyed.
    #[arg(long, default_value = "/dev/sda", value_parser = parse_disk)]
    pub disk: PathBuf,

    /// Mount point of the target root filesystem
    #[arg(long, default_value = "/mnt")]
    pub root: PathBuf,

    /// Dry-run mode: log every step instead of executing it.
    ///
    /// The wizard and the progress screen behave exactly as in a real run,
    /// which makes this useful for checking a configuration on any machine.
    #[arg(long)]
    pub dry_run: bool,

    /// Seconds to wait for a single external command before killing it
    #[arg(long, default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub command_timeout: u64,

    /// Log file. The TUI owns the terminal, so logs never go to stdout.
    #[arg(long, default_value = "archprov.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    pub fn target(&self) -> Target {
        Target::new(&self.disk, &self.root)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

fn parse_disk(value: &str) -> Result<PathBuf, String> {
    let trimmed = value.trim();
    match trimmed.strip_prefix("/dev/") {
        Some(name) if !name.is_empty() => Ok(PathBuf::from(trimmed)),
        _ => Err(format!("'{}' is not a device path (expected /dev/...)", value)),
    }
}
