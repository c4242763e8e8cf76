//! Type-safe domain enums for archprov
//!
//! User-facing choices are enums rather than strings so that every match is
//! exhaustive. The `strum` serializations double as the labels shown in the
//! wizard's selection lists.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// Partition table strategy chosen in the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum PartitionType {
    /// Single ext4 partition under an msdos label
    #[strum(to_string = "DOS (MBR)", serialize = "MBR")]
    Mbr,
    /// Single ext4 partition under a gpt label
    #[strum(serialize = "GPT")]
    Gpt,
    /// FAT32 ESP plus ext4 root under a gpt label
    #[strum(serialize = "EFI")]
    Efi,
}

impl PartitionType {
    /// Short description shown next to the label in the wizard
    pub fn description(&self) -> &'static str {
        match self {
            Self::Mbr => "Master Boot Record",
            Self::Gpt => "GUID Partition Table",
            Self::Efi => "Extensible Firmware Interface",
        }
    }

    /// Bootloader install mode implied by the partition type
    pub fn bootloader_target(&self) -> BootloaderTarget {
        match self {
            Self::Efi => BootloaderTarget::X86_64Efi,
            Self::Mbr | Self::Gpt => BootloaderTarget::I386Pc,
        }
    }
}

/// Filesystem created on a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Filesystem {
    #[strum(serialize = "ext4")]
    Ext4,
    /// FAT32 filesystem for the EFI System Partition
    #[strum(serialize = "fat32")]
    Fat32,
}

impl Filesystem {
    /// Formatting command and its fixed arguments (device is appended)
    pub fn mkfs_command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            // -F: do not prompt when an old signature is found
            Self::Ext4 => ("mkfs.ext4", &["-F"]),
            Self::Fat32 => ("mkfs.fat", &["-F32"]),
        }
    }
}

/// Partition table label written by `parted mklabel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PartitionTable {
    Msdos,
    Gpt,
}

/// GRUB install target selected from the partition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum BootloaderTarget {
    #[strum(serialize = "x86_64-efi")]
    X86_64Efi,
    #[strum(serialize = "i386-pc")]
    I386Pc,
}

impl BootloaderTarget {
    /// Returns true for the EFI install mode
    pub fn is_efi(&self) -> bool {
        matches!(self, Self::X86_64Efi)
    }
}

/// Where a provisioning step executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionContext {
    /// The live installation environment
    Host,
    /// Inside the newly bootstrapped root via arch-chroot
    Chroot,
}

/// Generic Yes/No toggle for boolean-like wizard choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Toggle {
    #[default]
    #[strum(serialize = "Yes")]
    Yes,
    #[strum(serialize = "No")]
    No,
}

impl Toggle {
    /// Convert to boolean
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}
