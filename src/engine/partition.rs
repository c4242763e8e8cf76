//! Partition Strategy Engine
//!
//! Maps a `PartitionType` onto a concrete `PartitionLayout`: the table label
//! plus an ordered list of partitions with their bounds, filesystems, mount
//! points and flags.
//!
//! | Type | Label  | Partitions |
//! |------|--------|------------|
//! | MBR  | msdos  | 1: ext4 1MiB–100% → / |
//! | GPT  | gpt    | 1: ext4 1MiB–100% → / |
//! | EFI  | gpt    | 1: fat32 1MiB–512MiB [esp] → /boot/efi, 2: ext4 512MiB–100% → / |
//!
//! Pure logic. No I/O happens here; the plan builder turns the layout into
//! `parted`/`mkfs`/`mount` steps.

use crate::error::{ProvisionError, Result};
use crate::types::{Filesystem, PartitionTable, PartitionType};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Start of the first partition, aligned for modern disks
pub const FIRST_PARTITION_START_MIB: u64 = 1;

/// End of the EFI System Partition
pub const ESP_END_MIB: u64 = 512;

/// Mount point of the root filesystem, relative to the target root
pub const ROOT_MOUNT: &str = "/";

/// Mount point of the ESP, relative to the target root
pub const ESP_MOUNT: &str = "/boot/efi";

// ============================================================================
// Layout Types
// ============================================================================

/// A partition boundary as understood by `parted mkpart`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Boundary {
    Mib(u64),
    Percent(u8),
}

impl Boundary {
    /// Whether this boundary lies strictly before `other` on the disk.
    ///
    /// Percentage boundaries are only ever used for the tail of the disk, so
    /// any absolute offset is considered to precede them.
    fn precedes(&self, other: &Boundary) -> bool {
        match (self, other) {
            (Self::Mib(a), Self::Mib(b)) => a < b,
            (Self::Percent(a), Self::Percent(b)) => a < b,
            (Self::Mib(_), Self::Percent(_)) => true,
            (Self::Percent(_), Self::Mib(_)) => false,
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mib(n) => write!(f, "{}MiB", n),
            Self::Percent(p) => write!(f, "{}%", p),
        }
    }
}

/// Partition flag set with `parted set N <flag> on`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PartitionFlag {
    Esp,
}

/// One partition in the layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSpec {
    /// 1-based partition number
    pub number: u32,
    pub start: Boundary,
    pub end: Boundary,
    pub filesystem: Filesystem,
    /// Absolute path inside the installed system (`/`, `/boot/efi`)
    pub mount_point: String,
    pub flags: Vec<PartitionFlag>,
}

impl PartitionSpec {
    pub fn has_flag(&self, flag: PartitionFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_esp(&self) -> bool {
        self.has_flag(PartitionFlag::Esp)
    }

    pub fn is_root(&self) -> bool {
        self.mount_point == ROOT_MOUNT
    }

    /// Where this partition is mounted on the live system, below `root`
    pub fn mount_target(&self, root: &Path) -> PathBuf {
        let relative = self.mount_point.trim_start_matches('/');
        if relative.is_empty() {
            root.to_path_buf()
        } else {
            root.join(relative)
        }
    }

    /// Number of path components below the target root; root itself is 0
    pub fn mount_depth(&self) -> usize {
        Path::new(&self.mount_point)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }
}

impl fmt::Display for PartitionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}–{} → {}",
            self.number, self.filesystem, self.start, self.end, self.mount_point
        )?;
        for flag in &self.flags {
            write!(f, " [{}]", flag)?;
        }
        Ok(())
    }
}

/// Complete disk layout for one partition type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionLayout {
    pub partition_type: PartitionType,
    pub table: PartitionTable,
    pub specs: Vec<PartitionSpec>,
}

impl PartitionLayout {
    /// Layout for a partition type. The result always passes `validate`.
    pub fn for_type(partition_type: PartitionType) -> Self {
        match partition_type {
            PartitionType::Mbr => single_root(partition_type, PartitionTable::Msdos),
            PartitionType::Gpt => single_root(partition_type, PartitionTable::Gpt),
            PartitionType::Efi => esp_and_root(),
        }
    }

    /// Layout for a user-facing partition type label (`DOS (MBR)`, `GPT`, `EFI`).
    pub fn for_label(label: &str) -> Result<Self> {
        let partition_type = PartitionType::from_str(label.trim()).map_err(|_| {
            ProvisionError::layout(format!("Unknown partition type '{}'", label.trim()))
        })?;
        let layout = Self::for_type(partition_type);
        layout.validate()?;
        Ok(layout)
    }

    /// The partition mounted at `/`
    pub fn root(&self) -> Option<&PartitionSpec> {
        self.specs.iter().find(|s| s.is_root())
    }

    pub fn esp(&self) -> Option<&PartitionSpec> {
        self.specs.iter().find(|s| s.is_esp())
    }

    /// Specs in mount order: shallowest mount point first, so `/` is mounted
    /// before anything that lives below it.
    pub fn mount_order(&self) -> Vec<&PartitionSpec> {
        let mut specs: Vec<&PartitionSpec> = self.specs.iter().collect();
        specs.sort_by_key(|s| (s.mount_depth(), s.number));
        specs
    }

    /// Specs in unmount order: deepest mount point first.
    pub fn unmount_order(&self) -> Vec<&PartitionSpec> {
        let mut specs = self.mount_order();
        specs.reverse();
        specs
    }

    /// Check the layout's structural invariants.
    ///
    /// - partitions numbered 1..=n in order
    /// - first partition starts at 1MiB, each one starts where the previous ended,
    ///   the last ends at 100%
    /// - exactly one root mount, no duplicate mount points
    /// - at most one `esp` partition, only for EFI, FAT32, at /boot/efi
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(ProvisionError::layout("Layout has no partitions"));
        }

        let mut previous_end: Option<Boundary> = None;
        for (index, spec) in self.specs.iter().enumerate() {
            let expected = index as u32 + 1;
            if spec.number != expected {
                return Err(ProvisionError::layout(format!(
                    "Partition #{} is out of order (expected #{})",
                    spec.number, expected
                )));
            }
            match previous_end {
                None if spec.start != Boundary::Mib(FIRST_PARTITION_START_MIB) => {
                    return Err(ProvisionError::layout(format!(
                        "First partition must start at {}MiB, not {}",
                        FIRST_PARTITION_START_MIB, spec.start
                    )));
                }
                Some(end) if spec.start != end => {
                    return Err(ProvisionError::layout(format!(
                        "Partition #{} starts at {} but the previous one ends at {}",
                        spec.number, spec.start, end
                    )));
                }
                _ => {}
            }
            if !spec.start.precedes(&spec.end) {
                return Err(ProvisionError::layout(format!(
                    "Partition #{} is empty ({}–{})",
                    spec.number, spec.start, spec.end
                )));
            }
            previous_end = Some(spec.end);
        }

        if previous_end != Some(Boundary::Percent(100)) {
            return Err(ProvisionError::layout("Last partition must extend to 100%"));
        }

        let roots = self.specs.iter().filter(|s| s.is_root()).count();
        if roots != 1 {
            return Err(ProvisionError::layout(format!(
                "Layout needs exactly one root partition, found {}",
                roots
            )));
        }
        for (i, spec) in self.specs.iter().enumerate() {
            if self.specs[..i].iter().any(|s| s.mount_point == spec.mount_point) {
                return Err(ProvisionError::layout(format!(
                    "Mount point {} is used twice",
                    spec.mount_point
                )));
            }
        }

        let esps: Vec<&PartitionSpec> = self.specs.iter().filter(|s| s.is_esp()).collect();
        match (self.partition_type, esps.as_slice()) {
            (PartitionType::Efi, [esp]) => {
                if self.table != PartitionTable::Gpt {
                    return Err(ProvisionError::layout("EFI layout requires a gpt label"));
                }
                if esp.filesystem != Filesystem::Fat32 || esp.mount_point != ESP_MOUNT {
                    return Err(ProvisionError::layout(format!(
                        "ESP must be fat32 mounted at {}",
                        ESP_MOUNT
                    )));
                }
            }
            (PartitionType::Efi, _) => {
                return Err(ProvisionError::layout(format!(
                    "EFI layout needs exactly one esp partition, found {}",
                    esps.len()
                )));
            }
            (other, []) => {
                let expected = match other {
                    PartitionType::Mbr => PartitionTable::Msdos,
                    _ => PartitionTable::Gpt,
                };
                if self.table != expected {
                    return Err(ProvisionError::layout(format!(
                        "{} layout requires a {} label",
                        other, expected
                    )));
                }
            }
            (other, _) => {
                return Err(ProvisionError::layout(format!(
                    "esp flag is only valid on EFI layouts, not {}",
                    other
                )));
            }
        }

        Ok(())
    }

    /// Returns a summary of the layout for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Partition layout: {} ({})", self.partition_type, self.table)];
        for spec in &self.specs {
            lines.push(format!("  {}", spec));
        }
        lines.join("\n")
    }
}

fn single_root(partition_type: PartitionType, table: PartitionTable) -> PartitionLayout {
    PartitionLayout {
        partition_type,
        table,
        specs: vec![PartitionSpec {
            number: 1,
            start: Boundary::Mib(FIRST_PARTITION_START_MIB),
            end: Boundary::Percent(100),
            filesystem: Filesystem::Ext4,
            mount_point: ROOT_MOUNT.to_string(),
            flags: vec![],
        }],
    }
}

fn esp_and_root() -> PartitionLayout {
    PartitionLayout {
        partition_type: PartitionType::Efi,
        table: PartitionTable::Gpt,
        specs: vec![
            PartitionSpec {
                number: 1,
                start: Boundary::Mib(FIRST_PARTITION_START_MIB),
                end: Boundary::Mib(ESP_END_MIB),
                filesystem: Filesystem::Fat32,
                mount_point: ESP_MOUNT.to_string(),
                flags: vec![PartitionFlag::Esp],
            },
            PartitionSpec {
                number: 2,
                start: Boundary::Mib(ESP_END_MIB),
                end: Boundary::Percent(100),
                filesystem: Filesystem::Ext4,
                mount_point: ROOT_MOUNT.to_string(),
                flags: vec![],
            },
        ],
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Partition device path from a disk path and partition number.
///
/// Handles both `/dev/sdX` → `/dev/sdX1` and `/dev/nvme0n1` → `/dev/nvme0n1p1`.
pub fn partition_path(disk: &Path, number: u32) -> PathBuf {
    let disk = disk.display().to_string();

    // Disks whose name ends in a digit (nvme, mmcblk, loop) use a 'p' separator
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{}p{}", disk, number))
    } else {
        PathBuf::from(format!("{}{}", disk, number))
    }
}

// ============================================================================
// Tests
// ============================================================================
