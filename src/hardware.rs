//! Host environment facts
//!
//! Firmware mode (UEFI vs BIOS) and installed RAM. RAM sizes the swap file;
//! firmware mode only produces a warning when the chosen partition type
//! cannot boot on this machine. Detection never fails: it logs and falls
//! back to safe values.

use crate::types::PartitionType;
use std::fmt;
use std::path::Path;
use sysinfo::System;

const EFI_SYSFS: &str = "/sys/firmware/efi";

/// Firmware the live system booted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareMode {
    Uefi,
    Bios,
}

impl FirmwareMode {
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }
}

impl fmt::Display for FirmwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uefi => write!(f, "UEFI"),
            Self::Bios => write!(f, "BIOS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    pub firmware: FirmwareMode,
    /// Total installed memory in MiB
    pub ram_mib: u64,
}

impl HostInfo {
    pub fn detect() -> Self {
        let info = Self {
            firmware: detect_firmware_mode(),
            ram_mib: detect_ram_mib(),
        };
        tracing::info!(firmware = %info.firmware, ram_mib = info.ram_mib, "host detected");
        info
    }

    /// Warning shown before confirmation when `partition_type` will not boot
    /// with this firmware. None when compatible.
    pub fn boot_warning(&self, partition_type: PartitionType) -> Option<String> {
        match (partition_type.bootloader_target().is_efi(), self.firmware) {
            (true, FirmwareMode::Bios) => Some(
                "EFI layout selected but this machine booted in BIOS mode; grub-install will fail"
                    .to_string(),
            ),
            (false, FirmwareMode::Uefi) => Some(format!(
                "{} layout installs a BIOS bootloader but this machine booted in UEFI mode",
                partition_type
            )),
            _ => None,
        }
    }
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Firmware: {}, RAM: {} MiB", self.firmware, self.ram_mib)
    }
}

/// The kernel exposes /sys/firmware/efi only when booted through UEFI.
pub fn detect_firmware_mode() -> FirmwareMode {
    firmware_mode_at(Path::new(EFI_SYSFS))
}

fn firmware_mode_at(efi_path: &Path) -> FirmwareMode {
    if efi_path.exists() {
        FirmwareMode::Uefi
    } else {
        FirmwareMode::Bios
    }
}

/// Total RAM in MiB. 0 if the kernel reports nothing.
pub fn detect_ram_mib() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    let mib = sys.total_memory() / (1024 * 1024);
    if mib == 0 {
        tracing::warn!("could not determine installed RAM, swap file will be 2048 MiB");
    }
    mib
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware_mode_from_path() {
        let dir = tempfile::tempdir().expect("tempdir"); // test: tmpfs available
        assert_eq!(firmware_mode_at(dir.path()), FirmwareMode::Uefi);
        assert_eq!(firmware_mode_at(&dir.path().join("missing")), FirmwareMode::Bios);
    }

    #[test]
    fn test_boot_warning_matrix() {
        let bios = HostInfo { firmware: FirmwareMode::Bios, ram_mib: 2048 };
        let uefi = HostInfo { firmware: FirmwareMode::Uefi, ram_mib: 2048 };

        assert!(bios.boot_warning(PartitionType::Efi).is_some());
        assert!(bios.boot_warning(PartitionType::Mbr).is_none());
        assert!(uefi.boot_warning(PartitionType::Efi).is_none());
        assert!(uefi.boot_warning(PartitionType::Gpt).is_some());
    }

    #[test]
    fn test_detect_ram_is_plausible() {
        // Any machine running the test suite has at least some RAM
        assert!(detect_ram_mib() > 0);
    }

    #[test]
    fn test_host_info_display() {
        let info = HostInfo { firmware: FirmwareMode::Uefi, ram_mib: 4096 };
        assert_eq!(info.to_string(), "Firmware: UEFI, RAM: 4096 MiB");
    }
}
