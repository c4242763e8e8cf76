//! Partition strategy layouts and their invariants

use archprov::engine::partition::{Boundary, PartitionFlag, ESP_MOUNT, ROOT_MOUNT};
use archprov::engine::{partition_path, PartitionLayout};
use archprov::error::ProvisionError;
use archprov::types::{Filesystem, PartitionTable, PartitionType};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

#[test]
fn test_efi_layout_has_esp_then_root() {
    let layout = PartitionLayout::for_type(PartitionType::Efi);
    assert_eq!(layout.table, PartitionTable::Gpt);
    assert_eq!(layout.specs.len(), 2);

    let esp_count = layout.specs.iter().filter(|s| s.has_flag(PartitionFlag::Esp)).count();
    assert_eq!(esp_count, 1);

    let esp = layout.esp().expect("EFI layout has an ESP");
    let root = layout.root().expect("EFI layout has a root");
    assert_eq!(esp.end, root.start);
    assert_eq!(esp.start, Boundary::Mib(1));
    assert_eq!(esp.end, Boundary::Mib(512));
    assert_eq!(root.end, Boundary::Percent(100));
    assert_eq!(esp.filesystem, Filesystem::Fat32);
    assert_eq!(esp.mount_point, ESP_MOUNT);
    assert_eq!(root.filesystem, Filesystem::Ext4);
}

#[test]
fn test_single_partition_layouts() {
    for (partition_type, table) in [
        (PartitionType::Mbr, PartitionTable::Msdos),
        (PartitionType::Gpt, PartitionTable::Gpt),
    ] {
        let layout = PartitionLayout::for_type(partition_type);
        assert_eq!(layout.table, table);
        assert_eq!(layout.specs.len(), 1);
        let root = &layout.specs[0];
        assert_eq!(root.mount_point, ROOT_MOUNT);
        assert_eq!(root.start, Boundary::Mib(1));
        assert_eq!(root.end, Boundary::Percent(100));
        assert!(root.flags.is_empty());
        assert!(layout.esp().is_none());
    }
}

#[test]
fn test_every_stock_layout_validates() {
    for partition_type in PartitionType::iter() {
        PartitionLayout::for_type(partition_type)
            .validate()
            .unwrap_or_else(|e| panic!("{} layout invalid: {}", partition_type, e));
    }
}

#[test]
fn test_layout_by_label() {
    assert_eq!(
        PartitionLayout::for_label("EFI").unwrap().partition_type,
        PartitionType::Efi
    );
    assert_eq!(
        PartitionLayout::for_label("DOS (MBR)").unwrap().partition_type,
        PartitionType::Mbr
    );
    let err = PartitionLayout::for_label("LVM").unwrap_err();
    assert!(matches!(err, ProvisionError::Layout(_)));
}

#[test]
fn test_gap_between_partitions_rejected() {
    let mut layout = PartitionLayout::for_type(PartitionType::Efi);
    layout.specs[1].start = Boundary::Mib(600);
    assert!(matches!(layout.validate(), Err(ProvisionError::Layout(_))));
}

#[test]
fn test_esp_outside_efi_rejected() {
    let mut layout = PartitionLayout::for_type(PartitionType::Gpt);
    layout.specs[0].flags.push(PartitionFlag::Esp);
    assert!(layout.validate().is_err());
}

#[test]
fn test_mount_and_unmount_order() {
    let layout = PartitionLayout::for_type(PartitionType::Efi);
    let mounts: Vec<&str> = layout.mount_order().iter().map(|s| s.mount_point.as_str()).collect();
    assert_eq!(mounts, [ROOT_MOUNT, ESP_MOUNT]);
    let unmounts: Vec<&str> = layout.unmount_order().iter().map(|s| s.mount_point.as_str()).collect();
    assert_eq!(unmounts, [ESP_MOUNT, ROOT_MOUNT]);
}

#[test]
fn test_mount_targets_below_root() {
    let layout = PartitionLayout::for_type(PartitionType::Efi);
    let root = Path::new("/mnt");
    assert_eq!(layout.root().unwrap().mount_target(root), PathBuf::from("/mnt"));
    assert_eq!(layout.esp().unwrap().mount_target(root), PathBuf::from("/mnt/boot/efi"));
}

#[test]
fn test_partition_device_paths() {
    assert_eq!(partition_path(Path::new("/dev/sda"), 1), PathBuf::from("/dev/sda1"));
    assert_eq!(partition_path(Path::new("/dev/vdb"), 2), PathBuf::from("/dev/vdb2"));
    assert_eq!(partition_path(Path::new("/dev/nvme0n1"), 2), PathBuf::from("/dev/nvme0n1p2"));
    assert_eq!(partition_path(Path::new("/dev/mmcblk0"), 1), PathBuf::from("/dev/mmcblk0p1"));
}
