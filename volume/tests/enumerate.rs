use std::sync::Arc;

use block_dev::{BlockDevice, BlockError, MemDisk, SECTOR_SIZE};
use volume::mbr::{self, PTBL, PTBL_ENTRY_SIZE, SIGNATURE};
use volume::table::{self, PartitionParams, SizeUnit};
use volume::{Error, VolumeKind, VolumeManager};

fn put_entry(disk: &MemDisk, slot: usize, active: u8, kind: u8, lba: u32, count: u32) {
    let base = PTBL + slot * PTBL_ENTRY_SIZE;
    disk.patch(base, &[active]);
    disk.patch(base + 4, &[kind]);
    disk.patch(base + 8, &lba.to_le_bytes());
    disk.patch(base + 12, &count.to_le_bytes());
}

fn sign(disk: &MemDisk) {
    disk.patch(SIGNATURE, &[0x55, 0xAA]);
}

#[test]
fn two_active_entries_then_zeroed_slot() {
    let disk = Arc::new(MemDisk::new(8192));
    sign(&disk);
    put_entry(&disk, 0, 0x80, 0x83, 2048, 1024);
    put_entry(&disk, 1, 0x80, 0x0B, 0x0102_0304, 0x0A0B_0C0D);

    let entries = mbr::scan(disk.as_ref()).unwrap();
    assert_eq!(2, entries.len());
    assert_eq!((2048, 1024), (entries[0].start_lba, entries[0].sector_count));
    assert_eq!(0x0102_0304, entries[1].start_lba);
    assert_eq!(0x0A0B_0C0D, entries[1].sector_count);
    assert!(entries.iter().all(|e| e.active));
}

#[test]
fn superfloppy_is_one_whole_device_partition() {
    let disk = Arc::new(MemDisk::new(2880));
    disk.patch(0, &[0xEB, 0x3C, 0x90]);
    disk.patch(21, &[0xF0]);

    let entries = mbr::scan(disk.as_ref()).unwrap();
    assert_eq!(1, entries.len());
    assert_eq!(0, entries[0].start_lba);
    assert_eq!(2880, entries[0].sector_count);

    let dev: Arc<dyn BlockDevice> = disk;
    let volumes = volume::enumerate(&dev, "fd").unwrap();
    assert_eq!(1, volumes.len());
    assert_eq!("fd0", volumes[0].name());
}

#[test]
fn no_signature_means_unpartitioned() {
    let disk = Arc::new(MemDisk::new(128));
    assert!(mbr::scan(disk.as_ref()).unwrap().is_empty());

    let dev: Arc<dyn BlockDevice> = disk;
    let volumes = volume::enumerate(&dev, "ram").unwrap();
    assert_eq!(1, volumes.len());
    assert_eq!("ram", volumes[0].name());
    assert_eq!(VolumeKind::Whole, volumes[0].kind());
}

#[test]
fn gap_in_table_stops_the_scan() {
    let disk = Arc::new(MemDisk::new(8192));
    sign(&disk);
    put_entry(&disk, 1, 0x80, 0x83, 2048, 1024);

    assert!(mbr::scan(disk.as_ref()).unwrap().is_empty());
}

#[test]
fn partition_numbering_follows_slot_order() {
    let disk = Arc::new(MemDisk::new(8192));
    sign(&disk);
    put_entry(&disk, 0, 0x80, 0x83, 6000, 100);
    put_entry(&disk, 1, 0x00, 0x83, 3000, 100);

    let dev: Arc<dyn BlockDevice> = disk.clone();
    let volumes = volume::enumerate(&dev, "sd").unwrap();
    assert_eq!(vec!["sd0", "sd1"], volumes.iter().map(|v| v.name()).collect::<Vec<_>>());

    disk.patch(3000 * SECTOR_SIZE, b"second");
    let mut buf = [0u8; SECTOR_SIZE];
    volumes[1].read_blocks(0, 1, &mut buf).unwrap();
    assert_eq!(b"second", &buf[..6]);
    assert_eq!(Err(BlockError::OutOfRange), volumes[1].read_blocks(100, 1, &mut buf));
}

#[test]
fn scan_propagates_read_errors() {
    let disk = Arc::new(MemDisk::new(16));
    disk.set_fail_lba(Some(0));
    assert_eq!(Err(Error::Io(BlockError::Io)), mbr::scan(disk.as_ref()));
}

#[test]
fn written_table_is_enumerated() {
    let disk = Arc::new(MemDisk::new(20_480));
    let params = PartitionParams {
        sizes: vec![1, 3],
        unit: SizeUnit::Quota,
        hidden_sectors: 0,
    };
    let written = table::write_table(disk.as_ref(), &params).unwrap();
    assert_eq!(2, written.len());
    assert_eq!(4096, written[0].start_lba);
    assert_eq!(4096, written[0].sector_count);
    assert_eq!(8192, written[1].start_lba);
    assert_eq!(12_288, written[1].sector_count);

    let manager = VolumeManager::new();
    let dev: Arc<dyn BlockDevice> = disk;
    manager.enumerate(&dev, "mmc0").unwrap();
    assert_eq!(written, mbr::scan(dev.as_ref()).unwrap());

    let second = manager.get("mmc01").unwrap();
    assert_eq!(
        VolumeKind::Partition {
            base_lba: 8192,
            sector_count: 12_288
        },
        second.kind()
    );

    // 重新建立卷会替换旧的登记
    manager.enumerate(&dev, "mmc0").unwrap();
    assert_eq!(2, manager.volumes().len());
    assert!(manager.get("mmc02").is_none());
}
