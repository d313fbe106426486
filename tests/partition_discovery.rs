//! MBR partition discovery against a RAM-backed whole-disk `DeviceType`
//! (spec §4.3 steps 1-2).

mod common;

use common::RamDisk;
use embfs::lb::{DeviceType, IoctlCmd, IoctlResult};
use embfs::partition::PartitionDriver;

const BYTES_PER_SECTOR: u16 = 512;
const TOTAL_SECTORS: u32 = 4096;

fn mbr_sector(part_type: u8, start_lba: u32, num_sectors: u32) -> [u8; 512] {
    let mut sector = [0u8; 512];
    let off = 446;
    sector[off + 4] = part_type;
    sector[off + 8..off + 12].copy_from_slice(&start_lba.to_le_bytes());
    sector[off + 12..off + 16].copy_from_slice(&num_sectors.to_le_bytes());
    sector[510] = 0x55;
    sector[511] = 0xAA;
    sector
}

#[test]
fn discovers_fat32_partition_via_mbr() {
    let disk = RamDisk::new(BYTES_PER_SECTOR, TOTAL_SECTORS);
    disk.seed_sector0(&mbr_sector(0x0C, 64, 2000));

    let driver = PartitionDriver::new(&disk, 0, 0);
    let info = match driver.ioctl(0, IoctlCmd::GetDevInfo).unwrap() {
        IoctlResult::DevInfo(info) => info,
        other => panic!("unexpected ioctl result: {:?}", other),
    };
    assert_eq!(info.num_sectors, 2000);
    assert_eq!(info.bytes_per_sector, BYTES_PER_SECTOR);
}

#[test]
fn translates_sector_indices_relative_to_partition_start() {
    let disk = RamDisk::new(BYTES_PER_SECTOR, TOTAL_SECTORS);
    disk.seed_sector0(&mbr_sector(0x0C, 100, 500));

    let mut payload = [0u8; BYTES_PER_SECTOR as usize];
    payload[0] = 0xAB;
    disk.write(0, 100 + 5, &payload, 1, false).unwrap();

    let driver = PartitionDriver::new(&disk, 0, 0);
    let mut buf = [0u8; BYTES_PER_SECTOR as usize];
    driver.read(0, 5, &mut buf, 1).unwrap();
    assert_eq!(buf[0], 0xAB);
}

#[test]
fn out_of_range_partition_index_is_rejected() {
    let disk = RamDisk::new(BYTES_PER_SECTOR, TOTAL_SECTORS);
    disk.seed_sector0(&mbr_sector(0x0C, 64, 2000));

    // Only entry 0 is populated; entry 3 decodes to an empty/garbage
    // type and must not be mistaken for a valid partition.
    let driver = PartitionDriver::new(&disk, 0, 3);
    assert!(driver.ioctl(0, IoctlCmd::GetDevInfo).is_err());
}

#[test]
fn read_past_partition_end_is_rejected() {
    let disk = RamDisk::new(BYTES_PER_SECTOR, TOTAL_SECTORS);
    disk.seed_sector0(&mbr_sector(0x0C, 64, 10));

    let driver = PartitionDriver::new(&disk, 0, 0);
    let mut buf = [0u8; BYTES_PER_SECTOR as usize];
    assert!(driver.read(0, 9, &mut buf, 2).is_err());
}
