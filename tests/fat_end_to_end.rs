//! End-to-end scenarios against a hand-built FAT12 image sitting on a
//! RAM-backed `DeviceType` (spec §8's mount/create/open/delete flow).

mod common;

use common::RamDisk;
use embfs::fat::boot_sector::{BiosParameterBlock, BootSector};
use embfs::fat::charset::AsciiCharSet;
use embfs::fat::dentry::NullClock;
use embfs::fat::{OpenFileQuery, OpenFlags, Volume};
use embfs::lb::{Device, DeviceType, Lb, Partition};

const BYTES_PER_SECTOR: u16 = 512;
const TOTAL_SECTORS: u32 = 64;

struct NoOpenFiles;
impl OpenFileQuery for NoOpenFiles {
    fn is_open(&self, _volume_id: u8, _pos: embfs::fat::file::DirEntryPos) -> bool {
        false
    }
}

fn fat12_bpb() -> BiosParameterBlock {
    // A deliberately tiny FAT12 volume: 1 reserved sector, 1 FAT sector,
    // a 16-entry (1-sector) fixed root directory, 1 sector per cluster.
    BiosParameterBlock {
        bytes_per_logical_sector: BYTES_PER_SECTOR,
        logical_sectors_per_cluster: 1,
        num_reserved_logical_sectors: 1,
        num_file_alloc_tables: 1,
        max_root_dir_entries: 16,
        total_logical_sectors: TOTAL_SECTORS as u16,
        media_descriptor: 0xF8,
        logical_sectors_per_fat: 1,

        phys_sectors_per_track: 0,
        num_heads: 0,
        hidden_preceeding_sectors: 0,
        total_logical_sectors_extended: 0,

        logical_sectors_per_fat_extended: 0,
        drive_desc_mirroring_flags: 0,
        version: 0,
        root_dir_cluster_num: 0,
        fs_info_logical_sector_num: 0,
        boot_sector_backup_logical_sector_start_num: 0,

        phys_drive_number: 0x80,
        volume_id: 0x1234_5678,
        volume_label: *b"NO NAME    ",
        file_system_type: *b"FAT12   ",
    }
}

fn new_disk() -> RamDisk {
    let disk = RamDisk::new(BYTES_PER_SECTOR, TOTAL_SECTORS);
    let boot = BootSector { oem_name: *b"embfs   ", bpb: fat12_bpb() };
    let mut sector = [0u8; BYTES_PER_SECTOR as usize];
    boot.write(&mut sector);
    disk.write(0, 0, &sector, 1, false).unwrap();
    disk
}

fn mount(disk: &RamDisk) -> Volume<'_> {
    let device = Device::new(disk, 0).unwrap();
    let lb = Lb::new(device);
    Volume::mount(lb, Partition::new(0), 0).unwrap()
}

#[test]
fn mounts_and_reports_fat12_geometry() {
    let disk = new_disk();
    let volume = mount(&disk);
    assert_eq!(volume.geometry().fat_type, embfs::fat::table::FatType::Fat12);
    assert_eq!(volume.geometry().sectors_per_cluster, 1);
}

#[test]
fn creates_opens_and_reads_back_a_file() {
    let disk = new_disk();
    let mut volume = mount(&disk);
    let charset = AsciiCharSet;
    let clock = NullClock;
    let open_query = NoOpenFiles;

    let created = volume
        .open_or_create(
            &charset,
            &clock,
            b"/HELLO.TXT",
            OpenFlags { do_create: true, do_open: true, write_access: true, ..Default::default() },
            &open_query,
        )
        .unwrap();
    assert!(!created.is_dir);
    assert_eq!(created.file_size, 0);

    // Re-opening the same path should find the entry just created rather
    // than going down the do_create path again.
    let reopened = volume
        .open_or_create(
            &charset,
            &clock,
            b"/HELLO.TXT",
            OpenFlags { do_open: true, ..Default::default() },
            &open_query,
        )
        .unwrap();
    assert_eq!(reopened.pos.sector, created.pos.sector);
    assert_eq!(reopened.pos.dir_entry_index, created.pos.dir_entry_index);
}

#[test]
fn creating_an_existing_file_without_open_fails() {
    let disk = new_disk();
    let mut volume = mount(&disk);
    let charset = AsciiCharSet;
    let clock = NullClock;
    let open_query = NoOpenFiles;

    volume
        .open_or_create(
            &charset,
            &clock,
            b"/A.TXT",
            OpenFlags { do_create: true, ..Default::default() },
            &open_query,
        )
        .unwrap();

    let err = volume
        .open_or_create(
            &charset,
            &clock,
            b"/A.TXT",
            OpenFlags { do_create: true, ..Default::default() },
            &open_query,
        )
        .unwrap_err();
    assert_eq!(err, embfs::Error::FileDirExists);
}

#[test]
fn creates_a_subdirectory_and_a_file_inside_it() {
    let disk = new_disk();
    let mut volume = mount(&disk);
    let charset = AsciiCharSet;
    let clock = NullClock;
    let open_query = NoOpenFiles;

    let dir = volume
        .open_or_create(
            &charset,
            &clock,
            b"/SUBDIR",
            OpenFlags { do_create: true, create_dir: true, ..Default::default() },
            &open_query,
        )
        .unwrap();
    assert!(dir.is_dir);

    let file = volume
        .open_or_create(
            &charset,
            &clock,
            b"/SUBDIR/INNER.TXT",
            OpenFlags { do_create: true, do_open: true, write_access: true, ..Default::default() },
            &open_query,
        )
        .unwrap();
    assert!(!file.is_dir);
}

#[test]
fn deletes_a_file_and_frees_its_directory_slot() {
    let disk = new_disk();
    let mut volume = mount(&disk);
    let charset = AsciiCharSet;
    let clock = NullClock;
    let open_query = NoOpenFiles;

    volume
        .open_or_create(
            &charset,
            &clock,
            b"/GONE.TXT",
            OpenFlags { do_create: true, ..Default::default() },
            &open_query,
        )
        .unwrap();

    // do_delete alone with no do_create reports FileDirNotFound once the
    // delete itself has succeeded; any `Err` sticks the error latch
    // (spec §4.2.6), so the caller must clear it before continuing.
    volume
        .open_or_create(
            &charset,
            &clock,
            b"/GONE.TXT",
            OpenFlags { do_delete: true, ..Default::default() },
            &open_query,
        )
        .unwrap_err();
    volume.clear_error_latch();

    let err = volume
        .open_or_create(
            &charset,
            &clock,
            b"/GONE.TXT",
            OpenFlags { do_open: true, ..Default::default() },
            &open_query,
        )
        .unwrap_err();
    assert_eq!(err, embfs::Error::FileDirNotFound);
}

#[test]
fn error_latch_short_circuits_until_cleared() {
    let disk = new_disk();
    let mut volume = mount(&disk);
    let charset = AsciiCharSet;
    let clock = NullClock;
    let open_query = NoOpenFiles;

    let missing = volume
        .open_or_create(&charset, &clock, b"/MISSING.TXT", OpenFlags::default(), &open_query)
        .unwrap_err();
    assert_eq!(missing, embfs::Error::FileDirNotFound);

    let latched = volume
        .open_or_create(&charset, &clock, b"/ANYTHING.TXT", OpenFlags::default(), &open_query)
        .unwrap_err();
    assert_eq!(latched, embfs::Error::HasErrorLatched);

    volume.clear_error_latch();
    let after_clear = volume
        .open_or_create(&charset, &clock, b"/ANYTHING.TXT", OpenFlags::default(), &open_query)
        .unwrap_err();
    assert_eq!(after_clear, embfs::Error::FileDirNotFound);
}
