//! Cluster-chain walk speed (spec §4.2.2's delta-walk hot path), the
//! std-only counterpart to `examples/rrbutani-fatfs/benches/speed.rs`'s
//! file-read-speed benchmark, rebuilt against this crate's RAM-backed
//! `DeviceType` instead of a real disk image since no fixture assets ship
//! with the crate.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use embfs::fat::boot_sector::{BiosParameterBlock, BootSector};
use embfs::fat::table::{self, FatGeometry, FatType};
use embfs::lb::{Device, DeviceType, Lb, Partition, SectorType};
use std::sync::Mutex;

const BYTES_PER_SECTOR: u16 = 512;
const RESERVED: u16 = 1;
const SECTORS_PER_FAT: u16 = 17;
const ROOT_DIR_ENTRIES: u16 = 16;
const TOTAL_CLUSTERS: u32 = 4200;
const TOTAL_SECTORS: u32 = RESERVED as u32 + SECTORS_PER_FAT as u32 + 1 + TOTAL_CLUSTERS;

struct RamDisk {
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    fn new(num_sectors: u32) -> Self {
        Self { data: Mutex::new(vec![0u8; BYTES_PER_SECTOR as usize * num_sectors as usize]) }
    }
}

impl DeviceType for RamDisk {
    fn name(&self, _unit: u8) -> &str {
        "bench-ram-disk"
    }
    fn add_device(&self) -> embfs::Result<u8> {
        Ok(0)
    }
    fn read(&self, _unit: u8, sector_idx: u32, buf: &mut [u8], num_sectors: u32) -> embfs::Result<()> {
        let bps = BYTES_PER_SECTOR as usize;
        let data = self.data.lock().unwrap();
        let start = sector_idx as usize * bps;
        let len = num_sectors as usize * bps;
        buf[..len].copy_from_slice(&data[start..start + len]);
        Ok(())
    }
    fn write(&self, _unit: u8, sector_idx: u32, buf: &[u8], num_sectors: u32, _repeat_same: bool) -> embfs::Result<()> {
        let bps = BYTES_PER_SECTOR as usize;
        let mut data = self.data.lock().unwrap();
        let start = sector_idx as usize * bps;
        let len = num_sectors as usize * bps;
        data[start..start + len].copy_from_slice(&buf[..len]);
        Ok(())
    }
    fn ioctl(&self, _unit: u8, _cmd: embfs::lb::IoctlCmd) -> embfs::Result<embfs::lb::IoctlResult> {
        Ok(embfs::lb::IoctlResult::None)
    }
    fn get_status(&self, _unit: u8) -> embfs::lb::DevStatus {
        embfs::lb::DevStatus::Present
    }
    fn get_num_units(&self) -> u8 {
        1
    }
    fn get_device_info(&self, _unit: u8) -> embfs::Result<embfs::lb::DevInfo> {
        Ok(embfs::lb::DevInfo {
            num_sectors: TOTAL_SECTORS,
            bytes_per_sector: BYTES_PER_SECTOR,
            sectors_per_track: 0,
            num_heads: 0,
        })
    }
}

fn fat16_bpb() -> BiosParameterBlock {
    BiosParameterBlock {
        bytes_per_logical_sector: BYTES_PER_SECTOR,
        logical_sectors_per_cluster: 1,
        num_reserved_logical_sectors: RESERVED,
        num_file_alloc_tables: 1,
        max_root_dir_entries: ROOT_DIR_ENTRIES,
        total_logical_sectors: TOTAL_SECTORS as u16,
        media_descriptor: 0xF8,
        logical_sectors_per_fat: SECTORS_PER_FAT,
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
        volume_id: 0,
        volume_label: *b"BENCH      ",
        file_system_type: *b"FAT16   ",
    }
}

/// Builds a RAM disk with a FAT16 boot sector and a chain of
/// `chain_len` allocated clusters, returning the disk, the geometry, and
/// the head cluster of the chain.
fn build_chain(chain_len: u32) -> (RamDisk, FatGeometry, Partition, u32) {
    let disk = RamDisk::new(TOTAL_SECTORS);
    let boot = BootSector { oem_name: *b"embfs   ", bpb: fat16_bpb() };
    let mut sector = [0u8; BYTES_PER_SECTOR as usize];
    boot.write(&mut sector);
    disk.write(0, 0, &sector, 1, false).unwrap();

    let device = Device::new(&disk, 0).unwrap();
    let mut lb = Lb::new(device);
    let part = Partition::new(0);

    let mut scratch = [0u8; BYTES_PER_SECTOR as usize];
    lb.read_part(part, 0, &mut scratch, SectorType::Management).unwrap();
    let read_back = BootSector::read(&scratch);
    let (geo, _root_cluster, _fixed_start, _fixed_cnt) = read_back.geometry(0);
    assert_eq!(geo.fat_type, FatType::Fat16);

    let head = table::alloc_cluster(&geo, &mut lb, part, &mut scratch).unwrap();
    let mut tail = head;
    for _ in 1..chain_len {
        tail = table::append_cluster(&geo, &mut lb, part, &mut scratch, tail).unwrap();
    }

    (disk, geo, part, head)
}

fn bench_cluster_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster chain walk");

    for &chain_len in &[16u32, 256, 2000] {
        let (disk, geo, part, head) = build_chain(chain_len);
        let device = Device::new(&disk, 0).unwrap();
        let mut lb = Lb::new(device);
        let mut scratch = [0u8; BYTES_PER_SECTOR as usize];

        group.throughput(Throughput::Elements(chain_len as u64));
        group.bench_with_input(BenchmarkId::new("walk_delta to tail", chain_len), &chain_len, |b, &len| {
            b.iter(|| {
                table::walk_delta(&geo, &mut lb, part, &mut scratch, head, len - 1).unwrap().unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_cluster_walk);
criterion_main!(benches);
