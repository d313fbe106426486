//! The FAT boot sector / BIOS Parameter Block (spec §3.1 `BootSector`,
//! §6.3) and the geometry it bootstraps (spec §4.2.2's "static geometry
//! computed once at mount").
//!
//! Adapted from `examples/rrbutani-fatfs/src/fat/boot_sector.rs`'s field
//! layout, but reading/writing a runtime-sized sector slice (spec §3.1:
//! 512..4096 bytes) instead of a fixed `GenericArray<u8, U512>`, and with
//! `write` filled in and a FAT12/16/32-aware geometry derivation added
//! (SPEC_FULL.md §2).

use super::table::{FatGeometry, FatType};
use core::convert::TryInto;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSector {
    pub oem_name: [u8; 8],
    pub bpb: BiosParameterBlock,
}

impl BootSector {
    pub fn new(starting_lba: u32, ending_lba: u32) -> BootSector {
        Self {
            oem_name: *b"r3-fatfs",
            bpb: BiosParameterBlock::new(starting_lba, ending_lba),
        }
    }

    pub fn read(sector: &[u8]) -> Self {
        Self {
            oem_name: sector[3..11].try_into().unwrap(),
            bpb: BiosParameterBlock::read(sector),
        }
    }

    pub fn write(&self, sector: &mut [u8]) {
        sector[3..11].copy_from_slice(&self.oem_name);
        self.bpb.write(sector);
        sector[510] = 0x55;
        sector[511] = 0xAA;
    }

    pub fn starting_fat_sector(&self) -> u32 {
        (self.bpb.num_reserved_logical_sectors as u32) + self.bpb.hidden_preceeding_sectors
    }

    /// Derives the static geometry used by the FAT table/directory code
    /// (spec §4.2.2), plus the root-directory addressing this struct
    /// alone can't express as a single cluster number on FAT12/16.
    ///
    /// Returns `(geometry, root_cluster, fixed_root_start_sector,
    /// fixed_root_entry_count)`; the last two are zero on FAT32, where
    /// the root directory is just an ordinary cluster chain.
    pub fn geometry(&self, partition_start_sector: u32) -> (FatGeometry, u32, u32, u32) {
        let bpb = &self.bpb;
        let bytes_per_sector = bpb.bytes_per_logical_sector as u32;
        let sectors_per_cluster = bpb.logical_sectors_per_cluster as u32;
        let reserved = bpb.num_reserved_logical_sectors as u32;
        let num_fats = bpb.num_file_alloc_tables as u32;

        let sectors_per_fat = if bpb.logical_sectors_per_fat != 0 {
            bpb.logical_sectors_per_fat as u32
        } else {
            bpb.logical_sectors_per_fat_extended
        };

        let root_dir_sectors = {
            let root_entry_bytes = bpb.max_root_dir_entries as u32 * 32;
            (root_entry_bytes + bytes_per_sector - 1) / bytes_per_sector.max(1)
        };

        let total_sectors = if bpb.total_logical_sectors != 0 {
            bpb.total_logical_sectors as u32
        } else {
            bpb.total_logical_sectors_extended
        };

        let fat_start_sector = partition_start_sector + reserved;
        let fixed_root_start_sector = fat_start_sector + num_fats * sectors_per_fat;
        let data_start_sector_fixed = fixed_root_start_sector + root_dir_sectors;

        let is_fat32 = bpb.max_root_dir_entries == 0 && bpb.logical_sectors_per_fat == 0;

        let data_start_sector = if is_fat32 {
            fat_start_sector + num_fats * sectors_per_fat
        } else {
            data_start_sector_fixed
        };

        let data_sectors = total_sectors.saturating_sub(data_start_sector - partition_start_sector);
        let total_clusters = if sectors_per_cluster == 0 {
            0
        } else {
            data_sectors / sectors_per_cluster
        };

        let fat_type = if is_fat32 {
            FatType::Fat32
        } else {
            FatType::detect(total_clusters)
        };

        let geo = FatGeometry {
            fat_type,
            fat_start_sector,
            sectors_per_fat,
            sectors_per_cluster,
            bytes_per_sector,
            data_start_sector,
            total_clusters,
        };

        if is_fat32 {
            (geo, bpb.root_dir_cluster_num, 0, 0)
        } else {
            (geo, 0, fixed_root_start_sector, bpb.max_root_dir_entries as u32)
        }
    }
}

/// FAT32 Extended BIOS Parameter Block (a superset of the DOS 3.31 and
/// DOS 2.0 BPBs). On a FAT12/16 volume, `max_root_dir_entries` and
/// `logical_sectors_per_fat` are nonzero and the FAT32-only fields from
/// offset 0x02C on are meaningless; [`BootSector::geometry`] branches on
/// exactly that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosParameterBlock {
    pub bytes_per_logical_sector: u16,
    pub logical_sectors_per_cluster: u8,
    pub num_reserved_logical_sectors: u16,
    pub num_file_alloc_tables: u8,
    pub max_root_dir_entries: u16,
    pub total_logical_sectors: u16,
    pub media_descriptor: u8,
    pub logical_sectors_per_fat: u16,

    pub phys_sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_preceeding_sectors: u32,
    pub total_logical_sectors_extended: u32,

    pub logical_sectors_per_fat_extended: u32,
    pub drive_desc_mirroring_flags: u16,
    pub version: u16,
    pub root_dir_cluster_num: u32,
    pub fs_info_logical_sector_num: u16,
    pub boot_sector_backup_logical_sector_start_num: u16,

    pub phys_drive_number: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub file_system_type: [u8; 8],
}

impl BiosParameterBlock {
    pub fn new(starting_lba: u32, ending_lba: u32) -> Self {
        let sectors_per_cluster = 16;
        let sector_size = 512;

        Self {
            bytes_per_logical_sector: sector_size,
            logical_sectors_per_cluster: sectors_per_cluster,
            num_reserved_logical_sectors: 0x0020,
            num_file_alloc_tables: 1,
            max_root_dir_entries: 0,
            total_logical_sectors: 0,
            media_descriptor: 0xF8,
            logical_sectors_per_fat: 0,

            phys_sectors_per_track: 0x0010,
            num_heads: 0x0004,
            hidden_preceeding_sectors: starting_lba,
            total_logical_sectors_extended: ending_lba - starting_lba,
            logical_sectors_per_fat_extended: {
                let sectors = ending_lba - starting_lba;
                let clusters = sectors / (sectors_per_cluster as u32);
                let fat_entries_per_sector = sector_size / (32 / 8);
                clusters / (fat_entries_per_sector as u32)
            },
            drive_desc_mirroring_flags: 0,
            version: 0x0000,
            root_dir_cluster_num: 2,
            fs_info_logical_sector_num: 1,
            boot_sector_backup_logical_sector_start_num: 0,

            phys_drive_number: 0x80,
            volume_id: 0x00,
            volume_label: *b"RTOS_FSYS  ",
            file_system_type: *b"FAT32   ",
        }
    }

    pub fn read(sector: &[u8]) -> Self {
        macro_rules! e {
            ($ty:tt, $offset:literal) => {
                $ty::from_le_bytes(
                    sector[$offset..($offset + core::mem::size_of::<$ty>())]
                        .try_into()
                        .unwrap(),
                )
            };
        }

        Self {
            bytes_per_logical_sector: e!(u16, 0x00B),
            logical_sectors_per_cluster: e!(u8, 0x00D),
            num_reserved_logical_sectors: e!(u16, 0x00E),
            num_file_alloc_tables: e!(u8, 0x010),
            max_root_dir_entries: e!(u16, 0x011),
            total_logical_sectors: e!(u16, 0x013),
            media_descriptor: e!(u8, 0x015),
            logical_sectors_per_fat: e!(u16, 0x016),

            phys_sectors_per_track: e!(u16, 0x018),
            num_heads: e!(u16, 0x01A),
            hidden_preceeding_sectors: e!(u32, 0x01C),
            total_logical_sectors_extended: e!(u32, 0x020),
            logical_sectors_per_fat_extended: e!(u32, 0x024),
            drive_desc_mirroring_flags: e!(u16, 0x028),
            version: e!(u16, 0x02A),
            root_dir_cluster_num: e!(u32, 0x02C),
            fs_info_logical_sector_num: e!(u16, 0x030),
            boot_sector_backup_logical_sector_start_num: e!(u16, 0x032),
            phys_drive_number: e!(u8, 0x40),
            volume_id: e!(u32, 0x043),
            volume_label: sector[0x047..(0x047 + 11)].try_into().unwrap(),
            file_system_type: sector[0x052..(0x052 + 8)].try_into().unwrap(),
        }
    }

    pub fn write(&self, sector: &mut [u8]) {
        macro_rules! w {
            ($val:expr, $offset:literal) => {
                sector[$offset..($offset + core::mem::size_of_val(&$val))]
                    .copy_from_slice(&$val.to_le_bytes())
            };
        }

        w!(self.bytes_per_logical_sector, 0x00B);
        sector[0x00D] = self.logical_sectors_per_cluster;
        w!(self.num_reserved_logical_sectors, 0x00E);
        sector[0x010] = self.num_file_alloc_tables;
        w!(self.max_root_dir_entries, 0x011);
        w!(self.total_logical_sectors, 0x013);
        sector[0x015] = self.media_descriptor;
        w!(self.logical_sectors_per_fat, 0x016);

        w!(self.phys_sectors_per_track, 0x018);
        w!(self.num_heads, 0x01A);
        w!(self.hidden_preceeding_sectors, 0x01C);
        w!(self.total_logical_sectors_extended, 0x020);
        w!(self.logical_sectors_per_fat_extended, 0x024);
        w!(self.drive_desc_mirroring_flags, 0x028);
        w!(self.version, 0x02A);
        w!(self.root_dir_cluster_num, 0x02C);
        w!(self.fs_info_logical_sector_num, 0x030);
        w!(self.boot_sector_backup_logical_sector_start_num, 0x032);
        sector[0x40] = self.phys_drive_number;
        w!(self.volume_id, 0x043);
        sector[0x047..(0x047 + 11)].copy_from_slice(&self.volume_label);
        sector[0x052..(0x052 + 8)].copy_from_slice(&self.file_system_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat32_boot_sector_round_trips() {
        let bs = BootSector::new(0x0800, 0x0800 + 16 * 70_000);
        let mut sector = [0u8; 512];
        bs.write(&mut sector);
        let back = BootSector::read(&sector);
        assert_eq!(bs, back);
    }

    #[test]
    fn fat32_geometry_places_root_as_cluster_chain() {
        let bs = BootSector::new(0, 16 * 100_000);
        let (geo, root_cluster, fixed_start, fixed_cnt) = bs.geometry(0);
        assert_eq!(geo.fat_type, FatType::Fat32);
        assert_eq!(root_cluster, 2);
        assert_eq!(fixed_start, 0);
        assert_eq!(fixed_cnt, 0);
    }
}
