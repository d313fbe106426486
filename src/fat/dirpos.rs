//! Directory scanning (spec §4.2.2): traversal cursor, entry-by-index
//! lookup with the cluster-delta walk and its corruption guard, and
//! empty-slot search with on-demand directory growth.

use super::table::{self, FatGeometry};
use crate::error::{Error, Result};
use crate::lb::{Lb, Partition, SectorType, SECTOR_INDEX_INVALID};

pub const DIR_ENTRY_SIZE: u32 = 32;

/// A traversal cursor within a directory (spec §3.1 `DirPos`). Invariant:
/// `ClusterIndex * EntriesPerCluster <= DirEntryIndex <
/// (ClusterIndex+1) * EntriesPerCluster`; `cluster_id ==
/// SECTOR_INDEX_INVALID` marks the cursor invalid.
#[derive(Debug, Clone, Copy)]
pub struct DirPos {
    pub first_cluster_id: u32,
    pub cluster_id: u32,
    pub cluster_index: u32,
    pub dir_entry_index: u32,
    /// `true` for a FAT12/16 fixed root directory, which has no cluster
    /// chain and a hard entry-count bound (spec §4.2.2).
    pub fixed_root: bool,
}

impl DirPos {
    pub fn is_valid(&self) -> bool {
        self.cluster_id != SECTOR_INDEX_INVALID
    }
}

/// `init_dir_scan`: sets the cursor to entry 0 of `dir_cluster`. If
/// `dir_cluster == 0`, on FAT32 this addresses the volume's root-dir
/// cluster; on FAT12/16 the value 0 addresses the fixed root region.
pub fn init_dir_scan(
    geo: &FatGeometry,
    root_cluster: u32,
    fixed_root_entry_cnt: u32,
    dir_cluster: u32,
) -> DirPos {
    let _ = fixed_root_entry_cnt;
    if dir_cluster == 0 && fixed_root_entry_cnt > 0 {
        DirPos {
            first_cluster_id: 0,
            cluster_id: 0,
            cluster_index: 0,
            dir_entry_index: 0,
            fixed_root: true,
        }
    } else {
        let cluster = if dir_cluster == 0 { root_cluster } else { dir_cluster };
        let _ = geo;
        DirPos {
            first_cluster_id: cluster,
            cluster_id: cluster,
            cluster_index: 0,
            dir_entry_index: 0,
            fixed_root: false,
        }
    }
}

fn entries_per_cluster(geo: &FatGeometry) -> u32 {
    geo.bytes_per_cluster() / DIR_ENTRY_SIZE
}

/// `get_dir_entry`: computes the sector holding `pos.dir_entry_index` and
/// reads the 32-byte entry through `scratch` (a full-sector scratch
/// buffer). Returns `Ok(None)` at a clean end of directory (spec §7:
/// "find_dir_entry_short returns NULL ... not an error").
/// Returns the 32-byte entry plus the absolute sector it lives in (the
/// `SectorIndex` half of the `(SectorIndex, DirEntryIndex)` key the
/// open-file table and the delete protocol key off, spec §4.2.4 step 1).
pub fn get_dir_entry(
    geo: &FatGeometry,
    lb: &mut Lb<'_>,
    part: Partition,
    scratch: &mut [u8],
    pos: &mut DirPos,
    fixed_root_start_sector: u32,
    fixed_root_entry_cnt: u32,
) -> Result<Option<([u8; 32], u32)>> {
    if !pos.is_valid() {
        return Ok(None);
    }

    let bps = geo.bytes_per_sector;

    if pos.fixed_root {
        if pos.dir_entry_index >= fixed_root_entry_cnt {
            return Ok(None);
        }
        let byte_off = pos.dir_entry_index * DIR_ENTRY_SIZE;
        let sector = fixed_root_start_sector + byte_off / bps;
        let in_sector = (byte_off % bps) as usize;
        lb.read_part(part, sector, &mut scratch[..bps as usize], SectorType::Directory)?;
        let mut entry = [0u8; 32];
        entry.copy_from_slice(&scratch[in_sector..in_sector + 32]);
        pos.dir_entry_index += 1;
        return Ok(Some((entry, sector)));
    }

    let epc = entries_per_cluster(geo);
    let desired_cluster_index = pos.dir_entry_index / epc;

    if desired_cluster_index != pos.cluster_index {
        let delta = desired_cluster_index - pos.cluster_index;
        let walked = table::walk_delta(geo, lb, part, scratch, pos.cluster_id, delta)
            .map_err(|e| {
                pos.cluster_id = SECTOR_INDEX_INVALID;
                e
            })?;
        let next_cluster = match walked {
            Some(c) => c,
            None => {
                pos.cluster_id = SECTOR_INDEX_INVALID;
                return Ok(None);
            }
        };
        pos.cluster_id = next_cluster;
        pos.cluster_index = desired_cluster_index;
    }

    let in_cluster_entry = pos.dir_entry_index % epc;
    let byte_off = in_cluster_entry * DIR_ENTRY_SIZE;
    let sector_in_cluster = byte_off / bps;
    let sector = geo.cluster_to_sector(pos.cluster_id) + sector_in_cluster;
    let in_sector = (byte_off % bps) as usize;

    lb.read_part(part, sector, &mut scratch[..bps as usize], SectorType::Directory)?;
    let mut entry = [0u8; 32];
    entry.copy_from_slice(&scratch[in_sector..in_sector + 32]);
    pos.dir_entry_index += 1;
    Ok(Some((entry, sector)))
}

/// `find_empty_dir_entry`: scans from the start of `dir_cluster` for an
/// entry whose first byte is `0x00` or `0xE5`. If none is found and the
/// directory can grow, allocates and zero-fills a new cluster, appends it
/// to the chain, and returns the position of its first entry.
pub fn find_empty_dir_entry(
    geo: &FatGeometry,
    lb: &mut Lb<'_>,
    part: Partition,
    scratch: &mut [u8],
    root_cluster: u32,
    fixed_root_start_sector: u32,
    fixed_root_entry_cnt: u32,
    dir_cluster: u32,
) -> Result<DirPos> {
    let mut pos = init_dir_scan(geo, root_cluster, fixed_root_entry_cnt, dir_cluster);
    let mut tail_cluster = pos.cluster_id;

    loop {
        let save = pos;
        match get_dir_entry(
            geo,
            lb,
            part,
            scratch,
            &mut pos,
            fixed_root_start_sector,
            fixed_root_entry_cnt,
        )? {
            Some((entry, _sector)) if entry[0] == 0x00 || entry[0] == 0xE5 => {
                pos.dir_entry_index -= 1;
                return Ok(save);
            }
            Some(_) => {
                tail_cluster = pos.cluster_id;
                continue;
            }
            None => break,
        }
    }

    if pos.fixed_root {
        return Err(Error::DirFull);
    }

    // `get_dir_entry` invalidates `pos.cluster_id` once the chain runs
    // out; `tail_cluster` is the last cluster actually visited.
    let new_cluster = table::append_cluster(geo, lb, part, scratch, tail_cluster)?;

    Ok(DirPos {
        first_cluster_id: pos.first_cluster_id,
        cluster_id: new_cluster,
        cluster_index: pos.cluster_index + 1,
        dir_entry_index: (pos.cluster_index + 1) * entries_per_cluster(geo),
        fixed_root: false,
    })
}
