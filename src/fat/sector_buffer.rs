//! `FS_SB`-equivalent single-sector scratch buffer (spec §3.2, Design
//! Notes "Sector buffer as a single-slot cache"): a value that exclusively
//! owns a backing byte array and a dirty/valid flag, flushed on `Drop`
//! unless an error path marks it invalid first.
//!
//! Grounded in `original_source/emFile/FS/FS_FAT_Open.c` and `FS_Write.c`'s
//! `FS_SB__Clean`/`FS_SB__Flush` call sites.

use crate::lb::{Lb, Partition, SectorType};
use generic_array::{typenum::U4096, GenericArray};
use log::error;

/// Bound on the sector size this crate supports (spec §3.1: 512..=4096).
pub const MAX_SECTOR_SIZE: usize = 4096;

pub struct SectorBuffer<'b, 'd> {
    data: GenericArray<u8, U4096>,
    bytes_per_sector: usize,
    sector: u32,
    valid: bool,
    dirty: bool,
    kind: SectorType,
    lb: &'b mut Lb<'d>,
    part: Partition,
}

impl<'b, 'd> SectorBuffer<'b, 'd> {
    pub fn new(lb: &'b mut Lb<'d>, part: Partition, bytes_per_sector: usize, kind: SectorType) -> Self {
        Self {
            data: GenericArray::default(),
            bytes_per_sector,
            sector: 0,
            valid: false,
            dirty: false,
            kind,
            lb,
            part,
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.bytes_per_sector]
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.bytes_per_sector]
    }

    /// Loads `sector` into the buffer, flushing any prior dirty contents
    /// first (the buffer is a single slot, not a cache).
    pub fn load(&mut self, sector: u32) -> crate::error::Result<&[u8]> {
        if self.valid && self.sector == sector {
            return Ok(self.as_slice());
        }
        self.flush_if_dirty()?;
        let bps = self.bytes_per_sector;
        self.lb
            .read_part(self.part, sector, &mut self.data[..bps], self.kind)?;
        self.sector = sector;
        self.valid = true;
        self.dirty = false;
        Ok(self.as_slice())
    }

    pub fn data(&self) -> &[u8] {
        self.as_slice()
    }

    /// Mutable access; marks the buffer dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        self.as_mut_slice()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// An error path that wants to discard the buffer's contents without
    /// writing them back calls this before drop.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.dirty = false;
    }

    pub fn flush_if_dirty(&mut self) -> crate::error::Result<()> {
        if self.dirty && self.valid {
            let bps = self.bytes_per_sector;
            self.lb
                .write_part(self.part, self.sector, &self.data[..bps], self.kind)?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl<'b, 'd> Drop for SectorBuffer<'b, 'd> {
    fn drop(&mut self) {
        if self.dirty && self.valid {
            let bps = self.bytes_per_sector;
            if let Err(e) = self.lb.write_part(self.part, self.sector, &self.data[..bps], self.kind) {
                error!("fat: sector buffer flush-on-drop for sector {} failed: {}", self.sector, e);
            }
        }
    }
}
