//! Device-activity instrumentation (spec.md §1 item 1, "device-activity
//! instrumentation"), grounded in `FS_LogBlock.c`'s `_aDesc`/
//! `SECTOR_TYPE_DESC` per-sector-type counters.

use super::{ioctl::SectorUsage, SectorType};

/// Running counters plus a one-slot "last sector touched" advisory record
/// used to answer `GET_SECTOR_USAGE`. A fully general per-sector usage map
/// would require a heap; spec.md marks the tag purely advisory, so a
/// single last-write/read record satisfies the ioctl's contract without
/// one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevStat {
    pub sectors_read: u64,
    pub bytes_read: u64,
    pub sectors_written: u64,
    pub bytes_written: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub verify_failures: u64,
    last_touched: Option<(u32, u32, SectorType)>,
}

impl DevStat {
    pub(crate) fn on_read(&mut self, n: u32, bytes_per_sector: u32) {
        self.sectors_read += n as u64;
        self.bytes_read += n as u64 * bytes_per_sector as u64;
    }

    pub(crate) fn on_write(&mut self, n: u32, bytes_per_sector: u32) {
        self.sectors_written += n as u64;
        self.bytes_written += n as u64 * bytes_per_sector as u64;
    }

    pub(crate) fn on_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub(crate) fn on_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub(crate) fn on_verify_failure(&mut self) {
        self.verify_failures += 1;
    }

    pub(crate) fn record_usage(&mut self, idx: u32, n: u32, kind: SectorType) {
        self.last_touched = Some((idx, n, kind));
    }

    pub(crate) fn usage_of(&self, idx: u32) -> SectorUsage {
        match self.last_touched {
            Some((start, n, kind)) if idx >= start && idx < start + n => SectorUsage::Used(kind),
            _ => SectorUsage::Unknown,
        }
    }
}
