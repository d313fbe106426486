//! The sector-cache collaborator consulted by LB's through-cache algorithm
//! (spec §4.1). The cache's own backing-store policy (write-through vs.
//! write-back, eviction) is an external collaborator; this trait only
//! fixes the shape LB needs to drive it.

use crate::error::Result;
use super::device::DeviceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
}

/// Object-safe so a concrete cache implementation (direct-mapped,
/// LRU, ...) can sit behind `&mut dyn SectorCache` in [`super::Lb`].
pub trait SectorCache {
    /// Attempt to serve a read for `idx` out of the cache into `dst`.
    /// Returns `true` on a hit (data copied into `dst`), `false` on a miss.
    fn try_read(&mut self, idx: u32, dst: &mut [u8]) -> bool;

    /// Populate (or refresh) the cache line for `idx` with freshly-read
    /// data, e.g. after an underlying miss was serviced.
    fn populate(&mut self, idx: u32, data: &[u8]);

    /// Attempt to absorb a write for `idx` into the cache without an
    /// immediate underlying write. Returns `true` if absorbed
    /// (write-back), `false` if the caller must still issue the
    /// underlying write (write-through, or cache full).
    fn write_into_cache(&mut self, idx: u32, data: &[u8]) -> bool;

    /// Drop any cached copies in `[start, start+count)`. Must not write
    /// anything back; `count = u32::MAX` means "the whole device".
    fn invalidate_range(&mut self, start: u32, count: u32);

    /// Write back every dirty line for this device (`SYNC`).
    fn flush(&mut self, driver: &dyn DeviceType, unit: u8) -> Result<()>;
}
