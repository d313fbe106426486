//! Ioctl command enumeration consumed by LB and the device drivers below it
//! (spec §6.2).

use super::SectorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCmd {
    /// Writes `{NumSectors, BytesPerSector, NumHeads, SectorsPerTrack}`.
    GetDevInfo,
    /// Graceful dismount: drop caches, keep the driver instance.
    Unmount,
    /// Unconditional dismount; do not attempt media writes.
    UnmountForced,
    /// Release driver instance resources.
    Deinit,
    /// `aux=start, count`: hint that sectors are unused (trim).
    FreeSectors { start: u32, count: u32 },
    /// Install a read-error recovery callback.
    SetReadErrorCallback,
    /// Flush pending writes.
    Sync,
    /// Query the advisory per-sector usage tag.
    GetSectorUsage { idx: u32 },
    /// Like `FreeSectors` but never touches the underlying device; cache
    /// eviction only.
    CacheFreeSectors { start: u32, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorUsage {
    Unknown,
    Used(SectorType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlResult {
    None,
    DevInfo(super::DevInfo),
    SectorUsage(SectorUsage),
}
