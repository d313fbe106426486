//! The Logical-Block layer: a uniform, typed, optionally cached and
//! journaled sector interface sitting between the FAT engine and the
//! device-driver vtable (spec §4.1).
//!
//! Grounded in `original_source/emFile/FS/FS_LogBlock.c`: the public
//! operations here (`read_device`/`read_part`/`write_device`/... ) mirror
//! `FS_LB_ReadDevice`/`FS_LB_ReadPart`/`FS_LB_WriteDevice`/... one-to-one,
//! and the through-cache/journal-routing/write-verify algorithms follow the
//! same file's `_ReadThroughCache`/`_WriteThroughCache`/`_Verify` helpers.

mod cache;
mod device;
mod ioctl;
mod journal;
mod stats;

pub use cache::{CacheLookup, SectorCache};
pub use device::{Device, DevInfo, DeviceType, DevStatus};
pub use ioctl::{IoctlCmd, IoctlResult, SectorUsage};
pub use journal::Journal;
pub use stats::DevStat;

use crate::error::{Error, Result};
use log::{debug, error, trace, warn};

/// Reserved sector index meaning "no sector" / "invalid".
pub const SECTOR_INDEX_INVALID: u32 = u32::MAX;

/// Advisory tag carried by every sector read/write; used for statistics and
/// cache policy only, never for correctness (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorType {
    Data,
    Management,
    Directory,
}

/// `(Device, StartSector)`: makes sector indices relative to a partition.
/// All translation is a single addition (spec §3.1). This is the
/// lightweight pairing the LB layer itself uses for its `*_part` entry
/// points; it is distinct from the stateful MBR/GPT-backed partition
/// *driver* in [`crate::partition`], which is a [`DeviceType`] consumed
/// through `Device` like any other.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    pub start_sector: u32,
}

impl Partition {
    pub fn new(start_sector: u32) -> Self {
        Self { start_sector }
    }
}

/// The Logical-Block layer itself: a device plus its optional cache and
/// journal collaborators (spec §4.1 "may route to Journal", "may consult
/// Sector cache").
pub struct Lb<'d> {
    pub device: Device<'d>,
    cache: Option<&'d mut dyn SectorCache>,
    journal: Option<&'d mut dyn Journal>,
    verify_enabled: bool,
}

impl<'d> Lb<'d> {
    pub fn new(device: Device<'d>) -> Self {
        Self {
            device,
            cache: None,
            journal: None,
            verify_enabled: cfg!(feature = "verify-write"),
        }
    }

    pub fn with_cache(mut self, cache: &'d mut dyn SectorCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_journal(mut self, journal: &'d mut dyn Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn set_verify_enabled(&mut self, enabled: bool) {
        self.verify_enabled = enabled;
    }

    /// `init_medium_if_required`: every read/write calls this first.
    fn init_medium_if_required(&mut self) -> Result<()> {
        if self.device.is_inited {
            return Ok(());
        }
        match self.device.driver.init_medium(self.device.unit) {
            Ok(()) => {
                self.device.is_inited = true;
                Ok(())
            }
            Err(e) => {
                error!(
                    "lb: init_medium failed for unit {}: {}",
                    self.device.unit, e
                );
                Err(Error::InitFailure)
            }
        }
    }

    fn journal_active(&self) -> bool {
        self.journal.as_ref().map_or(false, |j| j.is_present())
    }

    /// `_ReadThroughCache`: serve hits from cache, coalesce misses into one
    /// underlying burst, then populate the cache for the missed range.
    fn read_through_cache(
        &mut self,
        idx: u32,
        buf: &mut [u8],
        n: u32,
        bytes_per_sector: usize,
        kind: SectorType,
    ) -> Result<()> {
        if self.journal_active() {
            let journal = self.journal.as_mut().unwrap();
            for i in 0..n {
                let off = i as usize * bytes_per_sector;
                journal.journal_read(idx + i, &mut buf[off..off + bytes_per_sector])?;
            }
            self.device.stats.on_read(n, bytes_per_sector as u32);
            return Ok(());
        }

        if self.cache.is_none() {
            self.device
                .driver
                .read(self.device.unit, idx, buf, n)
                .map_err(|e| {
                    error!("lb: read({}, n={}) failed: {}", idx, n, e);
                    e
                })?;
            self.device.stats.on_read(n, bytes_per_sector as u32);
            self.device.stats.record_usage(idx, n, kind);
            return Ok(());
        }

        // Single pass: serve hits straight from the cache, coalesce
        // contiguous misses into one underlying burst per run.
        let mut run_start: Option<u32> = None;
        for i in 0..=n {
            let off = i as usize * bytes_per_sector;
            let is_hit = i < n
                && self
                    .cache
                    .as_mut()
                    .unwrap()
                    .try_read(idx + i, &mut buf[off..off + bytes_per_sector]);

            if i < n {
                if is_hit {
                    self.device.stats.on_cache_hit();
                } else {
                    self.device.stats.on_cache_miss();
                }
            }

            match (is_hit || i == n, run_start) {
                (true, Some(start)) => {
                    let run_len = i - start;
                    let run_off = start as usize * bytes_per_sector;
                    self.device.driver.read(
                        self.device.unit,
                        idx + start,
                        &mut buf[run_off..run_off + run_len as usize * bytes_per_sector],
                        run_len,
                    )?;
                    for s in 0..run_len {
                        let soff = (start + s) as usize * bytes_per_sector;
                        self.cache.as_mut().unwrap().populate(
                            idx + start + s,
                            &buf[soff..soff + bytes_per_sector],
                        );
                    }
                    run_start = None;
                }
                (false, None) if i < n => run_start = Some(i),
                _ => {}
            }
        }

        self.device.stats.on_read(n, bytes_per_sector as u32);
        self.device.stats.record_usage(idx, n, kind);
        Ok(())
    }

    /// `_WriteThroughCache`: try to absorb each sector into the cache; if
    /// any sector is not accepted, emit a single underlying write for the
    /// whole range.
    fn write_through_cache(
        &mut self,
        idx: u32,
        buf: &[u8],
        n: u32,
        bytes_per_sector: usize,
        repeat_same: bool,
        kind: SectorType,
    ) -> Result<()> {
        if self.journal_active() {
            let write_to_journal = self
                .journal
                .as_ref()
                .map_or(false, |j| j.is_new_data_logged());
            let journal = self.journal.as_mut().unwrap();
            if write_to_journal {
                for i in 0..n {
                    let off = if repeat_same { 0 } else { i as usize * bytes_per_sector };
                    journal.journal_write(idx + i, &buf[off..off + bytes_per_sector])?;
                }
                self.device.stats.on_write(n, bytes_per_sector as u32);
                return Ok(());
            }
        }

        let need_underlying_write = match self.cache.as_mut() {
            None => true,
            Some(cache) => {
                let mut all_absorbed = true;
                for i in 0..n {
                    let off = if repeat_same { 0 } else { i as usize * bytes_per_sector };
                    if !cache.write_into_cache(idx + i, &buf[off..off + bytes_per_sector]) {
                        all_absorbed = false;
                        break;
                    }
                }
                !all_absorbed
            }
        };

        if need_underlying_write {
            self.device
                .driver
                .write(self.device.unit, idx, buf, n, repeat_same)
                .map_err(|e| {
                    error!("lb: write({}, n={}) failed: {}", idx, n, e);
                    e
                })?;

            if self.verify_enabled {
                self.verify_write(idx, buf, n, bytes_per_sector, repeat_same)?;
            }
        }

        self.device.stats.on_write(n, bytes_per_sector as u32);
        self.device.stats.record_usage(idx, n, kind);
        Ok(())
    }

    #[cfg(feature = "verify-write")]
    fn verify_write(
        &mut self,
        idx: u32,
        buf: &[u8],
        n: u32,
        bytes_per_sector: usize,
        repeat_same: bool,
    ) -> Result<()> {
        use generic_array::{typenum::U4096, GenericArray};
        let mut scratch: GenericArray<u8, U4096> = GenericArray::default();
        for i in 0..n {
            let dst = &mut scratch[..bytes_per_sector];
            self.device
                .driver
                .read(self.device.unit, idx + i, dst, 1)?;
            let src_off = if repeat_same { 0 } else { i as usize * bytes_per_sector };
            let src = &buf[src_off..src_off + bytes_per_sector];
            if &*dst != src {
                self.device.stats.on_verify_failure();
                error!(
                    "lb: write verify mismatch at sector {} on device {}",
                    idx + i,
                    self.device.driver.name(self.device.unit)
                );
                return Err(Error::WriteVerify);
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "verify-write"))]
    fn verify_write(
        &mut self,
        _idx: u32,
        _buf: &[u8],
        _n: u32,
        _bytes_per_sector: usize,
        _repeat_same: bool,
    ) -> Result<()> {
        Ok(())
    }

    pub fn read_device(
        &mut self,
        idx: u32,
        buf: &mut [u8],
        kind: SectorType,
    ) -> Result<()> {
        self.read_burst(idx, 1, buf, kind)
    }

    pub fn read_burst(
        &mut self,
        idx: u32,
        n: u32,
        buf: &mut [u8],
        kind: SectorType,
    ) -> Result<()> {
        self.init_medium_if_required()?;
        let bps = self.device.info.bytes_per_sector as usize;
        trace!("lb: read_burst(idx={}, n={})", idx, n);
        self.read_through_cache(idx, buf, n, bps, kind)
    }

    pub fn read_part(
        &mut self,
        part: Partition,
        idx: u32,
        buf: &mut [u8],
        kind: SectorType,
    ) -> Result<()> {
        self.read_burst_part(part, idx, 1, buf, kind)
    }

    pub fn read_burst_part(
        &mut self,
        part: Partition,
        idx: u32,
        n: u32,
        buf: &mut [u8],
        kind: SectorType,
    ) -> Result<()> {
        self.read_burst(idx + part.start_sector, n, buf, kind)
    }

    pub fn write_device(
        &mut self,
        idx: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.write_burst(idx, 1, buf, kind)
    }

    pub fn write_burst(
        &mut self,
        idx: u32,
        n: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.init_medium_if_required()?;
        let bps = self.device.info.bytes_per_sector as usize;
        trace!("lb: write_burst(idx={}, n={})", idx, n);
        self.write_through_cache(idx, buf, n, bps, false, kind)
    }

    /// Writes the same single-sector payload to `n` consecutive sectors.
    pub fn write_multiple(
        &mut self,
        idx: u32,
        n: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.init_medium_if_required()?;
        let bps = self.device.info.bytes_per_sector as usize;
        self.write_through_cache(idx, buf, n, bps, true, kind)
    }

    pub fn write_part(
        &mut self,
        part: Partition,
        idx: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.write_burst_part(part, idx, 1, buf, kind)
    }

    pub fn write_burst_part(
        &mut self,
        part: Partition,
        idx: u32,
        n: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.write_burst(idx + part.start_sector, n, buf, kind)
    }

    pub fn write_multiple_part(
        &mut self,
        part: Partition,
        idx: u32,
        n: u32,
        buf: &[u8],
        kind: SectorType,
    ) -> Result<()> {
        self.write_multiple(idx + part.start_sector, n, buf, kind)
    }

    pub fn free_sectors_device(&mut self, idx: u32, n: u32) -> Result<()> {
        if let Some(cache) = self.cache.as_mut() {
            cache.invalidate_range(idx, n);
        }
        if let Some(journal) = self.journal.as_mut() {
            if journal.is_present() {
                journal.journal_write(idx, &[])?;
            }
        }
        let res = self.device.driver.ioctl(
            self.device.unit,
            IoctlCmd::FreeSectors {
                start: idx,
                count: n,
            },
        );
        if let Err(e) = res {
            warn!(
                "lb: free_sectors({}, n={}) underlying ioctl failed: {} (cache already invalidated)",
                idx, n, e
            );
        }
        Ok(())
    }

    pub fn free_sectors_part(&mut self, part: Partition, idx: u32, n: u32) -> Result<()> {
        self.free_sectors_device(idx + part.start_sector, n)
    }

    pub fn get_device_info(&mut self) -> Result<DevInfo> {
        self.init_medium_if_required()?;
        Ok(self.device.info)
    }

    pub fn get_sector_size(&mut self) -> Result<u16> {
        Ok(self.get_device_info()?.bytes_per_sector)
    }

    pub fn ioctl(&mut self, cmd: IoctlCmd) -> Result<IoctlResult> {
        match cmd {
            IoctlCmd::Unmount | IoctlCmd::UnmountForced => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.invalidate_range(0, u32::MAX);
                }
                self.device.is_inited = false;
                debug!("lb: unmount unit {}", self.device.unit);
                Ok(IoctlResult::None)
            }
            IoctlCmd::Deinit => {
                self.device.is_inited = false;
                Ok(IoctlResult::None)
            }
            IoctlCmd::Sync => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.flush(&*self.device.driver, self.device.unit)?;
                }
                Ok(IoctlResult::None)
            }
            IoctlCmd::CacheFreeSectors { start, count } => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.invalidate_range(start, count);
                }
                Ok(IoctlResult::None)
            }
            IoctlCmd::GetSectorUsage { idx } => {
                Ok(IoctlResult::SectorUsage(self.device.stats.usage_of(idx)))
            }
            other => self
                .device
                .driver
                .ioctl(self.device.unit, other)
                .map_err(|e| {
                    error!("lb: ioctl({:?}) failed: {}", other, e);
                    e
                }),
        }
    }
}
