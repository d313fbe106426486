//! The device-driver vtable (spec §6.1) and the `Device` handle that wraps
//! one instance of it for the LB layer.
//!
//! Grounded in `examples/rrbutani-fatfs/src/mutex.rs`'s `MutexInterface`
//! vtable-as-trait idiom, and directly in
//! `original_source/emFile/FS/FS_DiskPartition.c`'s `_DISKPART_Read/Write/
//! IoCtl/InitMedium/GetStatus/GetNumUnits` function table, which is exactly
//! the shape spec.md §6.1 describes.

use super::ioctl::IoctlCmd;
use crate::error::Result;

/// Presence of the medium behind a device, as reported by `get_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevStatus {
    Unknown,
    NotPresent,
    Present,
}

/// Geometry reported by `GET_DEVINFO` (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DevInfo {
    pub num_sectors: u32,
    pub bytes_per_sector: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
}

/// Every storage driver -- partition driver, SFDP-backed NOR driver, IDE
/// driver, write-buffer driver -- implements this (spec §6.1). Object-safe
/// so that heterogeneous drivers can sit behind one `&dyn DeviceType` in
/// the LB layer.
pub trait DeviceType: Sync {
    fn name(&self, unit: u8) -> &str;

    /// Registers a fresh logical instance behind this vtable and returns
    /// its unit number.
    fn add_device(&self) -> Result<u8>;

    fn read(&self, unit: u8, sector_idx: u32, buf: &mut [u8], num_sectors: u32) -> Result<()>;

    fn write(
        &self,
        unit: u8,
        sector_idx: u32,
        buf: &[u8],
        num_sectors: u32,
        repeat_same: bool,
    ) -> Result<()>;

    fn ioctl(&self, unit: u8, cmd: IoctlCmd) -> Result<super::IoctlResult>;

    /// Optional. Default `Ok(())`: "no init implemented" is observed by
    /// callers as success (spec.md Design Notes).
    fn init_medium(&self, _unit: u8) -> Result<()> {
        Ok(())
    }

    fn get_status(&self, unit: u8) -> DevStatus;

    fn get_num_units(&self) -> u8;

    fn get_device_info(&self, unit: u8) -> Result<DevInfo>;
}

/// One bound instance of a `DeviceType`: a unit number, init state, and
/// activity statistics (spec §3.1 "Device").
pub struct Device<'d> {
    pub(crate) driver: &'d dyn DeviceType,
    pub(crate) unit: u8,
    pub(crate) is_inited: bool,
    pub(crate) info: DevInfo,
    pub(crate) stats: super::DevStat,
}

impl<'d> Device<'d> {
    pub fn new(driver: &'d dyn DeviceType, unit: u8) -> Result<Self> {
        let info = driver.get_device_info(unit)?;
        Ok(Self {
            driver,
            unit,
            is_inited: false,
            info,
            stats: super::DevStat::default(),
        })
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn name(&self) -> &str {
        self.driver.name(self.unit)
    }

    pub fn get_status(&self) -> DevStatus {
        self.driver.get_status(self.unit)
    }

    pub fn stats(&self) -> &super::DevStat {
        &self.stats
    }

    pub fn is_inited(&self) -> bool {
        self.is_inited
    }
}
