//! A whole-disk RAM-backed `DeviceType`, used by the integration tests as
//! the bottom of the stack in place of real hardware.

use embfs::lb::{DevInfo, DevStatus, DeviceType, IoctlCmd, IoctlResult};
use embfs::Result;
use std::sync::Mutex;

pub struct RamDisk {
    bytes_per_sector: u16,
    num_sectors: u32,
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(bytes_per_sector: u16, num_sectors: u32) -> Self {
        Self {
            bytes_per_sector,
            num_sectors,
            data: Mutex::new(vec![0u8; bytes_per_sector as usize * num_sectors as usize]),
        }
    }

    /// Seeds the disk with a caller-prepared sector 0, used by the MBR
    /// discovery test to install a partition table before any `DeviceType`
    /// call touches the disk.
    pub fn seed_sector0(&self, sector: &[u8]) {
        let mut data = self.data.lock().unwrap();
        data[..sector.len()].copy_from_slice(sector);
    }
}

impl DeviceType for RamDisk {
    fn name(&self, _unit: u8) -> &str {
        "ram-disk"
    }

    fn add_device(&self) -> Result<u8> {
        Ok(0)
    }

    fn read(&self, _unit: u8, sector_idx: u32, buf: &mut [u8], num_sectors: u32) -> Result<()> {
        let bps = self.bytes_per_sector as usize;
        let data = self.data.lock().unwrap();
        let start = sector_idx as usize * bps;
        let len = num_sectors as usize * bps;
        buf[..len].copy_from_slice(&data[start..start + len]);
        Ok(())
    }

    fn write(
        &self,
        _unit: u8,
        sector_idx: u32,
        buf: &[u8],
        num_sectors: u32,
        repeat_same: bool,
    ) -> Result<()> {
        let bps = self.bytes_per_sector as usize;
        let mut data = self.data.lock().unwrap();
        let start = sector_idx as usize * bps;
        if repeat_same {
            for i in 0..num_sectors as usize {
                data[start + i * bps..start + (i + 1) * bps].copy_from_slice(&buf[..bps]);
            }
        } else {
            let len = num_sectors as usize * bps;
            data[start..start + len].copy_from_slice(&buf[..len]);
        }
        Ok(())
    }

    fn ioctl(&self, _unit: u8, _cmd: IoctlCmd) -> Result<IoctlResult> {
        Ok(IoctlResult::None)
    }

    fn get_status(&self, _unit: u8) -> DevStatus {
        DevStatus::Present
    }

    fn get_num_units(&self) -> u8 {
        1
    }

    fn get_device_info(&self, _unit: u8) -> Result<DevInfo> {
        Ok(DevInfo {
            num_sectors: self.num_sectors,
            bytes_per_sector: self.bytes_per_sector,
            sectors_per_track: 0,
            num_heads: 0,
        })
    }
}
