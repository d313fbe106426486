//! Serial-NOR physical layer driven by JEDEC SFDP discovery (spec §4.4).
//!
//! Presents one SFDP-capable NOR chip as a [`crate::lb::DeviceType`], the
//! same way [`crate::partition::PartitionDriver`] presents one MBR/GPT
//! partition as one: lazy discovery on first access behind a
//! [`DriverLock`], with a sticky `HasError` latch once discovery or a
//! transfer fails.
//!
//! Grounded in `original_source/emFile/FS/FS_NOR_PHY_SFDP.c`: `_Init`
//! (discovery sequence), `_WaitForEndOfOperation`/busy polling,
//! `_WriteOff`/`_WritePageAligned` (page-boundary splitting and the
//! dual-chip odd-address padding trick), and `_EraseSector`.

pub mod bus;
pub mod params;

use crate::error::{Error, Result};
use crate::lb::{DevInfo, DevStatus, DeviceType, IoctlCmd, IoctlResult};
use crate::lock::DriverLock;
use bus::{cmd_control, cmd_read_data, cmd_read_data_with_addr, cmd_write_data_with_addr, BusWidth, NorBus};
use log::{debug, error, warn};
use params::{largest_erase_type, parse_basic_table, AddressBytes, DeviceParamEntry, EraseType, SfdpParams};

const CMD_READ_ID: u8 = 0x9F;
const CMD_READ_SFDP: u8 = 0x5A;
const CMD_RELEASE_POWER_DOWN: u8 = 0xAB;
const CMD_READ_STATUS: u8 = 0x05;
const CMD_WRITE_ENABLE: u8 = 0x06;
const CMD_WRITE_STATUS: u8 = 0x01;
const CMD_PAGE_PROGRAM: u8 = 0x02;
const CMD_ENTER_4BYTE_MODE: u8 = 0xB7;
const CMD_FAST_READ: u8 = 0x0B;

const STATUS_WIP: u8 = 0x01;
const BYTES_PER_PAGE: u32 = 256;

/// Floor and ceiling on the frequency-derived poll bound (spec §4.4.5):
/// a bounded retry count, not a wall-clock timeout, since the only clock
/// this crate has is the bus's own `delay_ms`. The floor keeps a
/// pathologically slow-reporting bus from timing out immediately; the
/// ceiling keeps a pathologically fast one from spinning forever.
const MIN_POLL_ITERATIONS: u32 = 16;
const MAX_POLL_ITERATIONS: u32 = 1_000_000;

/// Budget for one page-program completion, matched against the observed
/// bus frequency (`_Init`'s `FS_NOR_TIMEOUT_PAGE_WRITE`).
const TIMEOUT_PAGE_WRITE_MS: u32 = 5;
/// Budget for one sector-erase completion: erase is much slower than
/// program (`_Init`'s `FS_NOR_TIMEOUT_SECTOR_ERASE`).
const TIMEOUT_SECTOR_ERASE_MS: u32 = 3_000;

/// Historical HW layers returned the operating frequency in Hz instead of
/// the documented kHz; if converting back to Hz would overflow a 32-bit
/// value, the number was never kHz to begin with (`_Init`'s comment on
/// `pfInit`'s return value).
fn normalize_freq_khz(freq: u32) -> u32 {
    if freq > u32::MAX / 1000 {
        freq / 1000
    } else {
        freq
    }
}

/// Status requests obtainable in one millisecond at `freq_khz`, assuming
/// at least 16 bits exchanged per request (`_Init`'s `srpms`).
fn status_requests_per_ms(freq_khz: u32) -> u32 {
    ((freq_khz as u64 * 1000) >> 4) as u32 / 1000
}

/// `{StartAddr, NumBytes}` the caller wants to use as storage, before
/// alignment to erase-sector boundaries (spec §4.4.1 "used-subrange
/// computation").
#[derive(Debug, Clone, Copy)]
pub struct SfdpConfig {
    pub start_addr: u32,
    pub num_bytes: u32,
}

/// Observes every byte actually placed on the bus during a page write, so
/// a test can simulate a power loss mid-write and check the device is
/// still readable afterwards (spec §4.4.6). Compiled in only under
/// `test-hooks`; production builds pay nothing for it.
#[cfg(feature = "test-hooks")]
pub trait FailSafeTestHook: Sync {
    fn on_byte_written(&self, unit: u8, addr: u32);
}

#[derive(Debug, Clone, Copy)]
struct DiscoveredState {
    configured: bool,
    has_error: bool,
    erase: EraseType,
    address_bytes: AddressBytes,
    four_byte_mode: bool,
    start_addr_used: u32,
    num_bytes_used: u32,
    num_sectors: u32,
    bus_width_read: BusWidth,
    bus_width_write: BusWidth,
    poll_iterations_page_write: u32,
    poll_iterations_sector_erase: u32,
}

impl Default for DiscoveredState {
    fn default() -> Self {
        Self {
            configured: false,
            has_error: false,
            erase: EraseType::default(),
            address_bytes: AddressBytes::Three,
            four_byte_mode: false,
            start_addr_used: 0,
            num_bytes_used: 0,
            num_sectors: 0,
            bus_width_read: BusWidth::Single,
            bus_width_write: BusWidth::Single,
            poll_iterations_page_write: MAX_POLL_ITERATIONS,
            poll_iterations_sector_erase: MAX_POLL_ITERATIONS,
        }
    }
}

pub struct SfdpDevice<'b> {
    bus: &'b dyn NorBus,
    unit: u8,
    config: SfdpConfig,
    bytes_per_sector: u16,
    dual_device_mode: bool,
    device_param_list: &'b [DeviceParamEntry],
    allow_dual: bool,
    allow_quad: bool,
    state: DriverLock<DiscoveredState>,
    #[cfg(feature = "test-hooks")]
    fail_safe_hook: Option<&'b dyn FailSafeTestHook>,
}

impl<'b> SfdpDevice<'b> {
    pub fn new(bus: &'b dyn NorBus, unit: u8, config: SfdpConfig, bytes_per_sector: u16) -> Self {
        Self {
            bus,
            unit,
            config,
            bytes_per_sector,
            dual_device_mode: false,
            device_param_list: &[],
            allow_dual: false,
            allow_quad: false,
            state: DriverLock::new(DiscoveredState::default()),
            #[cfg(feature = "test-hooks")]
            fail_safe_hook: None,
        }
    }

    /// Two physically parallel chips sharing one address space (spec §4.4
    /// "dual-chip" mode): writes must stay 2-byte aligned, so this crate
    /// pads a lone leading/trailing odd byte with a `0xFF` placeholder
    /// that leaves the neighboring chip's existing data untouched
    /// (`_WritePageAligned`'s `abData[] = {0xFF, data}` trick).
    pub fn with_dual_device_mode(mut self, on: bool) -> Self {
        self.dual_device_mode = on;
        self
    }

    /// Per-vendor overrides walked during discovery before falling back
    /// to plain SFDP parsing (`FS_NOR_SFDP_SetDeviceParaList`).
    pub fn with_device_param_list(mut self, list: &'b [DeviceParamEntry]) -> Self {
        self.device_param_list = list;
        self
    }

    /// User allow-list for multi-I/O bus widths (spec §4.4.1 step 9):
    /// discovery never drives more lanes than both the device advertises
    /// and the caller permits here. Single-lane is always allowed.
    pub fn with_allowed_bus_widths(mut self, allow_dual: bool, allow_quad: bool) -> Self {
        self.allow_dual = allow_dual;
        self.allow_quad = allow_quad;
        self
    }

    #[cfg(feature = "test-hooks")]
    pub fn with_fail_safe_hook(mut self, hook: &'b dyn FailSafeTestHook) -> Self {
        self.fail_safe_hook = Some(hook);
        self
    }

    fn read_jedec_id(&self) -> Result<[u8; 3]> {
        let mut id = [0u8; 3];
        cmd_read_data(self.bus, self.unit, CMD_READ_ID, &mut id, BusWidth::Single)?;
        Ok(id)
    }

    /// Some NOR devices power up in deep power-down and report a garbage
    /// ID; one release-from-power-down retry is the same fallback
    /// `_Init` performs before giving up (`_ReleaseFromPowerDown`).
    fn release_from_power_down(&self) -> Result<()> {
        cmd_control(self.bus, self.unit, CMD_RELEASE_POWER_DOWN)
    }

    fn read_status(&self) -> Result<u8> {
        let mut status = [0u8];
        cmd_read_data(self.bus, self.unit, CMD_READ_STATUS, &mut status, BusWidth::Single)?;
        Ok(status[0])
    }

    /// Polls the status register until the write-in-progress bit clears
    /// (spec §4.4.5): a bounded loop over `max_iterations` (derived from
    /// the bus frequency, see `status_requests_per_ms`), `Err(Timeout)`
    /// if the bound is exceeded, `Err(Error::HwLayerNotSet)` propagated
    /// as-is if the bus itself faults rather than merely lacking an
    /// optional delay.
    fn wait_ready(&self, max_iterations: u32) -> Result<()> {
        for _ in 0..max_iterations {
            let status = self.read_status()?;
            if status & STATUS_WIP == 0 {
                return Ok(());
            }
            match self.bus.delay_ms(self.unit, 1) {
                Ok(()) | Err(Error::HwLayerNotSet) => {}
                Err(e) => return Err(e),
            }
        }
        Err(Error::Timeout)
    }

    fn address_bytes(&self, four_byte_mode: bool) -> usize {
        if four_byte_mode {
            4
        } else {
            3
        }
    }

    fn addr_bytes(&self, addr: u32, four_byte_mode: bool) -> [u8; 4] {
        let b = addr.to_be_bytes();
        if four_byte_mode {
            b
        } else {
            [b[1], b[2], b[3], 0]
        }
    }

    fn read_sfdp_params(&self) -> Result<SfdpParams> {
        let mut header = [0u8; 8];
        let mut para = [0u8; 5]; // 3 address bytes + 1 dummy byte
        para[0..3].copy_from_slice(&self.addr_bytes(0, false)[0..3]);
        cmd_read_data_with_addr(self.bus, self.unit, CMD_READ_SFDP, &para[0..4], &mut header, BusWidth::Single)?;
        if header[0..4] != params::SFDP_SIGNATURE {
            return Err(Error::Corrupt);
        }

        // Read the first parameter header (at byte offset 8) to get the
        // Basic Flash Parameter Table's pointer and length.
        let mut param_header = [0u8; 8];
        para[0..3].copy_from_slice(&self.addr_bytes(8, false)[0..3]);
        cmd_read_data_with_addr(self.bus, self.unit, CMD_READ_SFDP, &para[0..4], &mut param_header, BusWidth::Single)?;
        let table_len_dwords = param_header[3];
        let table_ptr = u32::from_le_bytes([param_header[4], param_header[5], param_header[6], 0]);

        let mut table = [0u8; 9 * 4];
        let table_len = (table_len_dwords as usize * 4).min(table.len());
        para[0..3].copy_from_slice(&self.addr_bytes(table_ptr, false)[0..3]);
        cmd_read_data_with_addr(self.bus, self.unit, CMD_READ_SFDP, &para[0..4], &mut table[..table_len], BusWidth::Single)?;
        parse_basic_table(&table[..table_len])
    }

    fn set_address_mode(&self, four_byte_mode: bool) -> Result<()> {
        if four_byte_mode {
            cmd_control(self.bus, self.unit, CMD_ENTER_4BYTE_MODE)?;
        }
        Ok(())
    }

    fn remove_write_protection(&self, max_poll_iterations: u32) -> Result<()> {
        cmd_control(self.bus, self.unit, CMD_WRITE_ENABLE)?;
        cmd_write_data_with_addr(self.bus, self.unit, CMD_WRITE_STATUS, &[], &[0x00], BusWidth::Single)?;
        self.wait_ready(max_poll_iterations)
    }

    /// Walks the configured per-vendor override list for a match on this
    /// device's JEDEC manufacturer/density bytes (spec §4.4.1 step 2).
    fn lookup_device_params(&self, jedec_id: [u8; 3]) -> Option<SfdpParams> {
        self.device_param_list.iter().find(|entry| entry.matches(jedec_id)).map(|entry| entry.params)
    }

    /// Storage-area computation (spec §4.4.1): aligns `config`'s
    /// `{StartAddr, NumBytes}` to whole erase sectors (`_CalcStorageArea`,
    /// simplified to this crate's single uniform erase-sector size
    /// instead of the original's heterogeneous sector-block list).
    fn calc_storage_area(&self, erase: EraseType, total_bytes: u32) -> Result<(u32, u32, u32)> {
        if erase.size == 0 {
            return Err(Error::Corrupt);
        }
        let skip = self.config.start_addr;
        let start_addr_used = (skip / erase.size) * erase.size
            + if skip % erase.size != 0 { erase.size } else { 0 };
        if start_addr_used >= total_bytes {
            return Err(Error::Corrupt);
        }
        let available = total_bytes - start_addr_used;
        let requested = self.config.num_bytes.min(available);
        let num_sectors = requested / erase.size;
        if num_sectors == 0 {
            return Err(Error::Corrupt);
        }
        Ok((start_addr_used, num_sectors * erase.size, num_sectors))
    }

    fn init(&self) -> Result<DiscoveredState> {
        let freq_khz = normalize_freq_khz(self.bus.init(self.unit));
        if freq_khz == 0 {
            error!("sfdp: unit {}: hardware init failed", self.unit);
            return Err(Error::InitFailure);
        }

        let srpms = status_requests_per_ms(freq_khz).max(1);
        let poll_iterations_page_write =
            (srpms * TIMEOUT_PAGE_WRITE_MS).clamp(MIN_POLL_ITERATIONS, MAX_POLL_ITERATIONS);
        let poll_iterations_sector_erase =
            (srpms * TIMEOUT_SECTOR_ERASE_MS).clamp(MIN_POLL_ITERATIONS, MAX_POLL_ITERATIONS);

        let jedec_id = match self.read_jedec_id() {
            Ok(id) => id,
            Err(_) => {
                debug!("sfdp: unit {}: no response, retrying after power-down release", self.unit);
                self.release_from_power_down()?;
                self.read_jedec_id()?
            }
        };

        // Wait out any program/erase left running from before reset.
        self.wait_ready(poll_iterations_sector_erase)?;

        let params = match self.lookup_device_params(jedec_id) {
            Some(p) => p,
            None => self.read_sfdp_params().map_err(|e| {
                warn!("sfdp: unit {}: device does not support SFDP", self.unit);
                e
            })?,
        };
        let erase = largest_erase_type(&params)?;
        let (start_addr_used, num_bytes_used, num_sectors) = self.calc_storage_area(erase, params.total_bytes)?;

        let four_byte_mode = matches!(params.address_bytes, AddressBytes::Four);
        self.set_address_mode(four_byte_mode)?;
        self.remove_write_protection(poll_iterations_page_write)?;

        let bus_width_read = if self.allow_quad && params.bus_width_read == BusWidth::Quad {
            BusWidth::Quad
        } else if self.allow_dual && params.bus_width_read != BusWidth::Single {
            BusWidth::Dual
        } else {
            BusWidth::Single
        };
        // SFDP discovery alone never raises the write width above single
        // lane; only a matching vendor override does (`_ApplyParaConf`).
        let bus_width_write = BusWidth::Single;

        Ok(DiscoveredState {
            configured: true,
            has_error: false,
            erase,
            address_bytes: params.address_bytes,
            four_byte_mode,
            start_addr_used,
            num_bytes_used,
            num_sectors,
            bus_width_read,
            bus_width_write,
            poll_iterations_page_write,
            poll_iterations_sector_erase,
        })
    }

    fn ensure_init(&self) -> Result<DiscoveredState> {
        let cached = self.state.with(|s| if s.configured && !s.has_error { Some(*s) } else { None });
        if let Some(s) = cached {
            return Ok(s);
        }
        match self.init() {
            Ok(s) => {
                self.state.with(|slot| *slot = s);
                Ok(s)
            }
            Err(e) => {
                self.state.with(|slot| slot.has_error = true);
                error!("sfdp: unit {}: discovery failed: {}", self.unit, e);
                Err(e)
            }
        }
    }

    fn byte_offset(&self, sector_idx: u32, state: &DiscoveredState) -> u32 {
        state.start_addr_used + sector_idx * self.bytes_per_sector as u32
    }

    /// Reads `num_bytes` starting at byte offset `addr` (spec §4.4.2):
    /// one fast-read command with a dummy byte, the device streams the
    /// rest.
    fn read_bytes(&self, state: &DiscoveredState, addr: u32, data: &mut [u8]) -> Result<()> {
        let mut para = [0u8; 5];
        let ab = self.addr_bytes(addr, state.four_byte_mode);
        let n = self.address_bytes(state.four_byte_mode);
        para[..n].copy_from_slice(&ab[..n]);
        // one dummy byte for fast read
        cmd_read_data_with_addr(self.bus, self.unit, CMD_FAST_READ, &para[..n + 1], data, state.bus_width_read)
    }

    /// Writes one sub-page-aligned chunk and waits for completion
    /// (`_WritePage` + `_WaitForEndOfOperation`), honoring dual-chip
    /// addressing when configured (`_WritePageAligned`).
    fn write_page_aligned(&self, state: &DiscoveredState, addr: u32, data: &[u8]) -> Result<()> {
        if !self.dual_device_mode {
            return self.write_page_raw(state, addr, data);
        }
        let (mut addr, mut data) = (addr, data);
        if addr & 1 != 0 {
            let padded = [0xFF, data[0]];
            self.write_page_raw(state, addr - 1, &padded)?;
            addr += 1;
            data = &data[1..];
        }
        let aligned_len = data.len() & !1usize;
        if aligned_len != 0 {
            self.write_page_raw(state, addr, &data[..aligned_len])?;
            addr += aligned_len as u32;
            data = &data[aligned_len..];
        }
        if !data.is_empty() {
            let padded = [data[0], 0xFF];
            self.write_page_raw(state, addr, &padded)?;
        }
        Ok(())
    }

    fn write_page_raw(&self, state: &DiscoveredState, addr: u32, data: &[u8]) -> Result<()> {
        cmd_control(self.bus, self.unit, CMD_WRITE_ENABLE)?;
        let mut para = [0u8; 4];
        let ab = self.addr_bytes(addr, state.four_byte_mode);
        let n = self.address_bytes(state.four_byte_mode);
        para[..n].copy_from_slice(&ab[..n]);
        cmd_write_data_with_addr(self.bus, self.unit, CMD_PAGE_PROGRAM, &para[..n], data, state.bus_width_write)?;
        #[cfg(feature = "test-hooks")]
        if let Some(hook) = self.fail_safe_hook {
            for (i, _) in data.iter().enumerate() {
                hook.on_byte_written(self.unit, addr + i as u32);
            }
        }
        self.wait_ready(state.poll_iterations_page_write)
    }

    /// Writes `data` at byte offset `addr`, splitting at page boundaries
    /// as needed (spec §4.4.3, `_WriteOff`).
    fn write_bytes(&self, state: &DiscoveredState, addr: u32, data: &[u8]) -> Result<()> {
        let (mut addr, mut data) = (addr, data);
        let in_page = addr & (BYTES_PER_PAGE - 1);
        if in_page != 0 {
            let first = (BYTES_PER_PAGE - in_page).min(data.len() as u32) as usize;
            self.write_page_aligned(state, addr, &data[..first])?;
            addr += first as u32;
            data = &data[first..];
        }
        while !data.is_empty() {
            let chunk = (data.len() as u32).min(BYTES_PER_PAGE) as usize;
            self.write_page_aligned(state, addr, &data[..chunk])?;
            addr += chunk as u32;
            data = &data[chunk..];
        }
        Ok(())
    }

    /// Erases the physical sector containing byte offset `addr` (spec
    /// §4.4.4, `_EraseSector`).
    fn erase_sector(&self, state: &DiscoveredState, addr: u32) -> Result<()> {
        cmd_control(self.bus, self.unit, CMD_WRITE_ENABLE)?;
        let mut para = [0u8; 4];
        let ab = self.addr_bytes(addr, state.four_byte_mode);
        let n = self.address_bytes(state.four_byte_mode);
        para[..n].copy_from_slice(&ab[..n]);
        cmd_write_data_with_addr(self.bus, self.unit, state.erase.opcode, &para[..n], &[], state.bus_width_write)?;
        self.wait_ready(state.poll_iterations_sector_erase)
    }
}

impl<'b> DeviceType for SfdpDevice<'b> {
    fn name(&self, _unit: u8) -> &str {
        "nor-sfdp"
    }

    fn add_device(&self) -> Result<u8> {
        Ok(self.unit)
    }

    fn read(&self, _unit: u8, sector_idx: u32, buf: &mut [u8], num_sectors: u32) -> Result<()> {
        if self.state.with(|s| s.has_error) {
            return Err(Error::HasErrorLatched);
        }
        let state = self.ensure_init()?;
        if sector_idx.checked_add(num_sectors).map_or(true, |end| end > state.num_sectors) {
            return Err(Error::InvalidPara);
        }
        let addr = self.byte_offset(sector_idx, &state);
        let n = num_sectors as usize * self.bytes_per_sector as usize;
        self.read_bytes(&state, addr, &mut buf[..n])
    }

    fn write(&self, _unit: u8, sector_idx: u32, buf: &[u8], num_sectors: u32, _repeat_same: bool) -> Result<()> {
        if self.state.with(|s| s.has_error) {
            return Err(Error::HasErrorLatched);
        }
        let state = self.ensure_init()?;
        if sector_idx.checked_add(num_sectors).map_or(true, |end| end > state.num_sectors) {
            return Err(Error::InvalidPara);
        }
        let addr = self.byte_offset(sector_idx, &state);
        let n = num_sectors as usize * self.bytes_per_sector as usize;
        self.write_bytes(&state, addr, &buf[..n])
    }

    fn ioctl(&self, unit: u8, cmd: IoctlCmd) -> Result<IoctlResult> {
        match cmd {
            IoctlCmd::GetDevInfo => {
                let state = self.ensure_init()?;
                Ok(IoctlResult::DevInfo(DevInfo {
                    num_sectors: state.num_sectors,
                    bytes_per_sector: self.bytes_per_sector,
                    sectors_per_track: 0,
                    num_heads: 0,
                }))
            }
            IoctlCmd::Unmount | IoctlCmd::UnmountForced => {
                self.state.with(|s| *s = DiscoveredState::default());
                let _ = unit;
                Ok(IoctlResult::None)
            }
            IoctlCmd::FreeSectors { .. } | IoctlCmd::CacheFreeSectors { .. } => Ok(IoctlResult::None),
            IoctlCmd::Sync => Ok(IoctlResult::None),
            _ => Err(Error::IoctlFailure),
        }
    }

    fn init_medium(&self, _unit: u8) -> Result<()> {
        self.ensure_init().map(|_| ())
    }

    fn get_status(&self, _unit: u8) -> DevStatus {
        self.state.with(|s| {
            if s.has_error {
                DevStatus::NotPresent
            } else if s.configured {
                DevStatus::Present
            } else {
                DevStatus::Unknown
            }
        })
    }

    fn get_num_units(&self) -> u8 {
        1
    }

    fn get_device_info(&self, _unit: u8) -> Result<DevInfo> {
        let state = self.ensure_init()?;
        Ok(DevInfo {
            num_sectors: state.num_sectors,
            bytes_per_sector: self.bytes_per_sector,
            sectors_per_track: 0,
            num_heads: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    struct FakeBus {
        writes: AtomicU32,
    }

    impl NorBus for FakeBus {
        fn init(&self, _unit: u8) -> u32 {
            1000
        }
        fn enable_cs(&self, _unit: u8) {}
        fn disable_cs(&self, _unit: u8) {}
        fn write(&self, _unit: u8, data: &[u8], _width: BusWidth) -> Result<()> {
            self.writes.fetch_add(data.len() as u32, Ordering::Relaxed);
            Ok(())
        }
        fn read(&self, _unit: u8, data: &mut [u8], _width: BusWidth) -> Result<()> {
            for b in data.iter_mut() {
                *b = 0;
            }
            Ok(())
        }
    }

    #[test]
    fn fake_bus_counts_writes() {
        let bus = FakeBus { writes: AtomicU32::new(0) };
        bus.write(0, &[1, 2, 3], BusWidth::Single).unwrap();
        assert_eq!(bus.writes.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn storage_area_aligns_to_erase_sectors() {
        let bus = FakeBus { writes: AtomicU32::new(0) };
        let dev = SfdpDevice::new(&bus, 0, SfdpConfig { start_addr: 100, num_bytes: 1 << 20 }, 512);
        let erase = EraseType { opcode: 0x20, size: 4096 };
        let (start, bytes, sectors) = dev.calc_storage_area(erase, 16 * 1024 * 1024).unwrap();
        assert_eq!(start, 4096);
        assert_eq!(sectors, bytes / 4096);
    }
}
