//! The SPI hardware-access vtable (spec §4.4): the one injected
//! dependency the serial-NOR physical layer needs, in the same
//! `&dyn Trait` style as [`crate::fat::charset::CharSet`] and
//! [`crate::lb::DeviceType`].
//!
//! Grounded in `original_source/emFile/FS/FS_NOR_PHY_SFDP.c`'s
//! `FS_NOR_HW_TYPE_SPI` function-pointer table (`pInst->pHWType->pfInit`,
//! `pfEnableCS`/`pfDisableCS`, `pfRead`/`pfWrite` and their `_x2`/`_x4`/
//! `Ex` bus-width variants, `pfDelay`, `pfLock`/`pfUnlock`). The four bus
//! widths collapse into a single `width: BusWidth` parameter per
//! transfer rather than four separate methods; a driver that can't do
//! dual/quad just returns `Err(Error::HwLayerNotSet)` for those widths,
//! mirroring the C side's `pfRead_x2 == NULL` checks.

use crate::error::{Error, Result};

/// Number of data lines used for one SPI transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    Single = 1,
    Dual = 2,
    Quad = 4,
}

/// One bound SPI bus instance backing a [`super::SfdpDevice`].
///
/// All methods take `&self`; implementations that need mutable state
/// (peripheral handles, DMA descriptors) use interior mutability, the same
/// convention [`crate::partition::PartitionDriver`] follows.
pub trait NorBus: Sync {
    /// Powers up / resets the bus and returns the negotiated clock
    /// frequency in kHz, or `0` on failure (`_Init`'s `Freq_kHz == 0`
    /// check).
    fn init(&self, unit: u8) -> u32;

    fn enable_cs(&self, unit: u8);
    fn disable_cs(&self, unit: u8);

    fn write(&self, unit: u8, data: &[u8], width: BusWidth) -> Result<()>;
    fn read(&self, unit: u8, data: &mut [u8], width: BusWidth) -> Result<()>;

    /// Blocks the caller for about `ms` milliseconds. Optional: the
    /// default reports "not supported", the same sentinel `_Delay`
    /// returns when `pfDelay` is `NULL`.
    fn delay_ms(&self, _unit: u8, _ms: u32) -> Result<()> {
        Err(Error::HwLayerNotSet)
    }

    /// Requests/releases exclusive access to the bus. Optional no-ops by
    /// default (`pfLock`/`pfUnlock == NULL`).
    fn lock(&self, _unit: u8) {}
    fn unlock(&self, _unit: u8) {}
}

fn select<R>(bus: &dyn NorBus, unit: u8, body: impl FnOnce() -> R) -> R {
    bus.enable_cs(unit);
    let r = body();
    bus.disable_cs(unit);
    r
}

/// Sends a one-byte command with no payload (`_CMD_Control`).
pub fn cmd_control(bus: &dyn NorBus, unit: u8, cmd: u8) -> Result<()> {
    select(bus, unit, || bus.write(unit, &[cmd], BusWidth::Single))
}

/// Sends a command byte followed by a write payload (`_CMD_WriteData`).
pub fn cmd_write_data(bus: &dyn NorBus, unit: u8, cmd: u8, data: &[u8], width: BusWidth) -> Result<()> {
    select(bus, unit, || {
        bus.write(unit, &[cmd], BusWidth::Single)?;
        bus.write(unit, data, width)
    })
}

/// Sends a command byte, then reads a response payload (`_CMD_ReadData`).
pub fn cmd_read_data(bus: &dyn NorBus, unit: u8, cmd: u8, data: &mut [u8], width: BusWidth) -> Result<()> {
    select(bus, unit, || {
        bus.write(unit, &[cmd], BusWidth::Single)?;
        bus.read(unit, data, width)
    })
}

/// Sends `cmd`, then `para` (e.g. an address plus dummy bytes), then
/// writes `data` (`_CMD_WriteDataWithAddr`).
pub fn cmd_write_data_with_addr(
    bus: &dyn NorBus,
    unit: u8,
    cmd: u8,
    para: &[u8],
    data: &[u8],
    width: BusWidth,
) -> Result<()> {
    select(bus, unit, || {
        bus.write(unit, &[cmd], BusWidth::Single)?;
        if !para.is_empty() {
            bus.write(unit, para, width)?;
        }
        if !data.is_empty() {
            bus.write(unit, data, width)?;
        }
        Ok(())
    })
}

/// Sends `cmd`, then `para`, then reads `data` (`_CMD_ReadDataWithAddr`).
pub fn cmd_read_data_with_addr(
    bus: &dyn NorBus,
    unit: u8,
    cmd: u8,
    para: &[u8],
    data: &mut [u8],
    width: BusWidth,
) -> Result<()> {
    select(bus, unit, || {
        bus.write(unit, &[cmd], BusWidth::Single)?;
        if !para.is_empty() {
            bus.write(unit, para, BusWidth::Single)?;
        }
        bus.read(unit, data, width)
    })
}
