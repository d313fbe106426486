//! GUID Partition Table discovery (spec §4.3 step 3).
//!
//! Implements the full discovery algorithm spec.md describes: header CRC
//! validation with a main/backup fallback, and an entry-array CRC
//! accumulated across sectors rather than trusted from one sector read.

use crate::error::{Error, Result};
use crate::lb::DeviceType;
use core::convert::TryInto;
use core::fmt::{self, Debug};

pub const GPT_SIGNATURE: [u8; 8] = *b"EFI PART";
const HEADER_CRC_OFFSET: usize = 16;

/// A "middle-endian" 128-bit GUID, as GPT stores them on disk.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid {
    first: u32,
    second: u16,
    third: u16,
    fourth: u16,
    fifth_p1: u16,
    fifth_p2: u32,
}

impl Guid {
    pub fn from_bytes(
        [a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p]: [u8; 16],
    ) -> Self {
        Self {
            first: u32::from_le_bytes([a, b, c, d]),
            second: u16::from_le_bytes([e, f]),
            third: u16::from_le_bytes([g, h]),
            fourth: u16::from_be_bytes([i, j]),
            fifth_p1: u16::from_be_bytes([k, l]),
            fifth_p2: u32::from_be_bytes([m, n, o, p]),
        }
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let [a, b, c, d] = self.first.to_le_bytes();
        let [e, f] = self.second.to_le_bytes();
        let [g, h] = self.third.to_le_bytes();
        let [i, j] = self.fourth.to_be_bytes();
        let [k, l] = self.fifth_p1.to_be_bytes();
        let [m, n, o, p] = self.fifth_p2.to_be_bytes();
        [a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p]
    }
}

impl Debug for Guid {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:04X}{:08X}",
            self.first, self.second, self.third, self.fourth, self.fifth_p1, self.fifth_p2,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct GptHeader {
    header_size: u32,
    entries_starting_lba: u64,
    num_entries: u32,
    entry_size: u32,
    entries_crc32: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GptEntry {
    pub type_guid: Guid,
    pub unique_guid: Guid,
    pub first_lba: u64,
    pub start_sector: u32,
    pub num_sectors: u32,
    pub attributes: u64,
}

fn read_sector(driver: &dyn DeviceType, unit: u8, sector: u32, buf: &mut [u8]) -> Result<()> {
    driver.read(unit, sector, buf, 1)
}

fn parse_and_validate_header(sector: &[u8]) -> Result<GptHeader> {
    if sector[0..8] != GPT_SIGNATURE {
        return Err(Error::Corrupt);
    }
    let header_size = u32::from_le_bytes(sector[12..16].try_into().unwrap());
    let stored_crc = u32::from_le_bytes(sector[16..20].try_into().unwrap());

    let mut crc_input = [0u8; 128];
    let len = (header_size as usize).min(crc_input.len()).min(sector.len());
    crc_input[..len].copy_from_slice(&sector[..len]);
    crc_input[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].copy_from_slice(&[0, 0, 0, 0]);
    let computed = crc::crc32::checksum_ieee(&crc_input[..len]);
    if computed != stored_crc {
        return Err(Error::Corrupt);
    }

    Ok(GptHeader {
        header_size,
        entries_starting_lba: u64::from_le_bytes(sector[72..80].try_into().unwrap()),
        num_entries: u32::from_le_bytes(sector[80..84].try_into().unwrap()),
        entry_size: u32::from_le_bytes(sector[84..88].try_into().unwrap()),
        entries_crc32: u32::from_le_bytes(sector[88..92].try_into().unwrap()),
    })
}

/// Reads the entry-array sectors sequentially, accumulating a CRC over
/// exactly `num_entries * entry_size` bytes (not sector padding), and
/// extracts `part_index`'s entry when the running offset crosses it
/// (spec §4.3 step 3).
fn read_and_verify_entries(
    driver: &dyn DeviceType,
    unit: u8,
    header: &GptHeader,
    bytes_per_sector: u32,
    part_index: u32,
) -> Result<GptEntry> {
    if part_index >= header.num_entries {
        return Err(Error::InvalidPara);
    }

    let total_bytes = header.num_entries as u64 * header.entry_size as u64;
    let mut remaining = total_bytes;
    let mut sector_idx = header.entries_starting_lba;
    let mut digest = crc32_incremental::Digest::new();
    let mut found: Option<GptEntry> = None;
    let mut byte_offset: u64 = 0;
    let target_offset = part_index as u64 * header.entry_size as u64;

    let mut sector_buf = [0u8; super::MAX_SECTOR_SIZE];
    while remaining > 0 {
        let take = remaining.min(bytes_per_sector as u64) as usize;
        read_sector(
            driver,
            unit,
            sector_idx.try_into().map_err(|_| Error::Corrupt)?,
            &mut sector_buf[..bytes_per_sector as usize],
        )?;
        digest.update(&sector_buf[..take]);

        let sector_start = byte_offset;
        let sector_end = byte_offset + take as u64;
        if found.is_none() && target_offset >= sector_start && target_offset < sector_end {
            let in_sector = (target_offset - sector_start) as usize;
            let entry_len = header.entry_size as usize;
            if in_sector + entry_len <= take {
                found = Some(parse_entry(&sector_buf[in_sector..in_sector + entry_len]));
            }
        }

        byte_offset = sector_end;
        remaining -= take as u64;
        sector_idx += 1;
    }

    if digest.finish() != header.entries_crc32 {
        return Err(Error::Corrupt);
    }

    found.ok_or(Error::Corrupt)
}

fn parse_entry(bytes: &[u8]) -> GptEntry {
    let first_lba = u64::from_le_bytes(bytes[32..40].try_into().unwrap());
    let last_lba = u64::from_le_bytes(bytes[40..48].try_into().unwrap());
    GptEntry {
        type_guid: Guid::from_bytes(bytes[0..16].try_into().unwrap()),
        unique_guid: Guid::from_bytes(bytes[16..32].try_into().unwrap()),
        first_lba,
        start_sector: first_lba as u32,
        num_sectors: (last_lba + 1).saturating_sub(first_lba) as u32,
        attributes: u64::from_le_bytes(bytes[48..56].try_into().unwrap()),
    }
}

/// Narrowing a GPT's 64-bit `FirstEntrySector`/LBA fields into this
/// crate's 32-bit sector indices must reject, not truncate, an
/// out-of-range disk (spec.md §9 Open Question: resolved as "reject").
/// Must be checked against the original 64-bit value, before any cast
/// to `u32` has already thrown away the high bits.
fn reject_if_narrowed(raw: u64) -> Result<u32> {
    if raw > u32::MAX as u64 {
        Err(Error::Corrupt)
    } else {
        Ok(raw as u32)
    }
}

/// Full discovery: try the main header (sector 1), and on any failure
/// fall back to the backup header at `backup_sector`.
pub fn discover(
    driver: &dyn DeviceType,
    unit: u8,
    bytes_per_sector: u32,
    backup_sector: u64,
    part_index: u32,
) -> Result<(u32, u32)> {
    let mut buf = [0u8; super::MAX_SECTOR_SIZE];

    let main = read_sector(driver, unit, 1, &mut buf[..bytes_per_sector as usize])
        .ok()
        .and_then(|()| parse_and_validate_header(&buf[..bytes_per_sector as usize]).ok())
        .and_then(|h| read_and_verify_entries(driver, unit, &h, bytes_per_sector, part_index).ok());

    let entry = match main {
        Some(e) => e,
        None => {
            let backup_idx: u32 = backup_sector.try_into().map_err(|_| Error::Corrupt)?;
            read_sector(driver, unit, backup_idx, &mut buf[..bytes_per_sector as usize])?;
            let header = parse_and_validate_header(&buf[..bytes_per_sector as usize])?;
            read_and_verify_entries(driver, unit, &header, bytes_per_sector, part_index)?
        }
    };

    let start = reject_if_narrowed(entry.first_lba)?;
    Ok((start, entry.num_sectors))
}

/// A byte-incremental IEEE CRC32 accumulator; `crc` 1.8.1's
/// `checksum_ieee` only takes a full buffer, so entry verification (which
/// streams sector by sector) rolls its own running digest via the
/// standard reflected CRC32 table algorithm.
mod crc32_incremental {
    pub struct Digest(u32);

    impl Digest {
        pub fn new() -> Self {
            Self(0xFFFF_FFFF)
        }

        pub fn update(&mut self, bytes: &[u8]) {
            for &b in bytes {
                let mut c = (self.0 ^ b as u32) & 0xFF;
                for _ in 0..8 {
                    c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
                }
                self.0 = c ^ (self.0 >> 8);
            }
        }

        pub fn finish(self) -> u32 {
            self.0 ^ 0xFFFF_FFFF
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_signature() {
        let sector = [0u8; 512];
        assert!(parse_and_validate_header(&sector).is_err());
    }

    #[test]
    fn incremental_crc_matches_known_vector() {
        let mut d = crc32_incremental::Digest::new();
        d.update(b"123456789");
        assert_eq!(d.finish(), 0xCBF4_3926);
    }
}
