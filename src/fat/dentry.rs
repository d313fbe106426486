//! On-media directory entry formats (spec §3.1 `DirEntry83`/`DirEntryFAT`,
//! §6.3), grounded in `examples/rrbutani-fatfs/src/fat/dir.rs`'s
//! `Attribute`/`AttributeSet`/`DirEntry` but generalized: attributes gain
//! the full bit set named in spec.md, and timestamps round-trip through a
//! `FatTimestamp`/`Clock` pair (SPEC_FULL.md §2) instead of being carried
//! as opaque `u16`s.

use core::convert::TryInto;

pub const DIR_ENTRY_LEN: usize = 32;

pub const FIRST_BYTE_END: u8 = 0x00;
pub const FIRST_BYTE_DELETED: u8 = 0xE5;
pub const FIRST_BYTE_REAL_E5: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    ReadOnly = 0x01,
    Hidden = 0x02,
    System = 0x04,
    VolumeId = 0x08,
    Directory = 0x10,
    Archive = 0x20,
}

/// The long-file-name attribute value (`ReadOnly|Hidden|System|VolumeId`)
/// used to recognize (and, on delete, erase) LFN entries per
/// `original_source/emFile/FS/FS_FAT_Open.c`'s `FS_FAT_DeleteFileOrDir`.
pub const ATTR_LONG_NAME: u8 = Attribute::ReadOnly as u8
    | Attribute::Hidden as u8
    | Attribute::System as u8
    | Attribute::VolumeId as u8;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeSet {
    pub bits: u8,
}

impl AttributeSet {
    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub fn has(&self, attr: Attribute) -> bool {
        self.bits & (attr as u8) != 0
    }

    pub fn set(&mut self, attr: Attribute, on: bool) {
        if on {
            self.bits |= attr as u8;
        } else {
            self.bits &= !(attr as u8);
        }
    }

    pub fn is_dir(&self) -> bool {
        self.has(Attribute::Directory)
    }

    pub fn is_long_name(&self) -> bool {
        self.bits & ATTR_LONG_NAME == ATTR_LONG_NAME
    }

    pub fn is_read_only(&self) -> bool {
        self.has(Attribute::ReadOnly)
    }
}

/// DOS date/time packed `u16` pair, as carried by `DirEntryFAT` (spec
/// §3.1). Not asked for by spec.md directly, but needed to round-trip
/// `DirEntryFAT` faithfully (SPEC_FULL.md §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
}

impl FatTimestamp {
    pub fn from_parts(year: u16, month: u8, day: u8, hour: u8, min: u8, sec: u8) -> Self {
        let date = ((year.saturating_sub(1980)) << 9) | ((month as u16) << 5) | (day as u16);
        let time = ((hour as u16) << 11) | ((min as u16) << 5) | ((sec as u16) / 2);
        Self { date, time }
    }

    pub fn year(&self) -> u16 {
        (self.date >> 9) + 1980
    }
    pub fn month(&self) -> u8 {
        ((self.date >> 5) & 0xF) as u8
    }
    pub fn day(&self) -> u8 {
        (self.date & 0x1F) as u8
    }
    pub fn hour(&self) -> u8 {
        ((self.time >> 11) & 0x1F) as u8
    }
    pub fn minute(&self) -> u8 {
        ((self.time >> 5) & 0x3F) as u8
    }
    pub fn second(&self) -> u8 {
        ((self.time & 0x1F) * 2) as u8
    }
}

/// Injected "now" source, following the same inversion-of-control
/// `CharSet` uses (Design Notes, "Dynamic character set").
pub trait Clock {
    fn now(&self) -> FatTimestamp;
}

/// Fixed-epoch clock for `no_std`/test builds that have no wall-clock
/// source.
pub struct NullClock;

impl Clock for NullClock {
    fn now(&self) -> FatTimestamp {
        FatTimestamp::from_parts(1980, 1, 1, 0, 0, 0)
    }
}

/// The 32-byte on-disk directory entry (spec §3.1 `DirEntryFAT`, §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntryFat {
    pub short_name: [u8; 11],
    pub attributes: AttributeSet,
    pub creation_time_tenth: u8,
    pub creation: FatTimestamp,
    pub last_access_date: u16,
    pub last_write: FatTimestamp,
    pub first_cluster_hi: u16,
    pub first_cluster_lo: u16,
    pub file_size: u32,
}

impl DirEntryFat {
    pub fn empty() -> Self {
        Self {
            short_name: [0; 11],
            attributes: AttributeSet::default(),
            creation_time_tenth: 0,
            creation: FatTimestamp::default(),
            last_access_date: 0,
            last_write: FatTimestamp::default(),
            first_cluster_hi: 0,
            first_cluster_lo: 0,
            file_size: 0,
        }
    }

    pub fn state(&self) -> EntryState {
        match self.short_name[0] {
            FIRST_BYTE_END => EntryState::End,
            FIRST_BYTE_DELETED => EntryState::Deleted,
            _ => EntryState::Exists,
        }
    }

    pub fn first_cluster(&self) -> u32 {
        (self.first_cluster_hi as u32) << 16 | self.first_cluster_lo as u32
    }

    pub fn set_first_cluster(&mut self, cluster: u32) {
        self.first_cluster_hi = (cluster >> 16) as u16;
        self.first_cluster_lo = cluster as u16;
    }

    pub fn read(bytes: &[u8; DIR_ENTRY_LEN]) -> Self {
        macro_rules! e {
            ($ty:ty, $offset:literal) => {
                <$ty>::from_le_bytes(
                    bytes[$offset..$offset + core::mem::size_of::<$ty>()]
                        .try_into()
                        .unwrap(),
                )
            };
        }
        Self {
            short_name: bytes[0..11].try_into().unwrap(),
            attributes: AttributeSet::new(bytes[11]),
            creation_time_tenth: bytes[13],
            creation: FatTimestamp {
                time: e!(u16, 14),
                date: e!(u16, 16),
            },
            last_access_date: e!(u16, 18),
            first_cluster_hi: e!(u16, 20),
            last_write: FatTimestamp {
                time: e!(u16, 22),
                date: e!(u16, 24),
            },
            first_cluster_lo: e!(u16, 26),
            file_size: e!(u32, 28),
        }
    }

    pub fn write(&self, bytes: &mut [u8; DIR_ENTRY_LEN]) {
        bytes[0..11].copy_from_slice(&self.short_name);
        bytes[11] = self.attributes.bits;
        bytes[12] = 0;
        bytes[13] = self.creation_time_tenth;
        bytes[14..16].copy_from_slice(&self.creation.time.to_le_bytes());
        bytes[16..18].copy_from_slice(&self.creation.date.to_le_bytes());
        bytes[18..20].copy_from_slice(&self.last_access_date.to_le_bytes());
        bytes[20..22].copy_from_slice(&self.first_cluster_hi.to_le_bytes());
        bytes[22..24].copy_from_slice(&self.last_write.time.to_le_bytes());
        bytes[24..26].copy_from_slice(&self.last_write.date.to_le_bytes());
        bytes[26..28].copy_from_slice(&self.first_cluster_lo.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.file_size.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Exists,
    Deleted,
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut e = DirEntryFat::empty();
        e.short_name = *b"README  TXT";
        e.attributes.set(Attribute::Archive, true);
        e.set_first_cluster(0x0001_2345);
        e.file_size = 42;

        let mut bytes = [0u8; DIR_ENTRY_LEN];
        e.write(&mut bytes);
        let back = DirEntryFat::read(&bytes);
        assert_eq!(e, back);
        assert_eq!(back.first_cluster(), 0x0001_2345);
    }

    #[test]
    fn timestamp_round_trips() {
        let ts = FatTimestamp::from_parts(2024, 3, 14, 9, 26, 40);
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 14);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.minute(), 26);
        assert_eq!(ts.second(), 40);
    }
}
