//! Pool allocators for the open-file list and directory-handle pool (spec
//! §3.2, §8 invariant 3; Design Notes "Pool allocators" -- "replace
//! [C's fixed arrays] with... an arena + index-based handles... but must
//! preserve the ability to iterate all live handles under a lock").
//!
//! Sized by a const generic via the teacher's `generic-array`/`typenum`
//! idiom (`examples/rrbutani-fatfs/src/util/bitmap.rs`), matching the
//! compile-time-bounded semantics the firmware relies on.

use crate::util::{BitMap, BitMapLen};
use generic_array::{ArrayLength, GenericArray};

/// The `(SectorIndex, DirEntryIndex)` key identifying one on-disk
/// directory entry, used by the delete-while-open check (spec §4.2.4
/// step 1, §8 invariant 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirEntryPos {
    pub sector: u32,
    pub dir_entry_index: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFileEntry {
    pub volume_id: u8,
    pub pos: DirEntryPos,
    pub first_cluster: u32,
    pub file_size: u32,
    pub file_position: u32,
    pub read_only: bool,
}

/// A handle into the open-file table; opaque to callers beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(pub(crate) usize);

/// The process-wide open-file list (spec §3.2 "Directory handles...
/// form a small pre-allocated pool"; the open-file list shares the same
/// shape). Allocation/lookup is meant to run under the system micro-lock
/// (spec §5); this type itself is not synchronized -- callers wrap it in
/// [`crate::lock::SysLock`].
pub struct FileTable<N: BitMapLen + ArrayLength<OpenFileEntry>> {
    in_use: BitMap<N>,
    entries: GenericArray<OpenFileEntry, N>,
}

impl<N: BitMapLen + ArrayLength<OpenFileEntry>> FileTable<N> {
    pub fn new() -> Self {
        Self {
            in_use: BitMap::new(),
            entries: GenericArray::default(),
        }
    }

    pub fn open(&mut self, entry: OpenFileEntry) -> crate::error::Result<FileHandle> {
        let idx = self
            .in_use
            .next_empty_bit()
            .map_err(|()| crate::error::Error::DirFull)?;
        self.in_use.set(idx, true).unwrap();
        self.entries[idx] = entry;
        Ok(FileHandle(idx))
    }

    pub fn close(&mut self, handle: FileHandle) {
        let _ = self.in_use.set(handle.0, false);
    }

    pub fn get(&self, handle: FileHandle) -> &OpenFileEntry {
        &self.entries[handle.0]
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> &mut OpenFileEntry {
        &mut self.entries[handle.0]
    }

    /// Iterates all live entries, the operation the delete-while-open
    /// check and the Design Notes' pool-allocator guidance both need.
    pub fn iter_live(&self) -> impl Iterator<Item = &OpenFileEntry> {
        (0..self.in_use.length())
            .filter(move |&i| self.in_use.get(i).unwrap_or(false))
            .map(move |i| &self.entries[i])
    }

    /// `true` if some open handle on `volume_id` already targets `pos`
    /// (spec §4.2.4 step 1).
    pub fn is_open(&self, volume_id: u8, pos: DirEntryPos) -> bool {
        self.iter_live()
            .any(|e| e.volume_id == volume_id && e.pos == pos)
    }
}

impl<N: BitMapLen + ArrayLength<OpenFileEntry>> super::OpenFileQuery for FileTable<N> {
    fn is_open(&self, volume_id: u8, pos: DirEntryPos) -> bool {
        FileTable::is_open(self, volume_id, pos)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirHandleEntry {
    pub volume_id: u8,
    pub cluster: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirHandle(pub(crate) usize);

pub struct DirHandlePool<N: BitMapLen + ArrayLength<DirHandleEntry>> {
    in_use: BitMap<N>,
    entries: GenericArray<DirHandleEntry, N>,
}

impl<N: BitMapLen + ArrayLength<DirHandleEntry>> DirHandlePool<N> {
    pub fn new() -> Self {
        Self {
            in_use: BitMap::new(),
            entries: GenericArray::default(),
        }
    }

    pub fn alloc(&mut self, entry: DirHandleEntry) -> crate::error::Result<DirHandle> {
        let idx = self
            .in_use
            .next_empty_bit()
            .map_err(|()| crate::error::Error::DirFull)?;
        self.in_use.set(idx, true).unwrap();
        self.entries[idx] = entry;
        Ok(DirHandle(idx))
    }

    pub fn free(&mut self, handle: DirHandle) {
        let _ = self.in_use.set(handle.0, false);
    }

    pub fn get(&self, handle: DirHandle) -> &DirHandleEntry {
        &self.entries[handle.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typenum::consts::U8;

    #[test]
    fn detects_open_file_by_pos() {
        let mut table: FileTable<U8> = FileTable::new();
        let pos = DirEntryPos { sector: 10, dir_entry_index: 3 };
        let h = table
            .open(OpenFileEntry { volume_id: 0, pos, ..Default::default() })
            .unwrap();
        assert!(table.is_open(0, pos));
        table.close(h);
        assert!(!table.is_open(0, pos));
    }

    #[test]
    fn pool_exhaustion_errors() {
        let mut table: FileTable<U8> = FileTable::new();
        for _ in 0..8 {
            table.open(OpenFileEntry::default()).unwrap();
        }
        assert!(table.open(OpenFileEntry::default()).is_err());
    }
}
