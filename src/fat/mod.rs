//! Top-level FAT engine: volume mount, directory lookup, path traversal,
//! and the open/create/delete protocols (spec §4.2.4, §4.2.5, §4.2.6).
//!
//! The module layout (boot sector -> table -> dirpos -> dentry) follows
//! `examples/rrbutani-fatfs/src/fat/mod.rs`; the dispatch logic itself is
//! grounded in `original_source/emFile/FS/FS_FAT_Open.c`'s
//! `FS_FAT_FindPath` / `FS_FAT_CreateFileOrDir` / `FS_FAT_DeleteFileOrDir`,
//! reshaped from one C dispatcher into the operations below.

pub mod boot_sector;
pub mod charset;
pub mod dentry;
pub mod dirpos;
pub mod file;
pub mod sector_buffer;
pub mod shortname;
pub mod table;

use crate::error::{Error, Result};
use crate::lb::{Lb, Partition, SectorType};
use boot_sector::BootSector;
use charset::CharSet;
use dentry::{Clock, DirEntryFat, EntryState};
use dirpos::DirPos;
use file::DirEntryPos;
use log::warn;
use shortname::ShortName;
use table::FatGeometry;

/// Long-file-name entries are limited to 13 UCS-2 characters each and a
/// name to 255 characters, so a contiguous LFN run before one 8.3 entry
/// never exceeds 20 entries (`255 / 13`, rounded up).
const MAX_LFN_PREDECESSORS: usize = 20;

/// The run of long-name entries immediately preceding a resolved 8.3
/// entry, collected while scanning so the delete protocol can scrub them
/// without a second pass over the directory (spec §4.2.4 step 3).
#[derive(Debug, Clone, Copy)]
struct LfnRun {
    entries: [Option<(DirPos, u32)>; MAX_LFN_PREDECESSORS],
    len: usize,
}

impl Default for LfnRun {
    fn default() -> Self {
        Self { entries: [None; MAX_LFN_PREDECESSORS], len: 0 }
    }
}

impl LfnRun {
    fn push(&mut self, pos: DirPos, sector: u32) {
        if self.len < MAX_LFN_PREDECESSORS {
            self.entries[self.len] = Some((pos, sector));
            self.len += 1;
        } else {
            self.entries.copy_within(1.., 0);
            self.entries[MAX_LFN_PREDECESSORS - 1] = Some((pos, sector));
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn iter(&self) -> impl Iterator<Item = &(DirPos, u32)> {
        self.entries[..self.len].iter().filter_map(Option::as_ref)
    }
}

/// What the caller wants the open/create dispatch to do, mirroring the
/// `{DoDelete, DoOpen, DoCreate}` flag set (spec §4.2.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub do_delete: bool,
    pub do_open: bool,
    pub do_create: bool,
    pub write_access: bool,
    pub append: bool,
    pub create_dir: bool,
}

/// Enough state to construct an `OpenFileEntry` (spec §3.2) for a
/// successfully opened or created file.
#[derive(Debug, Clone, Copy)]
pub struct OpenOutcome {
    pub pos: DirEntryPos,
    pub first_cluster: u32,
    pub file_size: u32,
    pub is_dir: bool,
    pub file_position: u32,
}

/// A query into the process-wide open-file list, used by the delete
/// protocol's step 1 (spec §4.2.4). [`file::FileTable`] implements this
/// directly; kept as a trait so the FAT engine doesn't need to know the
/// table's compile-time capacity.
pub trait OpenFileQuery {
    fn is_open(&self, volume_id: u8, pos: DirEntryPos) -> bool;
}

/// The result of `find_path`: where the leaf component lives (its parent
/// directory's first cluster) and, if found, its existing entry.
#[derive(Debug, Clone, Copy)]
struct FoundPath {
    parent_cluster: u32,
    leaf_short_name: ShortName,
    existing: Option<(DirPos, u32, DirEntryFat, LfnRun)>,
}

/// A mounted FAT12/16/32 volume sitting on top of one partition of the LB
/// layer (spec §4.2). Owns the sticky `HasError` latch (spec §4.2.6): once
/// any operation fails, every subsequent call short-circuits until
/// [`Volume::clear_error_latch`] runs (driven by an explicit unmount).
pub struct Volume<'d> {
    lb: Lb<'d>,
    part: Partition,
    geo: FatGeometry,
    root_cluster: u32,
    fixed_root_start_sector: u32,
    fixed_root_entry_cnt: u32,
    volume_id: u8,
    accept_multiple_dots: bool,
    has_error: bool,
}

impl<'d> Volume<'d> {
    /// Reads the boot sector and derives the volume's static geometry
    /// (spec §4.2.2).
    pub fn mount(mut lb: Lb<'d>, part: Partition, volume_id: u8) -> Result<Self> {
        let bps = lb.get_sector_size()? as usize;
        let mut sector = [0u8; sector_buffer::MAX_SECTOR_SIZE];
        lb.read_part(part, 0, &mut sector[..bps], SectorType::Management)?;
        let boot = BootSector::read(&sector[..bps]);
        let (geo, root_cluster, fixed_root_start_sector, fixed_root_entry_cnt) =
            boot.geometry(part.start_sector);

        Ok(Self {
            lb,
            part,
            geo,
            root_cluster,
            fixed_root_start_sector,
            fixed_root_entry_cnt,
            volume_id,
            accept_multiple_dots: false,
            has_error: false,
        })
    }

    pub fn geometry(&self) -> &FatGeometry {
        &self.geo
    }

    pub fn volume_id(&self) -> u8 {
        self.volume_id
    }

    /// Legacy compatibility flag for short-name encoding (spec §4.2.1
    /// rule 2).
    pub fn set_accept_multiple_dots(&mut self, accept: bool) {
        self.accept_multiple_dots = accept;
    }

    pub fn clear_error_latch(&mut self) {
        self.has_error = false;
    }

    fn check_latch(&self) -> Result<()> {
        if self.has_error {
            Err(Error::HasErrorLatched)
        } else {
            Ok(())
        }
    }

    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.has_error = true;
        }
        result
    }

    fn root_dir_cluster_arg(&self) -> u32 {
        if self.fixed_root_entry_cnt > 0 {
            0
        } else {
            self.root_cluster
        }
    }

    /// Scans one directory (by first cluster, or `0` for the volume root)
    /// for `short_name`, skipping deleted entries and collecting any
    /// contiguous run of long-name entries immediately preceding the
    /// match (spec §4.2.4 step 3).
    fn lookup_in_dir(
        &mut self,
        dir_cluster: u32,
        short_name: &ShortName,
        scratch: &mut [u8],
    ) -> Result<Option<(DirPos, u32, DirEntryFat, LfnRun)>> {
        let mut pos =
            dirpos::init_dir_scan(&self.geo, self.root_cluster, self.fixed_root_entry_cnt, dir_cluster);
        let mut lfn_run = LfnRun::default();
        loop {
            let before = pos;
            match dirpos::get_dir_entry(
                &self.geo,
                &mut self.lb,
                self.part,
                scratch,
                &mut pos,
                self.fixed_root_start_sector,
                self.fixed_root_entry_cnt,
            )? {
                None => return Ok(None),
                Some((bytes, sector)) => {
                    let entry = DirEntryFat::read(&bytes);
                    match entry.state() {
                        EntryState::End => return Ok(None),
                        EntryState::Deleted => {
                            lfn_run.clear();
                            continue;
                        }
                        EntryState::Exists => {
                            if entry.attributes.is_long_name() {
                                lfn_run.push(before, sector);
                                continue;
                            }
                            if &entry.short_name == short_name {
                                return Ok(Some((before, sector, entry, lfn_run)));
                            }
                            lfn_run.clear();
                        }
                    }
                }
            }
        }
    }

    /// Traverses `path` (`/`-separated components) via repeated
    /// directory lookups, ending with the leaf component unresolved.
    ///
    /// `forbidden_cluster`, when set, fails the walk the moment a parent
    /// directory's cluster matches it -- the cycle-detection check that
    /// refuses moving a directory into itself (spec §4.2.5).
    fn find_path(
        &mut self,
        charset: &dyn CharSet,
        path: &[u8],
        forbidden_cluster: Option<u32>,
        scratch: &mut [u8],
    ) -> Result<FoundPath> {
        let mut cluster = self.root_dir_cluster_arg();
        let mut components = path.split(|&b| b == b'/').filter(|c| !c.is_empty());
        let mut current = components.next().ok_or(Error::InvalidPara)?;

        loop {
            let short = shortname::encode_short_name(current, charset, self.accept_multiple_dots)?;
            match components.next() {
                None => {
                    let existing = self.lookup_in_dir(cluster, &short, scratch)?;
                    return Ok(FoundPath {
                        parent_cluster: cluster,
                        leaf_short_name: short,
                        existing,
                    });
                }
                Some(next_component) => {
                    let found = self.lookup_in_dir(cluster, &short, scratch)?;
                    let (_, _, entry, _) = found.ok_or(Error::PathNotFound)?;
                    if !entry.attributes.is_dir() {
                        return Err(Error::NotAFile);
                    }
                    let next_cluster = entry.first_cluster();
                    if let Some(forbidden) = forbidden_cluster {
                        if next_cluster == forbidden {
                            return Err(Error::InvalidPara);
                        }
                    }
                    cluster = next_cluster;
                    current = next_component;
                }
            }
        }
    }

    fn entry_sector(&self, sector: u32, dir_entry_index_in_sector: u32) -> DirEntryPos {
        DirEntryPos {
            sector,
            dir_entry_index: dir_entry_index_in_sector,
        }
    }

    fn write_entry_at(
        &mut self,
        sector: u32,
        pos: &DirPos,
        entry: &DirEntryFat,
        scratch: &mut [u8],
    ) -> Result<()> {
        let bps = self.geo.bytes_per_sector as usize;
        self.lb
            .read_part(self.part, sector, &mut scratch[..bps], SectorType::Directory)?;

        let epc = self.geo.bytes_per_cluster() / dirpos::DIR_ENTRY_SIZE;
        let entry_index_in_sector = if pos.fixed_root {
            pos.dir_entry_index % (bps as u32 / dirpos::DIR_ENTRY_SIZE)
        } else {
            (pos.dir_entry_index % epc) % (bps as u32 / dirpos::DIR_ENTRY_SIZE)
        };
        let in_sector = (entry_index_in_sector * dirpos::DIR_ENTRY_SIZE) as usize;

        let mut bytes = [0u8; 32];
        entry.write(&mut bytes);
        scratch[in_sector..in_sector + 32].copy_from_slice(&bytes);
        self.lb
            .write_part(self.part, sector, &scratch[..bps], SectorType::Directory)
    }

    /// Zero-fills a freshly allocated directory cluster and seeds it with
    /// the `.`/`..` entries every FAT subdirectory carries. `parent_cluster`
    /// is `0` (the fixed root sentinel, spec `root_dir_cluster_arg`) when
    /// creating a subdirectory directly under the root.
    fn init_dir_cluster(
        &mut self,
        new_cluster: u32,
        parent_cluster: u32,
        creation: &dentry::FatTimestamp,
        scratch: &mut [u8],
    ) -> Result<()> {
        let bps = self.geo.bytes_per_sector as usize;
        for b in scratch[..bps].iter_mut() {
            *b = 0;
        }

        let mut dot = DirEntryFat::empty();
        dot.short_name = *b".          ";
        dot.attributes.set(dentry::Attribute::Directory, true);
        dot.creation = *creation;
        dot.last_write = *creation;
        dot.set_first_cluster(new_cluster);

        let mut dotdot = DirEntryFat::empty();
        dotdot.short_name = *b"..         ";
        dotdot.attributes.set(dentry::Attribute::Directory, true);
        dotdot.creation = *creation;
        dotdot.last_write = *creation;
        dotdot.set_first_cluster(parent_cluster);

        let mut dot_bytes = [0u8; dentry::DIR_ENTRY_LEN];
        dot.write(&mut dot_bytes);
        let mut dotdot_bytes = [0u8; dentry::DIR_ENTRY_LEN];
        dotdot.write(&mut dotdot_bytes);
        scratch[0..32].copy_from_slice(&dot_bytes);
        scratch[32..64].copy_from_slice(&dotdot_bytes);

        let sector_start = self.geo.cluster_to_sector(new_cluster);
        self.lb
            .write_part(self.part, sector_start, &scratch[..bps], SectorType::Directory)?;
        for b in scratch[..bps].iter_mut() {
            *b = 0;
        }
        for i in 1..self.geo.sectors_per_cluster {
            self.lb
                .write_part(self.part, sector_start + i, &scratch[..bps], SectorType::Directory)?;
        }
        Ok(())
    }

    /// Creates a fresh entry in `parent_cluster` named `short_name`: zero
    /// size, zero first cluster (for files; directories get a freshly
    /// allocated cluster seeded with `.`/`..`), archive/directory
    /// attribute (spec §4.2.5 "no" row).
    fn create_entry(
        &mut self,
        clock: &dyn Clock,
        parent_cluster: u32,
        short_name: &ShortName,
        as_dir: bool,
        scratch: &mut [u8],
    ) -> Result<OpenOutcome> {
        let slot = dirpos::find_empty_dir_entry(
            &self.geo,
            &mut self.lb,
            self.part,
            scratch,
            self.root_cluster,
            self.fixed_root_start_sector,
            self.fixed_root_entry_cnt,
            parent_cluster,
        )?;

        let mut entry = DirEntryFat::empty();
        entry.short_name = *short_name;
        entry.attributes.set(dentry::Attribute::Archive, !as_dir);
        entry.attributes.set(dentry::Attribute::Directory, as_dir);
        entry.creation = clock.now();
        entry.last_write = entry.creation;

        if as_dir {
            let new_cluster = table::alloc_cluster(&self.geo, &mut self.lb, self.part, scratch)?;
            entry.set_first_cluster(new_cluster);
            self.init_dir_cluster(new_cluster, parent_cluster, &entry.creation, scratch)?;
        }

        let entries_per_sector = self.geo.bytes_per_sector / dirpos::DIR_ENTRY_SIZE;
        let sector = if slot.fixed_root {
            self.fixed_root_start_sector + slot.dir_entry_index / entries_per_sector
        } else {
            let epc = self.geo.bytes_per_cluster() / dirpos::DIR_ENTRY_SIZE;
            let in_cluster = slot.dir_entry_index % epc;
            self.geo.cluster_to_sector(slot.cluster_id) + in_cluster / entries_per_sector
        };

        self.write_entry_at(sector, &slot, &entry, scratch)?;

        Ok(OpenOutcome {
            pos: self.entry_sector(sector, slot.dir_entry_index % entries_per_sector),
            first_cluster: 0,
            file_size: 0,
            is_dir: as_dir,
            file_position: 0,
        })
    }

    /// Erases the long-name entries preceding the 8.3 entry just deleted.
    /// Best-effort: a chain that straddles a sector the caller can't
    /// write for some reason shouldn't undo the delete that already
    /// succeeded, so failures are logged and the first one is returned
    /// without aborting the remaining entries (spec §4.2.4 step 3: "may
    /// partially fail; its first error is remembered").
    fn scrub_lfn_predecessors(&mut self, lfn_run: &LfnRun, scratch: &mut [u8]) -> Option<Error> {
        let mut first_error = None;
        for &(pos, sector) in lfn_run.iter() {
            let mut blank = DirEntryFat::empty();
            blank.short_name[0] = dentry::FIRST_BYTE_DELETED;
            if let Err(e) = self.write_entry_at(sector, &pos, &blank, scratch) {
                warn!("fat: volume {}: failed to scrub long-name entry: {}", self.volume_id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error
    }

    /// Runs the delete protocol (spec §4.2.4) against an already-located
    /// entry.
    fn delete_entry(
        &mut self,
        pos: &DirPos,
        sector: u32,
        entry: &DirEntryFat,
        lfn_run: &LfnRun,
        open_query: &dyn OpenFileQuery,
        scratch: &mut [u8],
    ) -> Result<()> {
        let entries_per_sector = self.geo.bytes_per_sector / dirpos::DIR_ENTRY_SIZE;
        let dir_entry_pos = self.entry_sector(sector, pos.dir_entry_index % entries_per_sector);

        if !entry.attributes.is_dir() && open_query.is_open(self.volume_id, dir_entry_pos) {
            return Err(Error::FileIsOpen);
        }

        let mut marked = *entry;
        marked.short_name[0] = dentry::FIRST_BYTE_DELETED;
        self.write_entry_at(sector, pos, &marked, scratch)?;

        let expected_max = if entry.attributes.is_dir() {
            self.geo.bytes_per_cluster().max(1) / 4 + 1024
        } else {
            table::expected_cluster_count(&self.geo, entry.file_size)
        };

        if entry.first_cluster() != 0 {
            let freed = table::free_chain(
                &self.geo,
                &mut self.lb,
                self.part,
                scratch,
                entry.first_cluster(),
                expected_max,
            );
            match freed {
                Ok(_) => {}
                Err(Error::InvalidClusterChain) if entry.attributes.is_dir() => {
                    // Directory size is unknowable from the entry; a
                    // corrupt/cyclic chain is swallowed here (spec
                    // §4.2.3) rather than propagated.
                }
                Err(e) => return Err(e),
            }
        }

        self.scrub_lfn_predecessors(lfn_run, scratch);
        Ok(())
    }

    /// Dispatches open/create/delete for `path` per the table in spec
    /// §4.2.5.
    pub fn open_or_create(
        &mut self,
        charset: &dyn CharSet,
        clock: &dyn Clock,
        path: &[u8],
        flags: OpenFlags,
        open_query: &dyn OpenFileQuery,
    ) -> Result<OpenOutcome> {
        self.check_latch()?;
        let bps = self.geo.bytes_per_sector as usize;
        let mut scratch = [0u8; sector_buffer::MAX_SECTOR_SIZE];
        let result =
            self.open_or_create_inner(charset, clock, path, flags, open_query, &mut scratch[..bps]);
        self.latch(result)
    }

    fn open_or_create_inner(
        &mut self,
        charset: &dyn CharSet,
        clock: &dyn Clock,
        path: &[u8],
        flags: OpenFlags,
        open_query: &dyn OpenFileQuery,
        scratch: &mut [u8],
    ) -> Result<OpenOutcome> {
        let found = self.find_path(charset, path, None, scratch)?;

        match found.existing {
            None => {
                if flags.do_create {
                    self.create_entry(
                        clock,
                        found.parent_cluster,
                        &found.leaf_short_name,
                        flags.create_dir,
                        scratch,
                    )
                } else {
                    Err(Error::FileDirNotFound)
                }
            }
            Some((pos, sector, entry, lfn_run)) => {
                if entry.attributes.is_dir() {
                    return Err(Error::NotAFile);
                }

                if flags.do_delete {
                    self.delete_entry(&pos, sector, &entry, &lfn_run, open_query, scratch)?;
                    return if flags.do_create {
                        self.create_entry(
                            clock,
                            found.parent_cluster,
                            &found.leaf_short_name,
                            flags.create_dir,
                            scratch,
                        )
                    } else {
                        Err(Error::FileDirNotFound)
                    };
                }

                if flags.do_create && !flags.do_open {
                    return Err(Error::FileDirExists);
                }

                if flags.do_open {
                    if entry.attributes.is_read_only() && flags.write_access {
                        return Err(Error::ReadOnlyFile);
                    }
                    let entries_per_sector = self.geo.bytes_per_sector / dirpos::DIR_ENTRY_SIZE;
                    let file_position = if flags.append { entry.file_size } else { 0 };
                    return Ok(OpenOutcome {
                        pos: self.entry_sector(sector, pos.dir_entry_index % entries_per_sector),
                        first_cluster: entry.first_cluster(),
                        file_size: entry.file_size,
                        is_dir: false,
                        file_position,
                    });
                }

                Err(Error::FileDirExists)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoOpenFiles;
    impl OpenFileQuery for NoOpenFiles {
        fn is_open(&self, _volume_id: u8, _pos: DirEntryPos) -> bool {
            false
        }
    }

    #[test]
    fn open_flags_default_to_all_false() {
        let flags = OpenFlags::default();
        assert!(!flags.do_delete);
        assert!(!flags.do_open);
        assert!(!flags.do_create);
    }

    #[test]
    fn no_open_files_query_is_inert() {
        let q = NoOpenFiles;
        assert!(!q.is_open(0, DirEntryPos { sector: 1, dir_entry_index: 0 }));
    }

    fn dummy_pos(dir_entry_index: u32) -> DirPos {
        DirPos {
            first_cluster_id: 2,
            cluster_id: 2,
            cluster_index: 0,
            dir_entry_index,
            fixed_root: false,
        }
    }

    #[test]
    fn lfn_run_tracks_contiguous_predecessors() {
        let mut run = LfnRun::default();
        run.push(dummy_pos(0), 10);
        run.push(dummy_pos(1), 10);
        assert_eq!(run.iter().count(), 2);
        run.clear();
        assert_eq!(run.iter().count(), 0);
    }

    #[test]
    fn lfn_run_drops_oldest_past_capacity() {
        let mut run = LfnRun::default();
        for i in 0..(MAX_LFN_PREDECESSORS as u32 + 5) {
            run.push(dummy_pos(i), 10);
        }
        assert_eq!(run.iter().count(), MAX_LFN_PREDECESSORS);
        let first = run.iter().next().unwrap().0.dir_entry_index;
        assert_eq!(first, 5);
    }
}
