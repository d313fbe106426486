//! The journal collaborator LB routes reads/writes through when active
//! (spec §4.1 "Journal routing"). The transaction-log implementation
//! itself stays external (spec.md §1 Out of scope); this trait only fixes
//! the interface LB needs.

use crate::error::Result;

pub trait Journal {
    /// `true` once the journal has been opened against a present, active
    /// transaction log.
    fn is_present(&self) -> bool;

    /// `true` if in-flight data for the current transaction has been
    /// logged and reads must be served from the journal rather than media.
    fn is_new_data_logged(&self) -> bool;

    /// Serve a read for `idx`, from the in-flight log if logged, else from
    /// on-media data.
    fn journal_read(&mut self, idx: u32, dst: &mut [u8]) -> Result<()>;

    /// Record a write for `idx` into the journal instead of media.
    fn journal_write(&mut self, idx: u32, data: &[u8]) -> Result<()>;
}
