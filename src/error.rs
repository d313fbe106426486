//! The crate-wide error taxonomy (spec §6.4 / §7).
//!
//! Every fallible operation in this crate returns one of these kinds. Layers
//! do not translate errors on the way up -- they log and propagate the same
//! `Error` the failing layer produced.

use core::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// A caller passed a parameter outside of its valid domain.
    InvalidPara,
    /// No device is registered under the given unit number.
    UnknownDevice,
    /// A driver was used before its hardware-access layer was bound.
    HwLayerNotSet,
    /// `init_medium` failed; the device stays uninitialized.
    InitFailure,
    /// The underlying device rejected or failed a write.
    WriteFailure,
    /// The underlying device rejected or failed a read.
    ReadFailure,
    /// An `ioctl` command failed.
    IoctlFailure,
    /// A bounded poll loop (ready-wait, busy-wait) ran out its budget.
    Timeout,
    /// A directory component in a path could not be found.
    PathNotFound,
    /// The terminal file or directory component could not be found.
    FileDirNotFound,
    /// Create was requested but the file or directory already exists.
    FileDirExists,
    /// An operation that requires a file target found a directory (or vice
    /// versa).
    NotAFile,
    /// Delete was requested on a file that has an open handle.
    FileIsOpen,
    /// Write access was requested on a file with the read-only attribute.
    ReadOnlyFile,
    /// A directory that cannot grow (fixed FAT12/16 root) ran out of
    /// entries.
    DirFull,
    /// A cluster-chain walk detected corruption (e.g. a self-loop).
    InvalidClusterChain,
    /// Post-write read-back did not match what was written.
    WriteVerify,
    /// Read or scan ran past the logical end of the addressed structure.
    Eof,
    /// No free clusters remain on the volume.
    VolumeFull,
    /// A sticky `HasError` latch is set; the caller must unmount first.
    HasErrorLatched,
    /// A GPT or SFDP CRC / signature check failed.
    Corrupt,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::InvalidPara => "invalid parameter",
            Error::UnknownDevice => "unknown device",
            Error::HwLayerNotSet => "hardware layer not bound",
            Error::InitFailure => "medium initialization failed",
            Error::WriteFailure => "write failure",
            Error::ReadFailure => "read failure",
            Error::IoctlFailure => "ioctl failure",
            Error::Timeout => "operation timed out",
            Error::PathNotFound => "path not found",
            Error::FileDirNotFound => "file or directory not found",
            Error::FileDirExists => "file or directory already exists",
            Error::NotAFile => "not a file",
            Error::FileIsOpen => "file is open",
            Error::ReadOnlyFile => "file is read-only",
            Error::DirFull => "directory is full",
            Error::InvalidClusterChain => "invalid cluster chain",
            Error::WriteVerify => "write verification failed",
            Error::Eof => "end of file or directory",
            Error::VolumeFull => "volume is full",
            Error::HasErrorLatched => "device latched an error; unmount required",
            Error::Corrupt => "structure failed validation",
        };
        f.write_str(s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
