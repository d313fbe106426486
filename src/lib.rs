//! Embedded file-system core: a logical-block layer, a FAT directory/
//! cluster engine, an MBR/GPT partitioned-device driver, and a serial-NOR
//! SFDP physical layer, assembled the way `original_source/emFile`'s `FS_*`
//! modules stack -- device vtable at the bottom, LB layer on top of that,
//! FAT engine on top of LB, with the partition driver and the SFDP
//! physical layer each just another `DeviceType` slotted underneath.
//!
//! No layer allocates by default (`no_std` feature, on by default): every
//! fixed-capacity structure (the open-file pool, the sector buffer, the
//! bitmap) is sized by a const generic via `typenum`/`generic-array`.

// Mark the crate as no_std if the feature is enabled (and only)
#![cfg_attr(all(feature = "no_std", not(test)), no_std)]

#[allow(unused_extern_crates)]
extern crate core; // makes rls actually look into the standard library (hack)

// // Gotta do this since we're a staticlib:
// // (it'd be nicer to be able to use `panic_halt` or its ilk, but alas)

#[cfg_attr(target_os = "none", panic_handler)]
#[cfg(target_os = "none")]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

pub mod error;
pub mod mutex;
pub mod lock;
pub mod util;

pub mod lb;
pub mod fat;
pub mod partition;
pub mod sfdp;

pub use error::{Error, Result};
