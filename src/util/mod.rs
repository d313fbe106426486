//! Small shared utilities used across the crate: bit access and a
//! fixed-capacity bitmap used for the directory-handle and open-file pools.

pub mod bitmap;
pub mod bits;

pub use bitmap::{BitMap, BitMapLen};
pub use bits::Bits;
