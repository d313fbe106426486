//! The three coarse locks spec'd in the concurrency model (spec §5):
//! a global FS lock serializing whole API calls, a per-driver lock held for
//! one logical-sector operation against one device, and a short system
//! micro-lock protecting pool allocators and counters.
//!
//! All three are just named wrappers around the crate's [`Mutex`]
//! abstraction (`crate::mutex`) -- we don't invent new locking primitives,
//! we give the existing one call-site-appropriate names so that the
//! invariants in spec §5 ("no operation ever suspends with the system
//! micro-lock held") stay visible in the type a caller reaches for.

use crate::mutex::{Mutex, MutexInterface};

/// Held for the duration of one public API call; serializes all entries.
pub struct GlobalLock<T>(Mutex<T>);

/// Held for the duration of a single logical-sector operation against one
/// device; different devices may proceed concurrently if the global lock
/// is compiled out.
pub struct DriverLock<T>(Mutex<T>);

/// A short critical section protecting pool allocators (directory-handle
/// pool, open-file list) and counter updates. Never held across a
/// suspension point.
pub struct SysLock<T>(Mutex<T>);

macro_rules! lock_impl {
    ($name:ident) => {
        impl<T: Send> $name<T> {
            pub fn new(inner: T) -> Self {
                Self(Mutex::new(inner))
            }

            pub fn with<F: FnOnce(&mut T) -> R, R>(&self, func: F) -> R {
                self.0.cs(func)
            }

            pub fn get_mut(&mut self) -> &mut T {
                MutexInterface::get_mut(&mut self.0)
            }
        }
    };
}

lock_impl!(GlobalLock);
lock_impl!(DriverLock);
lock_impl!(SysLock);
