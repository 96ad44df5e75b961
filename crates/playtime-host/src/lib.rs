//! Host process enumeration for steam-playtime
//!
//! This crate defines the seam between the process watcher and the
//! operating system's process table:
//! - [`ProcessSource`] trait returning one snapshot per call
//! - [`SysinfoProcessSource`] backed by the live process list
//! - [`MockProcessSource`] for unit/integration testing

mod live;
mod mock;
mod traits;

pub use live::*;
pub use mock::*;
pub use traits::*;
