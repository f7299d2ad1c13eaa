#![no_std]
extern crate alloc;

use core::mem;

pub use crate::entry::Entry;
pub use crate::error::{Corruption, Error};
pub use crate::head::PackageHead;
pub use crate::header::Header;
pub use crate::package::{PackageBuf, PackageSrc};

mod entry;
mod error;
mod head;
mod header;
mod package;

pub const HEADER_SIZE: usize = mem::size_of::<Header>();
pub const ENTRY_SIZE: usize = mem::size_of::<Entry>();

/// Longest name the reader accepts, not counting the NUL terminator
pub const MAX_NAME_LEN: usize = 4096;
