//! The packed structs represent the on-disk format of pck
use core::fmt::Display;

use bytemuck::{Pod, Zeroable};

/// One row of the entry table. Fields hold little-endian values; use the
/// accessors to read them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(packed, C)]
pub struct Entry {
    /// Always zero
    pub reserved: u32,
    /// Offset of file data from the start of the archive
    pub offset: u32,
    /// Size in bytes of the file data
    pub size: u32,
}

impl Display for Entry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "offset={} size={}", self.offset(), self.size())
    }
}

impl Entry {
    pub fn new(offset: u32, size: u32) -> Entry {
        Entry {
            reserved: 0,
            offset: offset.to_le(),
            size: size.to_le(),
        }
    }

    pub fn reserved(&self) -> u32 {
        u32::from_le(self.reserved)
    }

    pub fn offset(&self) -> u32 {
        u32::from_le(self.offset)
    }

    pub fn size(&self) -> u32 {
        u32::from_le(self.size)
    }

    /// One past the last byte of this entry's data
    pub fn end(&self) -> u64 {
        u64::from(self.offset()) + u64::from(self.size())
    }
}
