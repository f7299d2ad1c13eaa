//! The packed structs represent the on-disk format of pck

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};

use crate::{Corruption, Entry, Error, ENTRY_SIZE, HEADER_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(packed, C)]
pub struct Header {
    /// Count of Entry structs, which start immediately after the header
    pub count: u32,
}

impl Header {
    pub fn new(count: u32) -> Header {
        Header {
            count: count.to_le(),
        }
    }

    /// Parse header from the first bytes of an archive
    pub fn from_bytes(data: &[u8]) -> Result<Header, Error> {
        let data = data.get(..HEADER_SIZE).ok_or(Error::ArchiveTruncated {
            needed: HEADER_SIZE as u64,
            available: data.len() as u64,
        })?;
        Ok(bytemuck::pod_read_unaligned(data))
    }

    pub fn count(&self) -> u32 {
        u32::from_le(self.count)
    }

    /// Retrieve the size of the entry table
    pub fn entries_size(&self) -> Result<u64, Error> {
        u64::from(self.count())
            .checked_mul(ENTRY_SIZE as u64)
            .ok_or(Error::Overflow)
    }

    /// Retrieve the size of the Header and its entry table, which is also
    /// where the name table begins
    pub fn total_size(&self) -> Result<u64, Error> {
        self.entries_size()?
            .checked_add(HEADER_SIZE as u64)
            .ok_or(Error::Overflow)
    }

    /// Parse the entry table, rejecting any row whose reserved field is set.
    /// Rows are checked in table order and parsing stops at the first bad one.
    pub fn entries(&self, data: &[u8]) -> Result<Vec<Entry>, Error> {
        let entries_size = usize::try_from(self.entries_size()?)?;

        let entries_data = data.get(..entries_size).ok_or(Error::ArchiveTruncated {
            needed: entries_size as u64,
            available: data.len() as u64,
        })?;

        let entries: &[Entry] = bytemuck::try_cast_slice(entries_data)?;
        for (index, entry) in entries.iter().enumerate() {
            let value = entry.reserved();
            if value != 0 {
                return Err(Error::ArchiveCorrupt(Corruption::ReservedNotZero {
                    index: index as u32,
                    value,
                }));
            }
        }
        Ok(entries.to_vec())
    }
}
