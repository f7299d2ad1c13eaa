use alloc::string::String;
use alloc::vec::Vec;

use crate::{Corruption, Entry, Error, Header};

/// Everything before the data section: the header, the entry table and the
/// names, index-aligned with the table rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageHead {
    header: Header,
    entries: Vec<Entry>,
    names: Vec<String>,
    data_start: u64,
}

impl PackageHead {
    pub(crate) fn new(
        header: Header,
        entries: Vec<Entry>,
        names: Vec<String>,
        data_start: u64,
    ) -> PackageHead {
        debug_assert_eq!(entries.len(), names.len());
        PackageHead {
            header,
            entries,
            names,
            data_start,
        }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of the first byte after the name table
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Names and table rows in table order
    pub fn entries(&self) -> impl ExactSizeIterator<Item = (&str, Entry)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.entries.iter().copied())
    }

    /// Check that every entry's data lies between the end of the name table
    /// and `archive_len`.
    pub fn check_bounds(&self, archive_len: u64) -> Result<(), Error> {
        for (index, entry) in self.entries.iter().enumerate() {
            let index = index as u32;
            if u64::from(entry.offset()) < self.data_start {
                return Err(Error::ArchiveCorrupt(Corruption::DataOverlapsHead {
                    index,
                    offset: entry.offset(),
                    data_start: self.data_start,
                }));
            }
            if entry.end() > archive_len {
                return Err(Error::ArchiveCorrupt(Corruption::DataOutOfBounds {
                    index,
                    end: entry.end(),
                    len: archive_len,
                }));
            }
        }
        Ok(())
    }
}
