use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::{Corruption, Entry, Error, Header, PackageHead, HEADER_SIZE, MAX_NAME_LEN};

const NAME_CHUNK_SIZE: usize = 256;

/// A random-access source of archive bytes. Implementors provide `len` and
/// `read_at`; the provided methods decode the header, the entry table and the
/// name table in three passes.
pub trait PackageSrc {
    type Err: From<Error>;

    /// Total length of the archive in bytes
    fn len(&mut self) -> Result<u64, Self::Err>;

    /// Read up to `buf.len()` bytes at `offset`. Returns fewer bytes only when
    /// the end of the source is reached.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err>;

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::Err> {
        let count = self.read_at(offset, buf)?;
        if count < buf.len() {
            return Err(Error::ArchiveTruncated {
                needed: offset.saturating_add(buf.len() as u64),
                available: offset.saturating_add(count as u64),
            }
            .into());
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<Header, Self::Err> {
        let mut header_data = [0; HEADER_SIZE];
        self.read_exact_at(0, &mut header_data)?;
        Ok(Header::from_bytes(&header_data)?)
    }

    /// Read the entry table declared by `header`. The table's extent is checked
    /// against the source length before anything is allocated.
    fn read_entries(&mut self, header: &Header) -> Result<Vec<Entry>, Self::Err> {
        let table_end = header.total_size()?;
        let len = self.len()?;
        if table_end > len {
            return Err(Error::ArchiveTruncated {
                needed: table_end,
                available: len,
            }
            .into());
        }

        let entries_size = usize::try_from(header.entries_size()?).map_err(Error::from)?;
        let mut entries_data = vec![0; entries_size];
        self.read_exact_at(HEADER_SIZE as u64, &mut entries_data)?;
        Ok(header.entries(&entries_data)?)
    }

    /// Read `count` NUL-terminated names starting at `offset`. Returns the
    /// names and the offset just past the last terminator.
    fn read_names(&mut self, count: u32, offset: u64) -> Result<(Vec<String>, u64), Self::Err> {
        let mut names = Vec::new();
        let mut chunk = [0; NAME_CHUNK_SIZE];
        let mut name_bytes = Vec::new();
        let mut pos = offset;

        for index in 0..count {
            name_bytes.clear();
            loop {
                let read = self.read_at(pos, &mut chunk)?;
                if read == 0 {
                    return Err(
                        Error::ArchiveCorrupt(Corruption::UnterminatedName { index }).into(),
                    );
                }

                let nul = chunk[..read].iter().position(|&b| b == 0);
                let taken = nul.unwrap_or(read);
                name_bytes.extend_from_slice(&chunk[..taken]);
                pos += taken as u64;

                if name_bytes.len() > MAX_NAME_LEN {
                    return Err(Error::ArchiveCorrupt(Corruption::NameTooLong { index }).into());
                }
                if nul.is_some() {
                    pos += 1;
                    break;
                }
            }

            if name_bytes.is_empty() {
                return Err(Error::ArchiveCorrupt(Corruption::EmptyName { index }).into());
            }
            let name = core::str::from_utf8(&name_bytes)
                .map_err(|source| Error::NameDecode { index, source })?;
            names.push(String::from(name));
        }

        Ok((names, pos))
    }

    /// Decode and validate everything before the data section
    fn read_head(&mut self) -> Result<PackageHead, Self::Err> {
        let header = self.read_header()?;
        let entries = self.read_entries(&header)?;
        let (names, data_start) = self.read_names(header.count(), header.total_size()?)?;

        let head = PackageHead::new(header, entries, names, data_start);
        let len = self.len()?;
        head.check_bounds(len)?;
        Ok(head)
    }

    /// Read from this src at a given entry's data with a given offset within that entry
    fn read_entry(&mut self, entry: Entry, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        let size = u64::from(entry.size());
        if offset >= size {
            return Ok(0);
        }

        let remaining = size - offset;
        let end = usize::try_from(remaining).map_or(buf.len(), |rem| rem.min(buf.len()));

        self.read_at(u64::from(entry.offset()) + offset, &mut buf[..end])
    }
}

/// An archive held in memory
#[derive(Clone, Copy, Debug)]
pub struct PackageBuf<'a> {
    src: &'a [u8],
}

impl<'a> PackageBuf<'a> {
    pub fn new(src: &'a [u8]) -> PackageBuf<'a> {
        PackageBuf { src }
    }

    /// Borrow an entry's data directly from the buffer
    pub fn entry_data(&self, entry: Entry) -> Result<&'a [u8], Error> {
        let start = usize::try_from(entry.offset())?;
        let end = usize::try_from(entry.end())?;
        self.src.get(start..end).ok_or(Error::ArchiveTruncated {
            needed: entry.end(),
            available: self.src.len() as u64,
        })
    }
}

impl PackageSrc for PackageBuf<'_> {
    type Err = Error;

    fn len(&mut self) -> Result<u64, Error> {
        Ok(self.src.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let start = usize::try_from(offset)?;
        let len = self.src.len();
        if start >= len {
            return Ok(0);
        }
        let end = start.checked_add(buf.len()).ok_or(Error::Overflow)?.min(len);
        let count = end - start;
        buf[..count].copy_from_slice(&self.src[start..end]);
        Ok(count)
    }
}
