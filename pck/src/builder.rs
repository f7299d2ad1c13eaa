use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use pck_core::{Entry, Header};
use tracing::debug;

use crate::ext::{check_path, copy_data};
use crate::{Error, READ_WRITE_HASH_BUF_SIZE};

struct BuilderEntry {
    /// Name stored in the archive
    name: String,
    /// Data length, fixed when the entry is added
    size: u64,

    kind: BuilderEntryKind,
}

impl BuilderEntry {
    // Verify inputs to ensure that invalid archives are not built by mistake
    fn new(name: String, size: u64, kind: BuilderEntryKind) -> Result<BuilderEntry, Error> {
        if name.is_empty() {
            return Err(Error::InvalidName {
                name,
                reason: "name is empty",
            });
        }
        if name.as_bytes().contains(&0) {
            return Err(Error::InvalidName {
                name,
                reason: "name contains a NUL byte",
            });
        }
        if name.len() > pck_core::MAX_NAME_LEN {
            return Err(Error::InvalidName {
                name,
                reason: "name is longer than supported",
            });
        }
        // Stored names must unpack below the output directory
        if check_path(&name).is_err() {
            return Err(Error::InvalidName {
                name,
                reason: "name is not a relative path",
            });
        }
        Ok(BuilderEntry { name, size, kind })
    }
}

enum BuilderEntryKind {
    /// Path to regular file during build
    File(PathBuf),

    Buffer(Vec<u8>),
}

impl fmt::Debug for BuilderEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match &self.kind {
            BuilderEntryKind::File(p) => format!("File({:?})", p),
            BuilderEntryKind::Buffer(_) => String::from("Buffer(_)"),
        };
        f.debug_struct("BuilderEntry")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("kind", &kind)
            .finish()
    }
}

/// Builder pattern for constructing pck archives. Holds a list of entries
/// and writes them out in the order they were added.
///
/// Sizes are taken when an entry is added, so every offset is known before
/// the first byte of the archive is written.
///
/// # Example
/// ```
/// use std::io::Cursor;
///
/// use pck::{PackageBuf, PackageBuilder, PackageSrc};
///
/// let mut builder = PackageBuilder::new();
/// builder
///     .buffer(&b"some file contents"[..], "notes.txt").unwrap()
///     .buffer(&b""[..], "dir/empty").unwrap();
///
/// let mut archive = Cursor::new(Vec::new());
/// let len = builder.write_archive(&mut archive).unwrap();
/// let archive = archive.into_inner();
/// assert_eq!(len, archive.len() as u64);
///
/// let head = PackageBuf::new(&archive).read_head().unwrap();
/// let names: Vec<_> = head.entries().map(|(name, _)| name).collect();
/// assert_eq!(names, ["notes.txt", "dir/empty"]);
/// ```
#[derive(Debug, Default)]
pub struct PackageBuilder {
    entries: Vec<BuilderEntry>,
    names: HashSet<String>,
}

impl PackageBuilder {
    pub fn new() -> PackageBuilder {
        PackageBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a regular file to this builder, stored under its file name.
    /// Directory components of `source` are dropped.
    pub fn file(&mut self, source: impl AsRef<Path>) -> Result<&mut PackageBuilder, Error> {
        let source = source.as_ref();
        let name = match source.file_name() {
            Some(name) => name.to_str().ok_or_else(|| Error::InvalidName {
                name: name.to_string_lossy().into_owned(),
                reason: "name is not valid UTF-8",
            })?,
            None => {
                return Err(Error::InvalidName {
                    name: source.display().to_string(),
                    reason: "path has no file name",
                })
            }
        };
        self.file_as(source, name.to_string())
    }

    /// Add a regular file to this builder under an explicit `name`. `source`
    /// is the position of the file on the build system.
    pub fn file_as(
        &mut self,
        source: impl AsRef<Path>,
        name: impl Into<String>,
    ) -> Result<&mut PackageBuilder, Error> {
        let source = source.as_ref();
        let metadata =
            fs::metadata(source).map_err(wrap_io_err!(Input, source, "Stat source file"))?;
        if !metadata.is_file() {
            return Err(Error::input(
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                source,
                "Stat source file",
            ));
        }

        self.push(BuilderEntry::new(
            name.into(),
            metadata.len(),
            BuilderEntryKind::File(source.to_path_buf()),
        )?)
    }

    /// Add an in-memory file to this builder.
    pub fn buffer(
        &mut self,
        data: impl Into<Vec<u8>>,
        name: impl Into<String>,
    ) -> Result<&mut PackageBuilder, Error> {
        let data = data.into();
        self.push(BuilderEntry::new(
            name.into(),
            data.len() as u64,
            BuilderEntryKind::Buffer(data),
        )?)
    }

    fn push(&mut self, entry: BuilderEntry) -> Result<&mut PackageBuilder, Error> {
        if !self.names.insert(entry.name.clone()) {
            return Err(Error::DuplicateName(entry.name));
        }
        self.entries.push(entry);
        Ok(self)
    }

    /// Compute the header and the entry table for the current entries. Data
    /// starts right after the name table and each entry follows the previous
    /// one. Returns the total archive length as well.
    pub fn layout(&self) -> Result<(Header, Vec<Entry>, u64), Error> {
        let count = u32::try_from(self.entries.len()).map_err(pck_core::Error::from)?;
        let header = Header::new(count);

        let mut offset = header.total_size()?;
        for entry in &self.entries {
            offset = offset
                .checked_add(entry.name.len() as u64 + 1)
                .ok_or(pck_core::Error::Overflow)?;
        }

        let mut table = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let start = u32::try_from(offset).map_err(|_| pck_core::Error::Overflow)?;
            let size = u32::try_from(entry.size).map_err(|_| pck_core::Error::Overflow)?;
            table.push(Entry::new(start, size));
            offset = offset
                .checked_add(entry.size)
                .ok_or(pck_core::Error::Overflow)?;
        }

        Ok((header, table, offset))
    }

    /// Write the header, the entry table, the name table and the data
    /// segment to `writer`. Returns the number of bytes written. Errors from
    /// `writer` carry no path.
    pub fn write_archive<W: Write>(&self, writer: &mut W) -> Result<u64, Error> {
        let (header, table, total) = self.layout()?;

        writer
            .write_all(bytemuck::bytes_of(&header))
            .map_err(wrap_io_err!(Output, "Write header"))?;
        for row in &table {
            writer
                .write_all(bytemuck::bytes_of(row))
                .map_err(wrap_io_err!(Output, "Write entry table"))?;
        }
        for entry in &self.entries {
            writer
                .write_all(entry.name.as_bytes())
                .and_then(|()| writer.write_all(&[0]))
                .map_err(wrap_io_err!(Output, "Write name table"))?;
        }

        let mut buf = vec![0; READ_WRITE_HASH_BUF_SIZE];
        for (entry, row) in self.entries.iter().zip(&table) {
            let (source, read): (&Path, Box<dyn Read + '_>) = match &entry.kind {
                BuilderEntryKind::File(path) => {
                    let file = OpenOptions::new()
                        .read(true)
                        .open(path)
                        .map_err(wrap_io_err!(Input, path, "Open source file"))?;
                    (path.as_path(), Box::new(file) as Box<dyn Read>)
                }
                BuilderEntryKind::Buffer(data) => {
                    (Path::new(&entry.name), Box::new(&data[..]) as Box<dyn Read>)
                }
            };

            // Stop at the recorded size even if the file has grown since
            let actual = copy_data(read.take(entry.size), &mut *writer, &mut buf, source)?;
            if actual != entry.size {
                return Err(Error::LengthMismatch {
                    path: source.to_path_buf(),
                    expected: entry.size,
                    actual,
                });
            }
            debug!(
                entry = %entry.name,
                offset = row.offset(),
                size = row.size(),
                "packed entry"
            );
        }

        Ok(total)
    }
}
