//! Extention traits and helpers for base types defined in `pck-core`.
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use pck_core::{Entry, PackageSrc};

use crate::Error;

/// Interpret a stored name as a relative path, ensuring that there are no
/// non-normal components.
pub fn check_path(name: &str) -> Result<&Path, Error> {
    let path = Path::new(name);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            invalid => {
                let bad_component: &Path = invalid.as_ref();
                return Err(Error::InvalidPath {
                    name: name.to_string(),
                    component: bad_component.to_path_buf(),
                });
            }
        }
    }
    Ok(path)
}

/// Copy `read` into `write` until end of input. Read errors are attributed
/// to `read_path`; write errors carry no path.
pub(crate) fn copy_data<R: Read, W: Write>(
    mut read: R,
    mut write: W,
    buf: &mut [u8],
    read_path: &Path,
) -> Result<u64, Error> {
    let mut total = 0;
    loop {
        let count = match read.read(buf) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::input(err, read_path, "Read source")),
        };
        write
            .write_all(&buf[..count])
            .map_err(wrap_io_err!(Output, "Write data"))?;
        total += count as u64;
    }
    Ok(total)
}

pub trait PackageSrcExt: PackageSrc<Err = Error> {
    /// Location of this source on disk
    fn path(&self) -> &Path;

    /// Copy an entry's data into `write`. Fails if the source ends before the
    /// entry does. Write errors carry no path.
    fn copy_entry<W: Write>(
        &mut self,
        entry: Entry,
        mut write: W,
        buf: &mut [u8],
    ) -> Result<u64, Error> {
        let mut offset = 0;
        loop {
            let count = self.read_entry(entry, offset, buf)?;
            if count == 0 {
                break;
            }
            write
                .write_all(&buf[..count])
                .map_err(wrap_io_err!(Output, "Write entry"))?;
            offset += count as u64;
        }

        if offset != u64::from(entry.size()) {
            return Err(pck_core::Error::ArchiveTruncated {
                needed: entry.end(),
                available: u64::from(entry.offset()) + offset,
            }
            .into());
        }
        Ok(offset)
    }
}
