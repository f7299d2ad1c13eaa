use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use pck_core::PackageSrc;

use crate::ext::PackageSrcExt;
use crate::Error;

/// A `.pck` file on disk
#[derive(Debug)]
pub struct PackageFile {
    path: PathBuf,
    src: BufReader<File>,
    /// Position of `src`, tracked so sequential reads skip the seek
    pos: u64,
    len: u64,
}

impl PackageFile {
    pub fn new(path: impl AsRef<Path>) -> Result<PackageFile, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(wrap_io_err!(Input, path, "Open archive"))?;
        let len = file
            .metadata()
            .map_err(wrap_io_err!(Input, path, "Stat archive"))?
            .len();

        Ok(PackageFile {
            path,
            src: BufReader::new(file),
            pos: 0,
            len,
        })
    }
}

impl PackageSrc for PackageFile {
    type Err = Error;

    fn len(&mut self) -> Result<u64, Error> {
        Ok(self.len)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        if offset != self.pos {
            // Relative seeks keep the buffer when the target is inside it
            let delta = i64::try_from(offset)
                .ok()
                .zip(i64::try_from(self.pos).ok())
                .map(|(offset, pos)| offset - pos);
            match delta {
                Some(delta) => self.src.seek_relative(delta),
                None => self.src.seek(SeekFrom::Start(offset)).map(|_| ()),
            }
            .map_err(wrap_io_err!(Input, self.path, "Seek archive"))?;
            self.pos = offset;
        }

        let mut total = 0;
        while total < buf.len() {
            match self.src.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(count) => total += count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(Error::input(err, &self.path, "Read archive")),
            }
        }
        self.pos += total as u64;
        Ok(total)
    }
}

impl PackageSrcExt for PackageFile {
    fn path(&self) -> &Path {
        &self.path
    }
}
