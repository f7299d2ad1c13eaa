use core::error;
use core::fmt::{Display, Formatter, Result};
use core::num::TryFromIntError;
use core::str::Utf8Error;

use bytemuck::PodCastError;

/// The ways an archive can be structurally invalid. Indices refer to the
/// position of the entry in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corruption {
    ReservedNotZero { index: u32, value: u32 },
    UnterminatedName { index: u32 },
    NameTooLong { index: u32 },
    EmptyName { index: u32 },
    DataOutOfBounds { index: u32, end: u64, len: u64 },
    DataOverlapsHead { index: u32, offset: u32, data_start: u64 },
}

impl Display for Corruption {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Corruption::*;

        match *self {
            ReservedNotZero { index, value } => {
                write!(f, "entry {} has reserved field {:#010x}", index, value)
            }
            UnterminatedName { index } => {
                write!(f, "name {} runs past the end of the archive", index)
            }
            NameTooLong { index } => write!(f, "name {} is longer than supported", index),
            EmptyName { index } => write!(f, "name {} is empty", index),
            DataOutOfBounds { index, end, len } => write!(
                f,
                "entry {} data ends at {} but the archive is {} bytes",
                index, end, len
            ),
            DataOverlapsHead {
                index,
                offset,
                data_start,
            } => write!(
                f,
                "entry {} data at {} starts before the data section at {}",
                index, offset, data_start
            ),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    ArchiveCorrupt(Corruption),
    ArchiveTruncated { needed: u64, available: u64 },
    Cast(PodCastError),
    NameDecode { index: u32, source: Utf8Error },
    Overflow,
    TryFromInt(TryFromIntError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Error::*;

        match self {
            ArchiveCorrupt(corruption) => write!(f, "Archive corrupt: {}", corruption),
            ArchiveTruncated { needed, available } => write!(
                f,
                "Archive truncated: needed {} bytes, {} available",
                needed, available
            ),
            Cast(err) => write!(f, "Cast: {}", err),
            NameDecode { index, .. } => write!(f, "Name {} is not valid UTF-8", index),
            Overflow => write!(f, "Overflow"),
            TryFromInt(err) => write!(f, "TryFromInt: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::NameDecode { source, .. } => Some(source),
            Self::TryFromInt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PodCastError> for Error {
    fn from(err: PodCastError) -> Error {
        Error::Cast(err)
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Error {
        Error::TryFromInt(err)
    }
}
