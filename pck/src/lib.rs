use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use pck_core::{Corruption, Entry, Header, PackageBuf, PackageHead, PackageSrc};

const READ_WRITE_HASH_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Build a closure mapping an `io::Error` to `Error::InputNotFound`,
/// `Error::InputUnreadable` or `Error::OutputUnwritable` for `path`.
macro_rules! wrap_io_err {
    (Input, $path:expr, $context:expr) => {
        |source: ::std::io::Error| $crate::Error::input(source, &$path, $context)
    };
    (Output, $path:expr, $context:expr) => {
        |source: ::std::io::Error| $crate::Error::OutputUnwritable {
            source,
            path: Some(::std::path::Path::to_path_buf($path.as_ref())),
            context: $context,
        }
    };
    (Output, $context:expr) => {
        |source: ::std::io::Error| $crate::Error::OutputUnwritable {
            source,
            path: None,
            context: $context,
        }
    };
}

mod bin;
mod builder;
pub mod ext;
mod package;

pub use bin::*;
pub use builder::PackageBuilder;
pub use package::PackageFile;

#[derive(thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pck_core::Error),

    #[error("Input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("{context}: {}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{context}{}", display_path(.path))]
    OutputUnwritable {
        path: Option<PathBuf>,
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Duplicate name {0:?}")]
    DuplicateName(String),

    #[error("Invalid path component {} in {name:?}", .component.display())]
    InvalidPath { name: String, component: PathBuf },

    #[error("Entry size mismatch for {}: expected {expected}, got {actual}", .path.display())]
    LengthMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Entry {name:?} does not match {}", .path.display())]
    VerifyMismatch { name: String, path: PathBuf },

    #[error("No .pck archives to unpack ({} other file(s) skipped)", .skipped.len())]
    NothingToUnpack { skipped: Vec<PathBuf> },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(": {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Map a failure to open or read a source file; missing files get their
    /// own variant.
    pub(crate) fn input(source: io::Error, path: impl AsRef<Path>, context: &'static str) -> Error {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            Error::InputNotFound { path }
        } else {
            Error::InputUnreadable {
                path,
                context,
                source,
            }
        }
    }

    /// Attach `path` to an output error that was raised without one
    pub(crate) fn output_path(self, path: impl AsRef<Path>) -> Error {
        match self {
            Error::OutputUnwritable {
                path: None,
                context,
                source,
            } => Error::OutputUnwritable {
                path: Some(path.as_ref().to_path_buf()),
                context,
                source,
            },
            other => other,
        }
    }

    /// The archive is shorter than its header or table declares
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Core(pck_core::Error::ArchiveTruncated { .. }))
    }

    /// The archive is structurally invalid
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Core(pck_core::Error::ArchiveCorrupt(_)))
    }

    /// A stored name is not valid UTF-8
    pub fn is_name_decode(&self) -> bool {
        matches!(self, Error::Core(pck_core::Error::NameDecode { .. }))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}
