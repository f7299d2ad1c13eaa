use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use blake3::Hasher;
use pck_core::{Entry, PackageSrc};
use tracing::{debug, info, warn};

use crate::ext::{check_path, copy_data, PackageSrcExt};
use crate::{Error, PackageBuilder, PackageFile, READ_WRITE_HASH_BUF_SIZE};

/// Sibling of `target` that an archive is written to before it is renamed
/// into place
fn temp_path(target: &Path) -> Result<PathBuf, Error> {
    let file_name = target.file_name().ok_or_else(|| Error::OutputUnwritable {
        path: Some(target.to_path_buf()),
        context: "Archive path has no file name",
        source: io::Error::from(io::ErrorKind::InvalidInput),
    })?;

    let mut tmp_name = std::ffi::OsString::from(".pck.");
    tmp_name.push(file_name);
    Ok(target.with_file_name(tmp_name))
}

/// Pack `file_paths`, in order, into a new archive at `archive_path`. Each
/// file is stored under its file name.
///
/// Every input is checked before the archive is created. The archive is
/// written next to `archive_path` and renamed over it once complete, so a
/// failed call leaves no partial archive behind.
pub fn pack<P: AsRef<Path>>(
    file_paths: impl IntoIterator<Item = P>,
    archive_path: impl AsRef<Path>,
) -> Result<(), Error> {
    let archive_path = archive_path.as_ref();

    let mut builder = PackageBuilder::new();
    for path in file_paths {
        builder.file(path)?;
    }

    let tmp_path = temp_path(archive_path)?;
    let archive_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(wrap_io_err!(Output, tmp_path, "Create archive"))?;

    let written = write_and_flush(&builder, archive_file)
        .and_then(|written| {
            fs::rename(&tmp_path, archive_path)
                .map_err(wrap_io_err!(Output, archive_path, "Rename archive into place"))?;
            Ok(written)
        })
        .map_err(|err| {
            // The temp file is useless once anything failed
            let _ = fs::remove_file(&tmp_path);
            err.output_path(archive_path)
        })?;

    info!(
        archive = %archive_path.display(),
        entries = builder.len(),
        bytes = written,
        "packed archive"
    );
    Ok(())
}

fn write_and_flush(builder: &PackageBuilder, file: File) -> Result<u64, Error> {
    let mut writer = BufWriter::new(file);
    let written = builder.write_archive(&mut writer)?;
    writer
        .into_inner()
        .map_err(|err| err.into_error())
        .and_then(|file| file.sync_all())
        .map_err(wrap_io_err!(Output, "Flush archive"))?;
    Ok(written)
}

/// Extract every entry of the archive at `archive_path` into `base_dir`,
/// creating directories implied by entry names.
///
/// The header, the entry table, the names and the data bounds are all
/// validated before the first file is written. An error writing one entry
/// stops the extraction; files already written are left in place.
pub fn unpack(archive_path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<(), Error> {
    let base_dir = base_dir.as_ref();

    let mut package = PackageFile::new(archive_path)?;
    let head = package.read_head()?;

    let targets = head
        .entries()
        .map(|(name, entry)| -> Result<_, Error> {
            Ok((name, base_dir.join(check_path(name)?), entry))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    fs::create_dir_all(base_dir).map_err(wrap_io_err!(Output, base_dir, "Create directory"))?;

    let mut buf = vec![0; READ_WRITE_HASH_BUF_SIZE];
    for (name, target, entry) in targets {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(wrap_io_err!(Output, parent, "Create directory"))?;
        }

        let file = File::create(&target).map_err(wrap_io_err!(Output, target, "Create file"))?;
        let mut writer = BufWriter::new(file);
        let size = package
            .copy_entry(entry, &mut writer, &mut buf)
            .map_err(|err| err.output_path(&target))?;
        writer
            .flush()
            .map_err(wrap_io_err!(Output, target, "Flush file"))?;

        debug!(entry = name, size, "extracted entry");
    }

    info!(
        archive = %package.path().display(),
        dir = %base_dir.display(),
        entries = head.len(),
        "unpacked archive"
    );
    Ok(())
}

/// Read and validate the head of the archive at `archive_path`, returning
/// each entry's name and table row in table order.
pub fn list(archive_path: impl AsRef<Path>) -> Result<Vec<(String, Entry)>, Error> {
    let mut package = PackageFile::new(archive_path)?;
    let head = package.read_head()?;

    Ok(head
        .entries()
        .map(|(name, entry)| (name.to_string(), entry))
        .collect())
}

/// Check that every entry of the archive at `archive_path` has an identical
/// copy under `base_dir`, comparing lengths and BLAKE3 hashes.
pub fn verify(archive_path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<(), Error> {
    let base_dir = base_dir.as_ref();

    let mut package = PackageFile::new(archive_path)?;
    let head = package.read_head()?;

    let mut buf = vec![0; READ_WRITE_HASH_BUF_SIZE];
    for (name, entry) in head.entries() {
        let expected_path = base_dir.join(check_path(name)?);

        let expected = File::open(&expected_path)
            .map_err(wrap_io_err!(Input, expected_path, "Open extracted file"))?;
        let mut expected_hasher = Hasher::new();
        let count = copy_data(expected, &mut expected_hasher, &mut buf, &expected_path)?;

        let mut entry_hasher = Hasher::new();
        let entry_count = package.copy_entry(entry, &mut entry_hasher, &mut buf)?;

        if count != entry_count || expected_hasher.finalize() != entry_hasher.finalize() {
            return Err(Error::VerifyMismatch {
                name: name.to_string(),
                path: expected_path,
            });
        }
        debug!(entry = name, "verified entry");
    }

    info!(
        archive = %package.path().display(),
        dir = %base_dir.display(),
        entries = head.len(),
        "verified archive"
    );
    Ok(())
}

/// Whether `path` names a `.pck` archive. The extension is matched exactly,
/// so `FOO.PCK` is not one.
pub fn is_pck(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext == "pck")
}

/// Order pack inputs: sorted by path unless `keep_order` is set
pub fn pack_order(mut file_paths: Vec<PathBuf>, keep_order: bool) -> Vec<PathBuf> {
    if !keep_order {
        file_paths.sort();
    }
    file_paths
}

/// Directory that `archive_path` is unpacked into: `out_dir/<file stem>`, or
/// `out_dir` itself when `flat` is set.
pub fn unpack_dest(
    out_dir: impl AsRef<Path>,
    archive_path: impl AsRef<Path>,
    flat: bool,
) -> PathBuf {
    let out_dir = out_dir.as_ref();
    match archive_path.as_ref().file_stem() {
        Some(stem) if !flat => out_dir.join(stem),
        _ => out_dir.to_path_buf(),
    }
}

/// Unpack every `.pck` archive in `archive_paths` into its `unpack_dest`
/// under `out_dir`. Other paths are skipped with a warning. Returns how many
/// archives were unpacked, failing if that would be none.
pub fn unpack_all<P: AsRef<Path>>(
    archive_paths: impl IntoIterator<Item = P>,
    out_dir: impl AsRef<Path>,
    flat: bool,
) -> Result<usize, Error> {
    let out_dir = out_dir.as_ref();

    let mut unpacked = 0;
    let mut skipped = Vec::new();
    for archive_path in archive_paths {
        let archive_path = archive_path.as_ref();
        if !is_pck(archive_path) {
            warn!(path = %archive_path.display(), "skipping file without .pck extension");
            skipped.push(archive_path.to_path_buf());
            continue;
        }

        unpack(archive_path, unpack_dest(out_dir, archive_path, flat))?;
        unpacked += 1;
    }

    if unpacked == 0 {
        return Err(Error::NothingToUnpack { skipped });
    }
    Ok(unpacked)
}
