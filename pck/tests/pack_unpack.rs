use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pck::{Corruption, PackageFile, PackageSrc};
use pck_core::{ENTRY_SIZE, HEADER_SIZE};

struct TestDir {
    tmpdir: tempfile::TempDir,
}

impl TestDir {
    fn new() -> io::Result<TestDir> {
        Ok(TestDir {
            tmpdir: tempfile::tempdir()?,
        })
    }

    fn dir(&self, path: impl AsRef<Path>) -> PathBuf {
        self.tmpdir.path().join(path)
    }

    fn file(&self, path: impl AsRef<Path>) -> PathBuf {
        self.tmpdir.path().join(path)
    }

    /// Write `contents` to `input/<name>` and return the path
    fn input(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir("input").join(name);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(&path, contents)?;
        Ok(path)
    }
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn count_files(dir: &Path) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            count += count_files(&entry.path())?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}

#[test]
fn two_small_files() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let a = tmp.input("a.txt", b"hi")?;
    let b = tmp.input("b.txt", b"")?;

    pck::pack([&a, &b], tmp.file("two.pck"))?;

    let archive = fs::read(tmp.file("two.pck"))?;
    assert_eq!(u32_at(&archive, 0), 2);

    // Entry 0
    assert_eq!(u32_at(&archive, 4), 0);
    assert_eq!(u32_at(&archive, 8), 4 + 24 + 6 + 6);
    assert_eq!(u32_at(&archive, 12), 2);
    // Entry 1
    assert_eq!(u32_at(&archive, 16), 0);
    assert_eq!(u32_at(&archive, 20), 42);
    assert_eq!(u32_at(&archive, 24), 0);

    assert_eq!(&archive[28..40], b"a.txt\0b.txt\0");
    assert_eq!(&archive[40..], b"hi");

    pck::unpack(tmp.file("two.pck"), tmp.dir("out"))?;
    assert_eq!(fs::read(tmp.file("out/a.txt"))?, b"hi");
    assert_eq!(fs::read(tmp.file("out/b.txt"))?, b"");
    assert_eq!(count_files(&tmp.dir("out"))?, 2);
    Ok(())
}

#[test]
fn empty_archive() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;

    pck::pack(Vec::<PathBuf>::new(), tmp.file("empty.pck"))?;
    assert_eq!(fs::read(tmp.file("empty.pck"))?, [0, 0, 0, 0]);

    pck::unpack(tmp.file("empty.pck"), tmp.dir("out"))?;
    assert_eq!(count_files(&tmp.dir("out"))?, 0);
    Ok(())
}

#[test]
fn round_trip_mixed_contents() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let binary: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    let files = [
        tmp.input("empty", b"")?,
        tmp.input("binary.bin", &binary)?,
        tmp.input("ñandú €.txt", "non-ASCII contents ✓".as_bytes())?,
        tmp.input("nested/dirs/are/flattened.txt", b"flat")?,
    ];

    pck::pack(&files, tmp.file("mixed.pck"))?;
    pck::unpack(tmp.file("mixed.pck"), tmp.dir("out"))?;

    assert_eq!(fs::read(tmp.file("out/empty"))?, b"");
    assert_eq!(fs::read(tmp.file("out/binary.bin"))?, binary);
    assert_eq!(
        fs::read(tmp.file("out/ñandú €.txt"))?,
        "non-ASCII contents ✓".as_bytes()
    );
    assert_eq!(fs::read(tmp.file("out/flattened.txt"))?, b"flat");
    assert_eq!(count_files(&tmp.dir("out"))?, 4);
    Ok(())
}

#[test]
fn offsets_are_contiguous() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let files = (0..5)
        .map(|i| tmp.input(&format!("file{}", i), &vec![b'x'; i * 7]))
        .collect::<io::Result<Vec<_>>>()?;

    pck::pack(&files, tmp.file("five.pck"))?;

    let entries = pck::list(tmp.file("five.pck"))?;
    assert_eq!(entries.len(), 5);
    for pair in entries.windows(2) {
        let (_, prev) = &pair[0];
        let (_, next) = &pair[1];
        assert_eq!(next.offset(), prev.offset() + prev.size());
    }

    let names_size: usize = (0..5).map(|i| format!("file{}", i).len() + 1).sum();
    let data_start = HEADER_SIZE + 5 * ENTRY_SIZE + names_size;
    assert_eq!(entries[0].1.offset() as usize, data_start);

    let last = entries[4].1;
    assert_eq!(last.end(), fs::metadata(tmp.file("five.pck"))?.len());
    Ok(())
}

#[test]
fn names_with_subpaths_create_directories() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let source = tmp.input("data.bin", b"deep")?;

    let mut builder = pck::PackageBuilder::new();
    builder
        .file_as(&source, "sub/dir/data.bin")?
        .buffer(&b"top"[..], "top.txt")?;
    let mut archive = fs::File::create(tmp.file("nested.pck"))?;
    builder.write_archive(&mut archive)?;
    drop(archive);

    pck::unpack(tmp.file("nested.pck"), tmp.dir("out"))?;
    assert_eq!(fs::read(tmp.file("out/sub/dir/data.bin"))?, b"deep");
    assert_eq!(fs::read(tmp.file("out/top.txt"))?, b"top");
    Ok(())
}

#[test]
fn missing_input_writes_nothing() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let present = tmp.input("present.txt", b"here")?;
    let missing = tmp.file("input/missing.txt");

    let err = pck::pack([&present, &missing], tmp.file("out.pck")).unwrap_err();
    assert!(matches!(&err, pck::Error::InputNotFound { path } if *path == missing));
    assert!(!tmp.file("out.pck").exists());
    assert!(!tmp.file(".pck.out.pck").exists());
    Ok(())
}

#[test]
fn unwritable_output() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let input = tmp.input("a.txt", b"a")?;

    let err = pck::pack([&input], tmp.file("no/such/dir/out.pck")).unwrap_err();
    assert!(matches!(err, pck::Error::OutputUnwritable { .. }));
    Ok(())
}

#[test]
fn pack_overwrites_existing_archive() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let input = tmp.input("a.txt", b"new")?;
    fs::write(tmp.file("out.pck"), b"stale contents that are longer")?;

    pck::pack([&input], tmp.file("out.pck"))?;
    pck::unpack(tmp.file("out.pck"), tmp.dir("out"))?;
    assert_eq!(fs::read(tmp.file("out/a.txt"))?, b"new");
    Ok(())
}

#[test]
fn missing_archive() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;

    let err = pck::unpack(tmp.file("nope.pck"), tmp.dir("out")).unwrap_err();
    assert!(matches!(err, pck::Error::InputNotFound { .. }));
    Ok(())
}

#[test]
fn reserved_field_rejected() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let files = [
        tmp.input("one", b"1")?,
        tmp.input("two", b"22")?,
        tmp.input("three", b"333")?,
    ];
    pck::pack(&files, tmp.file("ok.pck"))?;
    let archive = fs::read(tmp.file("ok.pck"))?;

    for index in 0..files.len() {
        let mut corrupt = archive.clone();
        corrupt[HEADER_SIZE + index * ENTRY_SIZE + 3] = 0x80;
        fs::write(tmp.file("bad.pck"), &corrupt)?;

        let out = tmp.dir(format!("out{}", index));
        let err = pck::unpack(tmp.file("bad.pck"), &out).unwrap_err();
        assert!(err.is_corrupt(), "{:?}", err);
        assert!(matches!(
            err,
            pck::Error::Core(pck_core::Error::ArchiveCorrupt(Corruption::ReservedNotZero {
                index: i,
                value: 0x8000_0000,
            })) if i as usize == index
        ));
        assert_eq!(count_files(&out)?, 0);
    }
    Ok(())
}

#[test]
fn truncation_never_succeeds() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let files = [tmp.input("a.txt", b"alpha")?, tmp.input("b.txt", b"bravo")?];
    pck::pack(&files, tmp.file("ok.pck"))?;
    let archive = fs::read(tmp.file("ok.pck"))?;

    for len in 0..archive.len() {
        fs::write(tmp.file("short.pck"), &archive[..len])?;
        let out = tmp.dir(format!("out{}", len));

        let err = pck::unpack(tmp.file("short.pck"), &out).unwrap_err();
        assert!(
            err.is_truncated() || err.is_corrupt(),
            "length {}: {:?}",
            len,
            err
        );
        assert_eq!(count_files(&out)?, 0, "length {}", len);
    }
    Ok(())
}

#[test]
fn bad_names_rejected() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;

    // Hand-built: one entry named "../escape" holding "x"
    let name = b"../escape";
    let mut archive = vec![];
    archive.extend_from_slice(&1u32.to_le_bytes());
    archive.extend_from_slice(&0u32.to_le_bytes());
    archive.extend_from_slice(&((HEADER_SIZE + ENTRY_SIZE + name.len() + 1) as u32).to_le_bytes());
    archive.extend_from_slice(&1u32.to_le_bytes());
    archive.extend_from_slice(name);
    archive.push(0);
    archive.push(b'x');
    fs::write(tmp.file("escape.pck"), &archive)?;

    let err = pck::unpack(tmp.file("escape.pck"), tmp.dir("out/inner")).unwrap_err();
    assert!(matches!(err, pck::Error::InvalidPath { .. }));
    assert!(!tmp.file("out/escape").exists());

    // Same layout, name bytes that are not UTF-8
    archive[HEADER_SIZE + ENTRY_SIZE] = 0xff;
    fs::write(tmp.file("utf8.pck"), &archive)?;
    let err = pck::unpack(tmp.file("utf8.pck"), tmp.dir("out2")).unwrap_err();
    assert!(err.is_name_decode(), "{:?}", err);
    Ok(())
}

#[test]
fn package_file_reads_head() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let files = [tmp.input("x", b"xx")?, tmp.input("y", b"yyy")?];
    pck::pack(&files, tmp.file("xy.pck"))?;

    let mut package = PackageFile::new(tmp.file("xy.pck"))?;
    let head = package.read_head()?;
    let names: Vec<_> = head.entries().map(|(name, _)| name).collect();
    assert_eq!(names, ["x", "y"]);
    assert_eq!(package.len()?, fs::metadata(tmp.file("xy.pck"))?.len());

    let (_, y) = head.entries().nth(1).unwrap();
    let mut buf = [0; 3];
    assert_eq!(package.read_entry(y, 0, &mut buf)?, 3);
    assert_eq!(&buf, b"yyy");
    Ok(())
}

#[test]
fn verify_detects_changes() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let files = [tmp.input("a.txt", b"alpha")?, tmp.input("b.txt", b"bravo")?];
    pck::pack(&files, tmp.file("ab.pck"))?;
    pck::unpack(tmp.file("ab.pck"), tmp.dir("out"))?;

    pck::verify(tmp.file("ab.pck"), tmp.dir("out"))?;

    fs::write(tmp.file("out/b.txt"), b"brave")?;
    let err = pck::verify(tmp.file("ab.pck"), tmp.dir("out")).unwrap_err();
    assert!(matches!(err, pck::Error::VerifyMismatch { name, .. } if name == "b.txt"));

    fs::remove_file(tmp.file("out/a.txt"))?;
    let err = pck::verify(tmp.file("ab.pck"), tmp.dir("out")).unwrap_err();
    assert!(matches!(err, pck::Error::InputNotFound { .. }));
    Ok(())
}

#[test]
fn unpack_all_skips_other_files() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let input = tmp.input("a.txt", b"alpha")?;
    pck::pack([&input], tmp.file("game.pck"))?;

    let unpacked = pck::unpack_all([tmp.file("game.pck"), input], tmp.dir("out"), false)?;
    assert_eq!(unpacked, 1);
    assert_eq!(fs::read(tmp.file("out/game/a.txt"))?, b"alpha");

    let produced: Vec<_> = fs::read_dir(tmp.dir("out"))?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<io::Result<_>>()?;
    assert_eq!(produced, ["game"]);
    Ok(())
}

#[test]
fn unpack_all_flat() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let a = tmp.input("a.txt", b"alpha")?;
    let b = tmp.input("b.txt", b"bravo")?;
    pck::pack([&a], tmp.file("one.pck"))?;
    pck::pack([&b], tmp.file("two.pck"))?;

    let unpacked = pck::unpack_all(
        [tmp.file("one.pck"), tmp.file("two.pck")],
        tmp.dir("out"),
        true,
    )?;
    assert_eq!(unpacked, 2);
    assert_eq!(fs::read(tmp.file("out/a.txt"))?, b"alpha");
    assert_eq!(fs::read(tmp.file("out/b.txt"))?, b"bravo");
    assert_eq!(count_files(&tmp.dir("out"))?, 2);
    Ok(())
}

#[test]
fn unpack_all_without_archives() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let input = tmp.input("a.txt", b"alpha")?;
    pck::pack([&input], tmp.file("upper.PCK"))?;

    let err = pck::unpack_all([input, tmp.file("upper.PCK")], tmp.dir("out"), false).unwrap_err();
    assert!(matches!(err, pck::Error::NothingToUnpack { skipped } if skipped.len() == 2));
    assert!(!tmp.dir("out").exists());
    Ok(())
}

#[test]
fn builder_refuses_names_unpack_would_reject() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let source = tmp.input("data.bin", b"x")?;

    let mut builder = pck::PackageBuilder::new();
    for name in ["../escape", "/abs/path", "./dot"] {
        let err = builder.file_as(&source, name).unwrap_err();
        assert!(matches!(err, pck::Error::InvalidName { .. }), "{}: {:?}", name, err);
    }

    builder.file_as(&source, "nested/data.bin")?;
    let mut archive = fs::File::create(tmp.file("ok.pck"))?;
    builder.write_archive(&mut archive)?;
    drop(archive);

    pck::unpack(tmp.file("ok.pck"), tmp.dir("out"))?;
    assert_eq!(fs::read(tmp.file("out/nested/data.bin"))?, b"x");
    Ok(())
}
