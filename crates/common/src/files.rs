//! Filesystem helpers used to lay out node directories.
//!
//! Every operation reports failure through [`FsError`]; callers decide
//! whether a failure aborts their work or is only recorded.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use ::zip::result::ZipError;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Mode applied to every extracted template entry (rwxr-xr-x).
pub const EXTRACTED_MODE: u32 = 0o755;

/// Mode of the leaf directory created by [`create_dir`].
pub const DIR_MODE: u32 = 0o777;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("copy failed: source {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("copy failed: destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("{0} is not a zip archive")]
    NotAnArchive(PathBuf),

    #[error("archive entry {0:?} escapes the destination directory")]
    UnsafeEntry(String),

    #[error("archive error on {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| FsError::Io { path, source }
    }
}

/// Create `path` and any missing parents. Existing directories are left alone.
pub fn create_dir(path: &Path) -> Result<(), FsError> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "directory already exists");
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path).map_err(FsError::io(path))?;
    // DirBuilder's mode is still masked by the umask
    set_mode(path, DIR_MODE)?;

    tracing::info!(path = %path.display(), "created directory");
    Ok(())
}

/// Recursively delete `path`. Missing directories are not an error.
pub fn remove_dir(path: &Path) -> Result<(), FsError> {
    if !path.exists() {
        return Ok(());
    }
    fs::remove_dir_all(path).map_err(FsError::io(path))?;
    tracing::info!(path = %path.display(), "removed directory");
    Ok(())
}

/// Copy `src` to `dest` byte for byte, refusing to overwrite an existing file.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, FsError> {
    if !src.exists() {
        return Err(FsError::SourceMissing(src.to_path_buf()));
    }

    let mut reader = File::open(src).map_err(FsError::io(src))?;
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(FsError::DestinationExists(dest.to_path_buf()));
        }
        Err(e) => return Err(FsError::Io { path: dest.to_path_buf(), source: e }),
    };

    io::copy(&mut reader, &mut writer).map_err(FsError::io(dest))
}

/// Extract every entry of `archive` under `dest_dir`.
///
/// Extracted files and directories are chmod'ed to [`EXTRACTED_MODE`] so the
/// bundled client binary stays executable whatever the archive recorded.
/// Returns the number of entries extracted.
pub fn unzip(archive: &Path, dest_dir: &Path) -> Result<usize, FsError> {
    let file = File::open(archive).map_err(FsError::io(archive))?;
    let mut zip = ZipArchive::new(file).map_err(|e| match e {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            FsError::NotAnArchive(archive.to_path_buf())
        }
        other => FsError::Archive {
            path: archive.to_path_buf(),
            source: other,
        },
    })?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|source| FsError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| FsError::UnsafeEntry(entry.name().to_string()))?;
        let target = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(FsError::io(&target))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(FsError::io(parent))?;
            }
            let mut out = File::create(&target).map_err(FsError::io(&target))?;
            io::copy(&mut entry, &mut out).map_err(FsError::io(&target))?;
        }

        set_mode(&target, EXTRACTED_MODE)?;
    }

    tracing::debug!(
        archive = %archive.display(),
        dest = %dest_dir.display(),
        entries = zip.len(),
        "extracted archive"
    );
    Ok(zip.len())
}

/// Archive the tree under `src_dir` into `<dest_without_ext>.zip`.
///
/// Entry names are relative to `src_dir` and always use `/` separators.
pub fn zip(src_dir: &Path, dest_without_ext: &Path) -> Result<PathBuf, FsError> {
    let mut zip_path = dest_without_ext.as_os_str().to_owned();
    zip_path.push(".zip");
    let zip_path = PathBuf::from(zip_path);

    let file = File::create(&zip_path).map_err(FsError::io(&zip_path))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(EXTRACTED_MODE);
    let archive_err = |source| FsError::Archive {
        path: zip_path.clone(),
        source,
    };

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src_dir).to_path_buf();
            FsError::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(src_dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer.start_file(name, options).map_err(archive_err)?;
        let mut input = File::open(entry.path()).map_err(FsError::io(entry.path()))?;
        io::copy(&mut input, &mut writer).map_err(FsError::io(entry.path()))?;
    }

    writer.finish().map_err(archive_err)?;
    tracing::info!(
        src = %src_dir.display(),
        archive = %zip_path.display(),
        "created archive"
    );
    Ok(zip_path)
}

/// Append `text` to `path`, creating the file if needed.
pub fn append(path: &Path, text: &str) -> Result<(), FsError> {
    use std::io::Write;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(FsError::io(path))?;
    file.write_all(text.as_bytes()).map_err(FsError::io(path))
}

pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<(), FsError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(FsError::io(path))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_create_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");

        create_dir(&dir).unwrap();
        fs::write(dir.join("keep.txt"), "x").unwrap();
        create_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_to_string(dir.join("keep.txt")).unwrap(), "x");
        assert_eq!(fs::read_dir(tmp.path().join("a")).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_create_dir_leaf_ignores_umask() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("scenario");

        create_dir(&dir).unwrap();
        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, DIR_MODE);
    }

    #[test]
    fn test_remove_dir_missing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        remove_dir(&dir).unwrap();

        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("f"), "x").unwrap();
        remove_dir(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_copy_file_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.pubkey");
        let dest = tmp.path().join("dest.pubkey");
        fs::write(&src, b"new key").unwrap();
        fs::write(&dest, b"old key").unwrap();

        let err = copy_file(&src, &dest).unwrap_err();
        assert!(matches!(err, FsError::DestinationExists(_)));
        assert_eq!(fs::read(&dest).unwrap(), b"old key");
    }

    #[test]
    fn test_copy_file_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("dest");

        let err = copy_file(&tmp.path().join("nope"), &dest).unwrap_err();
        assert!(matches!(err, FsError::SourceMissing(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_copy_file_is_byte_exact() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("dest");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(&src, &bytes).unwrap();

        assert_eq!(copy_file(&src, &dest).unwrap(), 4096);
        assert_eq!(fs::read(&dest).unwrap(), bytes);
    }

    #[test]
    fn test_unzip_rejects_non_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let bogus = tmp.path().join("template.zip");
        fs::write(&bogus, "definitely not a zip file").unwrap();

        let err = unzip(&bogus, &tmp.path().join("out")).unwrap_err();
        assert!(matches!(err, FsError::NotAnArchive(_)));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_zip_then_unzip_preserves_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("skeleton");
        fs::create_dir_all(src.join("pubkeys")).unwrap();
        fs::create_dir_all(src.join("bootnodes")).unwrap();
        fs::write(src.join("pubkeys").join(".keep"), "").unwrap();
        fs::write(src.join("bootnodes").join("nodes.txt"), "").unwrap();
        fs::write(src.join("whisper_client"), "#!/bin/sh\n").unwrap();

        let archive = zip(&src, &tmp.path().join("templatenode")).unwrap();
        assert_eq!(archive, tmp.path().join("templatenode.zip"));

        let out = tmp.path().join("node1");
        assert_eq!(unzip(&archive, &out).unwrap(), 3);
        assert!(out.join("pubkeys").join(".keep").is_file());
        assert!(out.join("bootnodes").join("nodes.txt").is_file());
        assert_eq!(
            fs::read_to_string(out.join("whisper_client")).unwrap(),
            "#!/bin/sh\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unzip_normalizes_permissions() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("t.zip");
        let mut writer = ZipWriter::new(File::create(&archive).unwrap());
        let read_only = SimpleFileOptions::default().unix_permissions(0o400);
        writer.add_directory("bootnodes/", read_only).unwrap();
        writer.start_file("whisper_client", read_only).unwrap();
        writer.write_all(b"bin").unwrap();
        writer.finish().unwrap();

        let out = tmp.path().join("out");
        unzip(&archive, &out).unwrap();

        for path in [out.join("whisper_client"), out.join("bootnodes")] {
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, EXTRACTED_MODE, "{}", path.display());
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nodes.txt");
        append(&path, "A\n").unwrap();
        append(&path, "B\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A\nB\n");
    }
}
