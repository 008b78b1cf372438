use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Files directly under `dir` with the given extension, sorted by name.
/// A missing directory lists as empty.
pub fn list_files(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();

    // Zero-padded names (frame_000042.jpg) sort numerically this way
    files.sort();
    Ok(files)
}

/// Removes every regular file in `dir`, creating it if absent.
/// Subdirectories are left alone.
pub fn wipe_dir(dir: &Path) -> io::Result<usize> {
    fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn temp_beside(path: &Path) -> io::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}

/// Writes through a sibling temp file and renames it over `path`, so a crash
/// leaves either the old content or the new, never a torn file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copies `src` to `dst` only when `dst` does not exist yet.
/// Returns whether a copy was made.
pub fn copy_if_absent(src: &Path, dst: &Path) -> io::Result<bool> {
    if dst.exists() {
        return Ok(false);
    }
    write_if_absent(dst, &fs::read(src)?)
}

/// Writes `bytes` to `dst` unless something is already there.
/// Returns whether the file was written.
pub fn write_if_absent(dst: &Path, bytes: &[u8]) -> io::Result<bool> {
    if dst.exists() {
        return Ok(false);
    }
    let mut tmp = temp_beside(dst)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(dst) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_000010.jpg", "frame_000002.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = list_files(dir.path(), "jpg").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frame_000002.jpg", "frame_000010.jpg"]);

        assert!(list_files(&dir.path().join("missing"), "jpg").unwrap().is_empty());
    }

    #[test]
    fn test_wipe_dir_keeps_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(wipe_dir(dir.path()).unwrap(), 1);
        assert!(!dir.path().join("a.jpg").exists());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_copy_if_absent_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.csv");
        let dst = dir.path().join("backup").join("dst.csv");

        fs::write(&src, b"first").unwrap();
        assert!(copy_if_absent(&src, &dst).unwrap());

        fs::write(&src, b"second").unwrap();
        assert!(!copy_if_absent(&src, &dst).unwrap());
        assert_eq!(fs::read(&dst).unwrap(), b"first");
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }
}
