//! Directory operations used by staging, plugins and the local media agent.
//!
//! All functions are blocking; async callers wrap the expensive ones
//! (`copy_*`) in `spawn_blocking`.

use super::walker::{modified_ms, walk_directory, WalkOptions};
use crate::utils::{Result, ServiceError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Summary of a copy operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub bytes: u64,
}

/// Create `path` and any missing parents.
pub fn create_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Remove everything inside `path`, keeping `path` itself.
pub fn clear_dir(path: &Path) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        // file_type() does not follow links; a link to a directory is removed as a file
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}

/// Remove `path` and all of its content. A missing directory counts as removed.
pub fn remove_dir_recursive(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Restrict `path` to its owner.
#[cfg(unix)]
pub fn set_owner_only(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
pub fn set_owner_only(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Immediate children of `path`, in no particular order.
pub fn list_immediate_children(path: &Path) -> io::Result<Vec<PathBuf>> {
    fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect()
}

/// Fail with `InvalidRequest` unless `path` denotes an existing directory
/// (and, with `must_be_empty`, one without any entries).
pub fn assert_directory(path: &Path, follow_symlinks: bool, must_be_empty: bool) -> Result<()> {
    let metadata = if follow_symlinks {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    };

    let is_dir = metadata.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(ServiceError::InvalidRequest(format!(
            "{} does not denote an existing directory",
            path.display()
        )));
    }

    if must_be_empty {
        let mut entries = fs::read_dir(path).map_err(|e| {
            ServiceError::InvalidRequest(format!("cannot list {}: {}", path.display(), e))
        })?;
        if entries.next().is_some() {
            return Err(ServiceError::InvalidRequest(format!(
                "{} does not denote an empty directory",
                path.display()
            )));
        }
    }

    Ok(())
}

/// Copy every regular file under `src` whose mtime is strictly greater than
/// `since_ms` into `dst`, preserving relative paths. Gives up with
/// `ErrorKind::Interrupted` before the next file once `stop` is cancelled.
pub fn copy_changed_since(
    src: &Path,
    dst: &Path,
    since_ms: i64,
    follow_symlinks: bool,
    stop: &CancellationToken,
) -> io::Result<CopyStats> {
    let options = WalkOptions {
        follow_links: follow_symlinks,
    };

    let mut stats = CopyStats::default();
    for file in walk_directory(src, &options)? {
        if file.modified_ms <= since_ms {
            continue;
        }
        check_stop(stop)?;
        let target = dst.join(&file.relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        stats.bytes += copy_file_preserving_mtime(&file.path, &target)?;
        stats.files += 1;
    }

    Ok(stats)
}

/// Copy the whole content of `src` into `dst`, overwriting existing files.
/// Symbolic links are recreated as links rather than followed. Gives up with
/// `ErrorKind::Interrupted` before the next entry once `stop` is cancelled.
pub fn copy_all(src: &Path, dst: &Path, stop: &CancellationToken) -> io::Result<CopyStats> {
    let mut stats = CopyStats::default();

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry?;
        check_stop(stop)?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            stats.bytes += copy_file_preserving_mtime(entry.path(), &target)?;
            stats.files += 1;
        }
    }

    Ok(stats)
}

fn check_stop(stop: &CancellationToken) -> io::Result<()> {
    if stop.is_cancelled() {
        return Err(io::Error::new(io::ErrorKind::Interrupted, "copy cancelled"));
    }
    Ok(())
}

fn copy_file_preserving_mtime(src: &Path, dst: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dst)?;
    let mtime = modified_ms(&fs::metadata(src)?)?;
    if mtime >= 0 {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_millis(mtime as u64);
        fs::File::options().write(true).open(dst)?.set_modified(modified)?;
    }
    Ok(bytes)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use tempfile::TempDir;

    fn write_with_mtime(path: &Path, content: &[u8], mtime_ms: u64) -> io::Result<()> {
        fs::write(path, content)?;
        fs::File::options()
            .write(true)
            .open(path)?
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_millis(mtime_ms))
    }

    #[test]
    fn test_copy_changed_since_filters_by_mtime() -> io::Result<()> {
        let src = TempDir::new()?;
        let dst = TempDir::new()?;

        write_with_mtime(&src.path().join("old.txt"), b"old", 500)?;
        write_with_mtime(&src.path().join("mid.txt"), b"mid", 1500)?;
        fs::create_dir(src.path().join("nested"))?;
        write_with_mtime(&src.path().join("nested/new.txt"), b"new", 2000)?;

        let stop = CancellationToken::new();
        let stats = copy_changed_since(src.path(), dst.path(), 1000, false, &stop)?;

        assert_eq!(stats.files, 2);
        assert!(!dst.path().join("old.txt").exists());
        assert_eq!(fs::read(dst.path().join("mid.txt"))?, b"mid");
        assert_eq!(fs::read(dst.path().join("nested/new.txt"))?, b"new");
        Ok(())
    }

    #[test]
    fn test_copy_changed_since_boundary_is_exclusive() -> io::Result<()> {
        let src = TempDir::new()?;
        let dst = TempDir::new()?;

        write_with_mtime(&src.path().join("same.txt"), b"x", 1000)?;

        let stop = CancellationToken::new();
        let stats = copy_changed_since(src.path(), dst.path(), 1000, false, &stop)?;
        assert_eq!(stats, CopyStats::default());
        Ok(())
    }

    #[test]
    fn test_copy_all_merges_and_overwrites() -> io::Result<()> {
        let src = TempDir::new()?;
        let dst = TempDir::new()?;

        fs::create_dir(src.path().join("a"))?;
        fs::write(src.path().join("a/one.txt"), b"new")?;
        fs::create_dir(dst.path().join("a"))?;
        fs::write(dst.path().join("a/one.txt"), b"old")?;
        fs::write(dst.path().join("keep.txt"), b"keep")?;

        let stats = copy_all(src.path(), dst.path(), &CancellationToken::new())?;

        assert_eq!(stats.files, 1);
        assert_eq!(fs::read(dst.path().join("a/one.txt"))?, b"new");
        assert_eq!(fs::read(dst.path().join("keep.txt"))?, b"keep");
        Ok(())
    }

    #[test]
    fn test_clear_and_remove() -> io::Result<()> {
        let dir = TempDir::new()?;
        let stage = dir.path().join("stage");
        fs::create_dir_all(stage.join("sub"))?;
        fs::write(stage.join("sub/f"), b"x")?;
        fs::write(stage.join("g"), b"y")?;

        clear_dir(&stage)?;
        assert!(stage.exists());
        assert!(list_immediate_children(&stage)?.is_empty());

        remove_dir_recursive(&stage)?;
        assert!(!stage.exists());
        // Removing again is not an error
        remove_dir_recursive(&stage)?;
        Ok(())
    }

    #[test]
    fn test_assert_directory() -> io::Result<()> {
        let dir = TempDir::new()?;
        assert!(assert_directory(dir.path(), true, true).is_ok());

        fs::write(dir.path().join("f"), b"x")?;
        assert!(assert_directory(dir.path(), true, false).is_ok());

        let err = assert_directory(dir.path(), true, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = assert_directory(&dir.path().join("f"), true, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = assert_directory(&dir.path().join("missing"), true, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_assert_directory_unreadable_target() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        let target = dir.path().join("locked");
        fs::create_dir(&target)?;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o000))?;

        // Privileged users can list it anyway
        if fs::read_dir(&target).is_ok() {
            fs::set_permissions(&target, fs::Permissions::from_mode(0o700))?;
            return Ok(());
        }

        let result = assert_directory(&target, true, true);
        fs::set_permissions(&target, fs::Permissions::from_mode(0o700))?;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidRequest);
        Ok(())
    }

    #[test]
    fn test_cancelled_copy_stops_before_writing() -> io::Result<()> {
        let src = TempDir::new()?;
        let dst = TempDir::new()?;
        fs::create_dir(src.path().join("nested"))?;
        write_with_mtime(&src.path().join("nested/f.txt"), b"x", 2000)?;
        let target = dst.path().join("log");

        let stop = CancellationToken::new();
        stop.cancel();

        let err = copy_all(src.path(), &target, &stop).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        let err = copy_changed_since(src.path(), &target, 1000, false, &stop).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(!target.exists());
        Ok(())
    }
}
