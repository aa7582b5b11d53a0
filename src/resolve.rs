//! Turning a request path into an opened filesystem target.

use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use tokio::fs::File;
use tokio::task::spawn_blocking;

use crate::error::AppError;

/// The facts about an opened target that later stages decide on.
#[derive(Clone, Debug)]
pub struct FileMetadata {
    /// Length in bytes.
    pub size: u64,
    /// Modification time, `UNIX_EPOCH` when the platform has none.
    pub modified: SystemTime,
    /// Inode number, `0` when the platform has none.
    pub ino: u64,
    /// Whether the target is a directory.
    pub is_dir: bool,
    /// Whether the target is a regular file.
    pub is_file: bool,
}

impl FileMetadata {
    fn from_std(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let ino = std::os::unix::fs::MetadataExt::ino(metadata);
        #[cfg(not(unix))]
        let ino = 0;

        FileMetadata {
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            ino,
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
        }
    }
}

#[inline]
fn decode_percents(string: &str) -> String {
    percent_encoding::percent_decode_str(string)
        .decode_utf8_lossy()
        .into_owned()
}

/// Join `request_path` onto `root`, refusing any path that would land
/// outside the root.
///
/// The path is percent-decoded, then normalized component by component:
/// `.` disappears and `..` pops the previously kept component. Escapes are
/// judged on the normalized result, not its spelling, so `a/../../x` is
/// rejected while `a/../b` resolves to `b`. A `..` with nothing left to
/// pop, or any component that smuggles in an absolute path or a Windows
/// drive prefix (e.g. `/anypath/c:/windows/win.ini`), fails with 403.
pub fn resolve_target(root: &Path, request_path: &str) -> Result<PathBuf, AppError> {
    let decoded = decode_percents(request_path);
    let mut normalized = PathBuf::new();

    for component in Path::new(&decoded).components() {
        match component {
            Component::Normal(x) => {
                // Parse again to catch a component containing a Windows
                // drive letter.
                if Path::new(&x)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
                {
                    normalized.push(x);
                } else {
                    return Err(AppError::forbidden());
                }
            }
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(AppError::forbidden());
                }
            }
            // The leading slash of the request path, or a `.`.
            Component::RootDir | Component::CurDir => {}
            Component::Prefix(_) => return Err(AppError::forbidden()),
        }
    }

    Ok(root.join(normalized))
}

/// Open a target read-only and stat it through the open handle, so the
/// metadata always describes the file actually being served.
pub async fn open_with_metadata(path: impl Into<PathBuf>) -> Result<(File, FileMetadata), IoError> {
    let path = path.into();

    // One spawn_blocking for open plus stat, instead of two round-trips
    // through tokio::fs.
    spawn_blocking(move || {
        let mut opts = std::fs::OpenOptions::new();
        opts.read(true);

        // On Windows, the file must be opened with this flag to be allowed
        // to be a directory.
        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            opts.custom_flags(winapi::um::winbase::FILE_FLAG_BACKUP_SEMANTICS);
        }

        let handle = opts.open(path)?;
        let metadata = handle.metadata()?;
        Ok((File::from_std(handle), FileMetadata::from_std(&metadata)))
    })
    .await
    .map_err(|err| IoError::new(IoErrorKind::Other, err))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> Result<PathBuf, AppError> {
        resolve_target(Path::new("/srv/files"), path)
    }

    #[test]
    fn plain_paths_join_the_root() {
        assert_eq!(resolve("/file.txt").unwrap(), Path::new("/srv/files/file.txt"));
        assert_eq!(resolve("/sub/file.txt").unwrap(), Path::new("/srv/files/sub/file.txt"));
        assert_eq!(resolve("/").unwrap(), Path::new("/srv/files"));
    }

    #[test]
    fn dot_segments_normalize_in_place() {
        assert_eq!(resolve("/a/./b").unwrap(), Path::new("/srv/files/a/b"));
        assert_eq!(resolve("/a/../b").unwrap(), Path::new("/srv/files/b"));
        assert_eq!(resolve("/a/b/../..").unwrap(), Path::new("/srv/files"));
    }

    #[test]
    fn escapes_are_refused() {
        assert!(resolve("/..").is_err());
        assert!(resolve("/../../etc/passwd").is_err());
        assert!(resolve("/a/../../b").is_err());
        assert!(resolve("/a/b/../../../c").is_err());
    }

    #[test]
    fn percent_encoded_escapes_are_refused() {
        assert!(resolve("/%2e%2e/%2e%2e/etc/passwd").is_err());
        assert!(resolve("/..%2f..%2fetc%2fpasswd").is_err());
    }

    #[test]
    fn percent_encoded_names_decode() {
        assert_eq!(
            resolve("/with%20space.txt").unwrap(),
            Path::new("/srv/files/with space.txt")
        );
    }

    #[cfg(windows)]
    #[test]
    fn drive_letter_components_are_refused() {
        assert!(resolve("/anypath/c:/windows/win.ini").is_err());
    }
}
