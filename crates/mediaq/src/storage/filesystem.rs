use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Suffix of the staging copy written next to the destination when a rename
/// across filesystems is not possible.
const STAGING_SUFFIX: &str = ".partial";

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copying into a staging name beside `dst`,
/// renaming that into place and then removing the original, so `dst` never
/// holds a partial file.
pub fn relocate(src: &Path, dst: &Path) -> Result<(), StorageError> {
    // Fast path: atomic rename
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let move_error = |e: std::io::Error| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    };

    let staging = staging_path(dst);
    if let Err(e) = std::fs::copy(src, &staging) {
        let _ = std::fs::remove_file(&staging);
        return Err(move_error(e));
    }
    if let Err(e) = std::fs::rename(&staging, dst) {
        let _ = std::fs::remove_file(&staging);
        return Err(move_error(e));
    }
    std::fs::remove_file(src).map_err(move_error)?;
    Ok(())
}

fn staging_path(dst: &Path) -> PathBuf {
    let mut name: OsString = dst.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    dst.with_file_name(name)
}

/// The final download directory and the temporary directory fetches land in.
pub struct MediaStore {
    download_directory: PathBuf,
    temp_directory: PathBuf,
}

impl MediaStore {
    pub fn new<P: AsRef<Path>>(download_directory: P, temp_directory: P) -> Self {
        Self {
            download_directory: download_directory.as_ref().to_path_buf(),
            temp_directory: temp_directory.as_ref().to_path_buf(),
        }
    }

    pub fn download_directory(&self) -> &Path {
        &self.download_directory
    }

    /// Where a file named `basename` ends up.
    pub fn final_path(&self, basename: &str) -> PathBuf {
        self.download_directory.join(basename)
    }

    /// Where a file named `basename` is fetched to before relocation.
    pub fn temp_path(&self, basename: &str) -> PathBuf {
        self.temp_directory.join(basename)
    }

    /// Creates both directories if missing.
    pub fn ensure_directories(&self) -> Result<(), StorageError> {
        ensure_directory(&self.download_directory)?;
        ensure_directory(&self.temp_directory)
    }

    /// Size of a file on disk, in bytes.
    pub fn file_size(&self, path: &Path) -> Result<i64, StorageError> {
        let metadata = std::fs::metadata(path).map_err(|e| StorageError::Metadata {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(i64::try_from(metadata.len()).unwrap_or(i64::MAX))
    }
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relocate_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("a.mp4");
        let dst = temp_dir.path().join("b.mp4");
        std::fs::write(&src, b"video").unwrap();

        relocate(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"video");
    }

    #[test]
    fn test_relocate_missing_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("nonexistent.mp4");
        let dst = temp_dir.path().join("out.mp4");

        match relocate(&src, &dst) {
            Err(StorageError::MoveFile { from, .. }) => {
                assert!(from.to_string_lossy().contains("nonexistent.mp4"));
            }
            other => panic!("Expected MoveFile error, got {:?}", other),
        }
        assert!(!dst.exists());
        assert!(!staging_path(&dst).exists());
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let staging = staging_path(Path::new("/downloads/clip.mp4"));
        assert_eq!(staging, PathBuf::from("/downloads/clip.mp4.partial"));
    }

    #[test]
    fn test_store_paths_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let downloads = temp_dir.path().join("downloads");
        let tmp = temp_dir.path().join("tmp");
        let store = MediaStore::new(&downloads, &tmp);

        store.ensure_directories().unwrap();
        assert!(downloads.is_dir());
        assert!(tmp.is_dir());

        assert_eq!(store.final_path("x.mp4"), downloads.join("x.mp4"));
        assert_eq!(store.temp_path("x.mp4"), tmp.join("x.mp4"));
        assert_eq!(store.download_directory(), downloads.as_path());
    }

    #[test]
    fn test_file_size_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = MediaStore::new(temp_dir.path(), temp_dir.path());
        let path = temp_dir.path().join("f.bin");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        assert_eq!(store.file_size(&path).unwrap(), 1234);
        assert!(matches!(
            store.file_size(&temp_dir.path().join("missing")),
            Err(StorageError::Metadata { .. })
        ));
    }
}
