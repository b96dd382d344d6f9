use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::LocalEntry;

impl LocalEntry {
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if fs::metadata(&path)?.is_dir() {
            Ok(LocalEntry::Directory(path))
        } else {
            Ok(LocalEntry::File(path))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            LocalEntry::File(path) => path,
            LocalEntry::Directory(path) => path,
        }
    }

    /// Byte size, summed over descendants for a directory. Computed on
    /// every call.
    pub fn size(&self) -> io::Result<u64> {
        match self {
            LocalEntry::File(path) => Ok(fs::metadata(path)?.len()),
            LocalEntry::Directory(path) => {
                let mut total = 0;
                for entry in fs::read_dir(path)? {
                    total += LocalEntry::from_path(entry?.path())?.size()?;
                }
                Ok(total)
            }
        }
    }
}

/// Total size of a local file or directory tree.
pub fn local_size(path: &Path) -> io::Result<u64> {
    LocalEntry::from_path(path)?.size()
}
