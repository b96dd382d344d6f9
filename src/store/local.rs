use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::RemoteStore;
use crate::error::{StoreError, StoreResult};
use crate::models::RemoteEntry;
use crate::remote_path;

/// A directory on disk acting as the remote root, e.g. a mounted share or
/// a folder kept in sync by a desktop client.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = remote_path::normalize(path);
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    fn entry_for(path: &str, metadata: &fs::Metadata) -> RemoteEntry {
        let name = remote_path::file_name(path).unwrap_or_default();
        if metadata.is_dir() {
            RemoteEntry::Directory {
                path: path.to_string(),
                name,
            }
        } else {
            RemoteEntry::File {
                path: path.to_string(),
                name,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            }
        }
    }
}

fn classify(path: &str, on_disk: &Path, err: io::Error) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_string()),
        _ => StoreError::io(on_disk, err),
    }
}

impl RemoteStore for LocalDirStore {
    fn get_metadata(&self, path: &str) -> StoreResult<RemoteEntry> {
        let path = remote_path::normalize(path);
        let on_disk = self.resolve(&path);
        let metadata = fs::metadata(&on_disk).map_err(|e| classify(&path, &on_disk, e))?;
        Ok(Self::entry_for(&path, &metadata))
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let path = remote_path::normalize(path);
        let on_disk = self.resolve(&path);
        let metadata = fs::metadata(&on_disk).map_err(|e| classify(&path, &on_disk, e))?;
        if !metadata.is_dir() {
            return Err(StoreError::NotADirectory(path));
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&on_disk).map_err(|e| StoreError::io(&on_disk, e))? {
            let entry = entry.map_err(|e| StoreError::io(&on_disk, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            // Follow symlinks the same way get_metadata does
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("Skipping dangling symlink {:?}", entry.path());
                    continue;
                }
                Err(e) => return Err(StoreError::io(entry.path(), e)),
            };
            items.push(Self::entry_for(&remote_path::join(&path, &name), &metadata));
        }

        // read_dir order is platform dependent
        items.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(items)
    }

    fn create_directory(&self, path: &str) -> StoreResult<()> {
        let path = remote_path::normalize(path);
        let on_disk = self.resolve(&path);
        fs::create_dir(&on_disk).map_err(|e| classify(&path, &on_disk, e))
    }

    fn read_file(&self, path: &str) -> StoreResult<Box<dyn Read + '_>> {
        let path = remote_path::normalize(path);
        let on_disk = self.resolve(&path);
        let file = File::open(&on_disk).map_err(|e| classify(&path, &on_disk, e))?;
        Ok(Box::new(file))
    }

    fn write_file(&self, path: &str, source: &mut dyn Read, overwrite: bool) -> StoreResult<u64> {
        let path = remote_path::normalize(path);
        let on_disk = self.resolve(&path);

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options
            .open(&on_disk)
            .map_err(|e| classify(&path, &on_disk, e))?;
        io::copy(source, &mut file).map_err(|e| StoreError::io(&on_disk, e))
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
