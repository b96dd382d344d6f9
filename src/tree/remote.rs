use chrono::{DateTime, Utc};

use super::TreeWalker;
use crate::error::{StoreError, StoreResult};
use crate::models::RemoteEntry;
use crate::remote_path;
use crate::store::RemoteStore;

impl<S: RemoteStore> TreeWalker<S> {
    /// Flatten the tree under `path` in pre-order: every directory entry is
    /// immediately followed by its own contents.
    pub fn list_tree(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let path = remote_path::normalize(path);
        if let RemoteEntry::File { .. } = self.store.get_metadata(&path)? {
            return Err(StoreError::NotADirectory(path));
        }

        let mut entries = Vec::new();
        self.collect_tree(&path, &mut entries)?;
        tracing::debug!("Listed {} entries under {}", entries.len(), path);
        Ok(entries)
    }

    fn collect_tree(&self, path: &str, out: &mut Vec<RemoteEntry>) -> StoreResult<()> {
        for child in self.store.list_children(path)? {
            match &child {
                RemoteEntry::Directory { path: child_path, .. } => {
                    let child_path = child_path.clone();
                    out.push(child);
                    self.collect_tree(&child_path, out)?;
                }
                RemoteEntry::File { .. } => out.push(child),
            }
        }
        Ok(())
    }

    /// Total bytes of every file reachable from `path`. A file path yields
    /// its own size.
    pub fn tree_size(&self, path: &str) -> StoreResult<u64> {
        let path = remote_path::normalize(path);
        match self.store.get_metadata(&path)? {
            RemoteEntry::File { size, .. } => Ok(size),
            RemoteEntry::Directory { .. } => self.directory_size(&path),
        }
    }

    fn directory_size(&self, path: &str) -> StoreResult<u64> {
        let mut total = 0;
        for child in self.store.list_children(path)? {
            total += match child {
                RemoteEntry::File { size, .. } => size,
                RemoteEntry::Directory { path, .. } => self.directory_size(&path)?,
            };
        }
        Ok(total)
    }

    /// Modification time of a file; `None` for directories or when the
    /// store does not track it.
    pub fn last_modified(&self, path: &str) -> StoreResult<Option<DateTime<Utc>>> {
        match self.store.get_metadata(&remote_path::normalize(path))? {
            RemoteEntry::File { modified, .. } => Ok(modified),
            RemoteEntry::Directory { .. } => Ok(None),
        }
    }
}
