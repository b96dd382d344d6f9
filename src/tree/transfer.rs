use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::TreeWalker;
use crate::error::{StoreError, StoreResult};
use crate::models::{Direction, RemoteEntry, TransferEvent, TransferReport};
use crate::remote_path;
use crate::store::RemoteStore;

impl<S: RemoteStore> TreeWalker<S> {
    /// Download a single remote file to `local_path`, replacing it.
    pub fn download_file(&self, remote: &str, local_path: &Path) -> StoreResult<PathBuf> {
        let remote = remote_path::normalize(remote);
        let bytes = self.fetch(&remote, local_path)?;
        self.notify(TransferEvent {
            direction: Direction::Download,
            local_path: local_path.to_path_buf(),
            remote_path: remote,
            bytes,
        });
        Ok(local_path.to_path_buf())
    }

    /// Mirror the remote directory `remote` into `local_dir`. Children whose
    /// target path already exists locally are skipped without comparing
    /// content. Per-entry failures are collected in the report; only an
    /// unusable root is returned as an error.
    pub fn download_tree(&self, remote: &str, local_dir: &Path) -> StoreResult<TransferReport> {
        let remote = remote_path::normalize(remote);
        let report = self.download_dir(&remote, local_dir)?;
        tracing::info!(
            "Downloaded {} -> {:?}: {} files ({} bytes), {} skipped, {} failed",
            remote,
            local_dir,
            report.transferred.len(),
            report.bytes,
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn download_dir(&self, remote: &str, local_dir: &Path) -> StoreResult<TransferReport> {
        if !local_dir.exists() {
            fs::create_dir_all(local_dir).map_err(|e| StoreError::io(local_dir, e))?;
        }

        let mut report = TransferReport::default();
        for child in self.store.list_children(remote)? {
            let target = local_dir.join(child.name());
            if target.exists() {
                tracing::debug!("Skipping {}: {:?} already present", child.path(), target);
                report.skipped.push(target);
                continue;
            }

            match &child {
                RemoteEntry::File { path, .. } => match self.fetch(path, &target) {
                    Ok(bytes) => {
                        report.transferred.push(target.clone());
                        report.bytes += bytes;
                        self.notify(TransferEvent {
                            direction: Direction::Download,
                            local_path: target,
                            remote_path: path.clone(),
                            bytes,
                        });
                    }
                    Err(e) => report.record_failure(path.clone(), e),
                },
                RemoteEntry::Directory { path, .. } => match self.download_dir(path, &target) {
                    Ok(sub) => report.merge(sub),
                    Err(e) => report.record_failure(path.clone(), e),
                },
            }
        }
        Ok(report)
    }

    /// Copy one remote file to disk. A partially written file is removed so
    /// a later run does not mistake it for a finished download.
    fn fetch(&self, remote: &str, local_path: &Path) -> StoreResult<u64> {
        tracing::debug!("Downloading {} -> {:?}", remote, local_path);
        let mut reader = self.store.read_file(remote)?;
        let mut file = File::create(local_path).map_err(|e| StoreError::io(local_path, e))?;
        match io::copy(&mut reader, &mut file) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(local_path);
                Err(StoreError::io(local_path, e))
            }
        }
    }

    /// Upload a single local file into `remote_folder`, returning the remote
    /// path it was written to.
    pub fn upload_file(
        &self,
        local_file: &Path,
        overwrite: bool,
        remote_folder: &str,
    ) -> StoreResult<String> {
        let (remote, bytes) = self.push(local_file, overwrite, remote_folder)?;
        self.notify(TransferEvent {
            direction: Direction::Upload,
            local_path: local_file.to_path_buf(),
            remote_path: remote.clone(),
            bytes,
        });
        Ok(remote)
    }

    /// Upload the directory `local_dir` as `remote_parent/<dir name>`.
    /// Does nothing when `local_dir` is not a directory. With `overwrite` an
    /// existing remote directory is reused silently; without it the collision
    /// is recorded and the walk still continues into the directory.
    pub fn upload_tree(
        &self,
        local_dir: &Path,
        overwrite: bool,
        remote_parent: &str,
    ) -> StoreResult<TransferReport> {
        if !local_dir.is_dir() {
            tracing::debug!("Not uploading {:?}: not a directory", local_dir);
            return Ok(TransferReport::default());
        }

        let report = self.upload_dir(local_dir, overwrite, &remote_path::normalize(remote_parent))?;
        tracing::info!(
            "Uploaded {:?} -> {}: {} files ({} bytes), {} failed",
            local_dir,
            remote_parent,
            report.transferred.len(),
            report.bytes,
            report.failures.len()
        );
        Ok(report)
    }

    fn upload_dir(
        &self,
        local_dir: &Path,
        overwrite: bool,
        remote_parent: &str,
    ) -> StoreResult<TransferReport> {
        let mut report = TransferReport::default();

        let target = match dir_name(local_dir) {
            Some(name) => remote_path::join(remote_parent, &name),
            None => remote_parent.to_string(),
        };

        match self.store.create_directory(&target) {
            Ok(()) => tracing::debug!("Created remote directory {}", target),
            Err(e) if e.is_already_exists() && overwrite => {
                tracing::debug!("Remote directory {} already exists", target);
            }
            Err(e) => report.record_failure(target.clone(), e),
        }

        let mut children = Vec::new();
        for entry in fs::read_dir(local_dir).map_err(|e| StoreError::io(local_dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(local_dir, e))?;
            children.push(entry.path());
        }
        children.sort();

        for child in children {
            if child.is_file() {
                match self.push(&child, overwrite, &target) {
                    Ok((remote, bytes)) => {
                        report.transferred.push(child.clone());
                        report.bytes += bytes;
                        self.notify(TransferEvent {
                            direction: Direction::Upload,
                            local_path: child,
                            remote_path: remote,
                            bytes,
                        });
                    }
                    Err(e) => report.record_failure(child.display().to_string(), e),
                }
            } else if child.is_dir() {
                match self.upload_dir(&child, overwrite, &target) {
                    Ok(sub) => report.merge(sub),
                    Err(e) => report.record_failure(child.display().to_string(), e),
                }
            }
        }
        Ok(report)
    }

    fn push(
        &self,
        local_file: &Path,
        overwrite: bool,
        remote_folder: &str,
    ) -> StoreResult<(String, u64)> {
        let name = local_file.file_name().ok_or_else(|| {
            StoreError::io(
                local_file,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        let remote = remote_path::join(remote_folder, &name.to_string_lossy());

        tracing::debug!("Uploading {:?} -> {}", local_file, remote);
        let mut file = File::open(local_file).map_err(|e| StoreError::io(local_file, e))?;
        let bytes = self.store.write_file(&remote, &mut file, overwrite)?;
        Ok((remote, bytes))
    }

    pub fn create_folder(&self, path: &str) -> StoreResult<()> {
        self.store.create_directory(&remote_path::normalize(path))
    }
}

/// Name of a local directory, resolving `.` and `..` through the
/// filesystem. `None` for a filesystem root.
fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .or_else(|| {
            dir.canonicalize()
                .ok()?
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_file("/a.txt", "0123456789")
            .add_dir("/sub")
            .add_file("/sub/b.txt", "hello");
        store
    }

    #[test]
    fn download_tree_mirrors_and_skips_present_files() {
        let dir = TempDir::new().unwrap();
        let walker = TreeWalker::new(sample_store());

        let first = walker.download_tree("/", dir.path()).unwrap();
        assert!(first.is_clean());
        assert_eq!(first.transferred.len(), 2);
        assert_eq!(first.bytes, 15);
        assert_eq!(fs::read(dir.path().join("sub").join("b.txt")).unwrap(), b"hello");

        let second = walker.download_tree("/", dir.path()).unwrap();
        assert!(second.transferred.is_empty());
        assert_eq!(second.skipped.len(), 2);
    }

    #[test]
    fn download_failure_does_not_abort_siblings() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store
            .add_file("/a.txt", "a")
            .add_file("/broken.txt", "b")
            .add_file("/c.txt", "c");
        store.inject_failure("/broken.txt");
        let walker = TreeWalker::new(store);

        let report = walker.download_tree("/", dir.path()).unwrap();
        assert_eq!(report.transferred.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "/broken.txt");
        assert!(!dir.path().join("broken.txt").exists());
        assert!(dir.path().join("c.txt").exists());
    }

    #[test]
    fn upload_tree_twice_with_overwrite_is_clean() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("photos");
        fs::create_dir_all(src.join("2024")).unwrap();
        fs::write(src.join("cover.jpg"), "img").unwrap();
        fs::write(src.join("2024").join("jan.jpg"), "jan").unwrap();

        let walker = TreeWalker::new(MemoryStore::new());
        walker.create_folder("backup").unwrap();
        let first = walker.upload_tree(&src, true, "/backup").unwrap();
        assert!(first.is_clean());
        let second = walker.upload_tree(&src, true, "/backup").unwrap();
        assert!(second.is_clean());
        assert_eq!(second.transferred.len(), 2);
        assert_eq!(
            walker.store().contents("/backup/photos/2024/jan.jpg").unwrap(),
            b"jan"
        );
    }

    #[test]
    fn upload_without_overwrite_records_collisions() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("docs");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();

        let walker = TreeWalker::new(MemoryStore::new());
        assert!(walker.upload_tree(&src, false, "/").unwrap().is_clean());

        let again = walker.upload_tree(&src, false, "/").unwrap();
        assert_eq!(again.failures.len(), 2);
        assert!(again.failures.iter().all(|f| f.error.is_already_exists()));
    }

    #[test]
    fn upload_tree_ignores_non_directories() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        let walker = TreeWalker::new(MemoryStore::new());
        let report = walker.upload_tree(&file, true, "/").unwrap();
        assert!(report.transferred.is_empty());
        assert!(!walker.store().exists("/a.txt"));
    }

    #[test]
    fn single_file_transfers_notify_once() {
        let dir = TempDir::new().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let walker = TreeWalker::with_listener(sample_store(), move |event: &TransferEvent| {
            sink.borrow_mut().push(event.clone());
        });

        let local = dir.path().join("a.txt");
        walker.download_file("a.txt", &local).unwrap();
        let remote = walker.upload_file(&local, true, "/sub").unwrap();
        assert_eq!(remote, "/sub/a.txt");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].direction, Direction::Download);
        assert_eq!(seen[0].bytes, 10);
        assert_eq!(seen[1].direction, Direction::Upload);
        assert_eq!(seen[1].local_path, local);
    }
}
