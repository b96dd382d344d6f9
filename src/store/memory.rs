use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::RemoteStore;
use crate::error::{StoreError, StoreResult};
use crate::models::RemoteEntry;
use crate::remote_path;

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Vec<u8>,
        modified: DateTime<Utc>,
    },
    Directory {
        children: Vec<String>,
    },
}

#[derive(Debug)]
struct Inner {
    nodes: HashMap<String, Node>,
    failing: HashSet<String>,
}

/// In-process store. Children keep insertion order, so listings come back
/// in the order entries were added.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            remote_path::ROOT.to_string(),
            Node::Directory {
                children: Vec::new(),
            },
        );
        Self {
            inner: RwLock::new(Inner {
                nodes,
                failing: HashSet::new(),
            }),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: &str, data: impl Into<Vec<u8>>) -> &Self {
        let path = remote_path::normalize(path);
        let mut inner = self.write();
        inner.ensure_parents(&path);
        inner.insert(
            &path,
            Node::File {
                data: data.into(),
                modified: Utc::now(),
            },
        );
        self
    }

    /// Add a directory, creating missing parent directories.
    pub fn add_dir(&self, path: &str) -> &Self {
        let path = remote_path::normalize(path);
        let mut inner = self.write();
        inner.ensure_parents(&path);
        if !inner.nodes.contains_key(&path) {
            inner.insert(
                &path,
                Node::Directory {
                    children: Vec::new(),
                },
            );
        }
        self
    }

    /// Make every read, write and listing of `path` fail with a transport
    /// error. Used to exercise partial-failure handling.
    pub fn inject_failure(&self, path: &str) -> &Self {
        self.write().failing.insert(remote_path::normalize(path));
        self
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.read().nodes.get(&remote_path::normalize(path)) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.read()
            .nodes
            .contains_key(&remote_path::normalize(path))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn check_failure(&self, path: &str) -> StoreResult<()> {
        if self.failing.contains(path) {
            return Err(StoreError::Transport(format!("injected failure at {}", path)));
        }
        Ok(())
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut missing = Vec::new();
        let mut current = remote_path::parent(path);
        while let Some(dir) = current {
            if self.nodes.contains_key(&dir) {
                break;
            }
            current = remote_path::parent(&dir);
            missing.push(dir);
        }
        for dir in missing.into_iter().rev() {
            self.insert(
                &dir,
                Node::Directory {
                    children: Vec::new(),
                },
            );
        }
    }

    /// Insert or replace a node and link it into its parent.
    fn insert(&mut self, path: &str, node: Node) {
        let replaced = self.nodes.insert(path.to_string(), node).is_some();
        if replaced {
            return;
        }
        if let (Some(parent), Some(name)) = (remote_path::parent(path), remote_path::file_name(path)) {
            if let Some(Node::Directory { children }) = self.nodes.get_mut(&parent) {
                children.push(name);
            }
        }
    }

    fn entry(&self, path: &str) -> StoreResult<RemoteEntry> {
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let name = remote_path::file_name(path).unwrap_or_default();
        Ok(match node {
            Node::File { data, modified } => RemoteEntry::File {
                path: path.to_string(),
                name,
                size: data.len() as u64,
                modified: Some(*modified),
            },
            Node::Directory { .. } => RemoteEntry::Directory {
                path: path.to_string(),
                name,
            },
        })
    }
}

impl RemoteStore for MemoryStore {
    fn get_metadata(&self, path: &str) -> StoreResult<RemoteEntry> {
        let path = remote_path::normalize(path);
        self.read().entry(&path)
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let path = remote_path::normalize(path);
        let inner = self.read();
        inner.check_failure(&path)?;
        match inner.nodes.get(&path) {
            None => Err(StoreError::NotFound(path)),
            Some(Node::File { .. }) => Err(StoreError::NotADirectory(path)),
            Some(Node::Directory { children }) => children
                .iter()
                .map(|name| inner.entry(&remote_path::join(&path, name)))
                .collect(),
        }
    }

    fn create_directory(&self, path: &str) -> StoreResult<()> {
        let path = remote_path::normalize(path);
        let mut inner = self.write();
        inner.check_failure(&path)?;
        if inner.nodes.contains_key(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        let parent = remote_path::parent(&path).unwrap_or_else(|| remote_path::ROOT.to_string());
        match inner.nodes.get(&parent) {
            None => return Err(StoreError::NotFound(parent)),
            Some(Node::File { .. }) => return Err(StoreError::NotADirectory(parent)),
            Some(Node::Directory { .. }) => {}
        }
        inner.insert(
            &path,
            Node::Directory {
                children: Vec::new(),
            },
        );
        Ok(())
    }

    fn read_file(&self, path: &str) -> StoreResult<Box<dyn Read + '_>> {
        let path = remote_path::normalize(path);
        let inner = self.read();
        inner.check_failure(&path)?;
        match inner.nodes.get(&path) {
            None => Err(StoreError::NotFound(path)),
            Some(Node::Directory { .. }) => Err(StoreError::Transport(format!(
                "{} is a directory and cannot be read",
                path
            ))),
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
        }
    }

    fn write_file(&self, path: &str, source: &mut dyn Read, overwrite: bool) -> StoreResult<u64> {
        let path = remote_path::normalize(path);
        {
            let inner = self.read();
            inner.check_failure(&path)?;
            match inner.nodes.get(&path) {
                Some(Node::Directory { .. }) => return Err(StoreError::AlreadyExists(path)),
                Some(Node::File { .. }) if !overwrite => {
                    return Err(StoreError::AlreadyExists(path))
                }
                _ => {}
            }
            let parent = remote_path::parent(&path).unwrap_or_else(|| remote_path::ROOT.to_string());
            if !matches!(inner.nodes.get(&parent), Some(Node::Directory { .. })) {
                return Err(StoreError::NotFound(parent));
            }
        }

        let mut data = Vec::new();
        source
            .read_to_end(&mut data)
            .map_err(|e| StoreError::Transport(format!("failed to read upload source: {}", e)))?;
        let written = data.len() as u64;

        self.write().insert(
            &path,
            Node::File {
                data,
                modified: Utc::now(),
            },
        );
        Ok(written)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_keeps_insertion_order() {
        let store = MemoryStore::new();
        store.add_file("/b.txt", "b").add_dir("/a").add_file("/a/c.txt", "cc");

        let names: Vec<String> = store
            .list_children("/")
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["b.txt", "a"]);
    }

    #[test]
    fn create_directory_reports_collision() {
        let store = MemoryStore::new();
        store.create_directory("/docs").unwrap();
        let err = store.create_directory("docs").unwrap_err();
        assert!(err.is_already_exists());
        assert!(matches!(
            store.create_directory("/missing/child"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn write_respects_overwrite_flag() {
        let store = MemoryStore::new();
        store.add_file("/a.txt", "old");

        let err = store
            .write_file("/a.txt", &mut "new".as_bytes(), false)
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.contents("/a.txt").unwrap(), b"old");

        let written = store.write_file("/a.txt", &mut "newer".as_bytes(), true).unwrap();
        assert_eq!(written, 5);
        assert_eq!(store.contents("/a.txt").unwrap(), b"newer");
    }

    #[test]
    fn listing_a_file_is_not_a_directory() {
        let store = MemoryStore::new();
        store.add_file("/a.txt", "x");
        assert!(matches!(
            store.list_children("/a.txt"),
            Err(StoreError::NotADirectory(_))
        ));
    }
}
