//! Remote store capability interface and its implementations

mod local;
mod memory;
mod ssh;

use std::io::Read;

use crate::error::StoreResult;
use crate::models::RemoteEntry;

pub use local::LocalDirStore;
pub use memory::MemoryStore;
pub use ssh::SshStore;

/// The operations the tree walker needs from a hierarchical file store.
/// Paths are remote paths as produced by [`crate::remote_path::normalize`].
pub trait RemoteStore {
    /// Metadata of a single entry. The root is always a directory.
    fn get_metadata(&self, path: &str) -> StoreResult<RemoteEntry>;

    /// Immediate children of a directory, in the store's listing order.
    fn list_children(&self, path: &str) -> StoreResult<Vec<RemoteEntry>>;

    /// Fails with `AlreadyExists` when the directory is already there.
    fn create_directory(&self, path: &str) -> StoreResult<()>;

    fn read_file(&self, path: &str) -> StoreResult<Box<dyn Read + '_>>;

    /// Write the full contents of `source` to `path`, returning the byte
    /// count. Without `overwrite` an existing destination is `AlreadyExists`.
    fn write_file(&self, path: &str, source: &mut dyn Read, overwrite: bool) -> StoreResult<u64>;

    fn describe(&self) -> String;
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn get_metadata(&self, path: &str) -> StoreResult<RemoteEntry> {
        (**self).get_metadata(path)
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        (**self).list_children(path)
    }

    fn create_directory(&self, path: &str) -> StoreResult<()> {
        (**self).create_directory(path)
    }

    fn read_file(&self, path: &str) -> StoreResult<Box<dyn Read + '_>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, source: &mut dyn Read, overwrite: bool) -> StoreResult<u64> {
        (**self).write_file(path, source, overwrite)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
