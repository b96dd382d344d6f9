//! Mirror directory trees between local disk and a remote file store.
//!
//! The [`tree::TreeWalker`] drives any [`store::RemoteStore`]: an in-memory
//! tree, a directory on disk, or a host reached over ssh.

pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod remote_path;
pub mod store;
pub mod tree;

pub use error::{StoreError, StoreResult};
pub use event::TransferListener;
pub use models::{Direction, LocalEntry, RemoteEntry, TransferEvent, TransferFailure, TransferReport};
pub use tree::TreeWalker;
