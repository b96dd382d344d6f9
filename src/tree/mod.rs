//! Recursive walks over a remote store: mirror, list and measure trees

mod local;
mod remote;
mod state;
mod transfer;

use crate::event::TransferListener;
use crate::store::RemoteStore;

pub use local::local_size;

/// Walks a remote store depth-first, one entry at a time.
pub struct TreeWalker<S: RemoteStore> {
    store: S,
    listener: Option<Box<dyn TransferListener>>,
}
