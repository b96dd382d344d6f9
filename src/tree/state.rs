use super::TreeWalker;
use crate::event::TransferListener;
use crate::models::TransferEvent;
use crate::store::RemoteStore;

impl<S: RemoteStore> TreeWalker<S> {
    /// Create a walker with no listener registered
    pub fn new(store: S) -> Self {
        Self {
            store,
            listener: None,
        }
    }

    pub fn with_listener(store: S, listener: impl TransferListener + 'static) -> Self {
        let mut walker = Self::new(store);
        walker.set_listener(listener);
        walker
    }

    /// Register the single listener, replacing any previous one
    pub fn set_listener(&mut self, listener: impl TransferListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(super) fn notify(&self, event: TransferEvent) {
        if let Some(listener) = &self.listener {
            listener.on_transfer(&event);
        }
    }
}
