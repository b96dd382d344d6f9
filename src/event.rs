use std::sync::mpsc::Sender;

use crate::models::TransferEvent;

/// Receives one notification per completed file transfer. Invoked inline
/// on the walking thread.
pub trait TransferListener {
    fn on_transfer(&self, event: &TransferEvent);
}

impl<F> TransferListener for F
where
    F: Fn(&TransferEvent),
{
    fn on_transfer(&self, event: &TransferEvent) {
        self(event)
    }
}

/// Forward events to a channel, e.g. a UI thread draining progress.
impl TransferListener for Sender<TransferEvent> {
    fn on_transfer(&self, event: &TransferEvent) {
        if self.send(event.clone()).is_err() {
            tracing::debug!("Transfer event receiver dropped");
        }
    }
}
