//! `PathListener`: callbacks fired when a request completes.
//!
//! Listeners are notified by [`PathRequestBroker::poll`] after the modifier
//! pipeline has run, in registration order, once per completed request.
//! Cancelled and superseded requests are never reported.
//!
//! [`PathRequestBroker::poll`]: crate::PathRequestBroker::poll

use crate::PathRequest;

/// Observer of completed requests (successful or failed).
pub trait PathListener: Send {
    fn on_path_complete(&mut self, request: &PathRequest);
}

impl<F: FnMut(&PathRequest) + Send> PathListener for F {
    fn on_path_complete(&mut self, request: &PathRequest) {
        self(request)
    }
}

/// Returned by `subscribe`; pass to `unsubscribe`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(pub u32);
