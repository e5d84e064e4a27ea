use super::loaders::DataLoaders;
use crate::loader::CancellationSignal;
use tracing::debug;
use uuid::Uuid;

/// Per-request state: a request id, the request's loaders and its lifetime
///
/// Dropping the context cancels the signal, so pending batch dispatches of
/// an abandoned request stop and their waiters get
/// [`LoadError::Cancelled`](crate::loader::LoadError::Cancelled).
pub struct RequestContext {
    request_id: Uuid,
    cancel: CancellationSignal,
    loaders: DataLoaders,
}

impl RequestContext {
    /// `loaders` must have been built with `cancel`
    pub fn new(loaders: DataLoaders, cancel: CancellationSignal) -> Self {
        let request_id = Uuid::new_v4();
        debug!(request_id = %request_id, "Request context created");

        Self {
            request_id,
            cancel,
            loaders,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn loaders(&self) -> &DataLoaders {
        &self.loaders
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(request_id = %self.request_id, "Request context dropped, cancelling");
            self.cancel.cancel();
        }
    }
}
