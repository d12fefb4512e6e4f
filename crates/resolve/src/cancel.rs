use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancel is a cooperative cancellation token, checked at each tree-node
/// expansion step. Cancellation aborts the call cleanly with no partial
/// results published; it is an abort signal, not a diagnostic.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Cancel {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("schema resolution was cancelled")]
    Cancelled,
}
