use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation handle shared between a running search and its
/// caller.
///
/// The search polls it before every per-k trial and once per local-search
/// iteration. Clones share the same flag; the optional deadline is per clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of this token that additionally expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation of every search observing this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
