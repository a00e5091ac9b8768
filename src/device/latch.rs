use std::sync::atomic::{AtomicBool, Ordering};

/// Consume-once flag: "an expected message was observed since the last check"
///
/// `consume` reads and clears in one atomic step, so a mark is reported to
/// exactly one caller.
#[derive(Debug, Default)]
pub struct Latch {
    observed: AtomicBool,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.observed.store(true, Ordering::SeqCst);
    }

    pub fn consume(&self) -> bool {
        self.observed.swap(false, Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.observed.store(false, Ordering::SeqCst);
    }
}
