//! Change epochs
//!
//! Consumers remember the last epoch they saw and re-read settings only
//! when the counter has moved.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic change counter shared between threads.
#[derive(Debug, Default)]
pub struct Epoch {
    value: AtomicU64,
}

impl Epoch {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Advance the counter and return the new value.
    pub fn bump(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// True when the counter has moved past `seen`.
    pub fn is_newer_than(&self, seen: u64) -> bool {
        self.current() > seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_returns_new_value() {
        let epoch = Epoch::new();
        assert_eq!(epoch.current(), 0);
        assert_eq!(epoch.bump(), 1);
        assert_eq!(epoch.bump(), 2);
        assert!(epoch.is_newer_than(1));
        assert!(!epoch.is_newer_than(2));
    }

    #[test]
    fn concurrent_bumps_are_not_lost() {
        let epoch = Epoch::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        epoch.bump();
                    }
                });
            }
        });
        assert_eq!(epoch.current(), 8000);
    }
}
