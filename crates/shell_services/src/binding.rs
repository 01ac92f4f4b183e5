//! Observer bindings to engine-owned objects

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Weak link from a settings service to a live engine object.
///
/// The engine owns the object; once it is dropped the binding behaves as if
/// it had been unbound.
pub struct Binding<T: ?Sized> {
    target: Mutex<Option<Weak<Mutex<T>>>>,
}

impl<T: ?Sized> Binding<T> {
    pub fn new() -> Self {
        Self {
            target: Mutex::new(None),
        }
    }

    pub fn bind(&self, target: &Arc<Mutex<T>>) {
        *self.slot() = Some(Arc::downgrade(target));
    }

    pub fn unbind(&self) {
        *self.slot() = None;
    }

    pub fn is_bound(&self) -> bool {
        self.upgrade().is_some()
    }

    /// Run `f` against the bound object. Returns `None` when unbound.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        // Release the slot before locking the target
        let target = self.upgrade()?;
        let mut guard = target.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut *guard))
    }

    fn upgrade(&self) -> Option<Arc<Mutex<T>>> {
        let mut slot = self.slot();
        let target = slot.as_ref()?.upgrade();
        if target.is_none() {
            *slot = None;
        }
        target
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Weak<Mutex<T>>>> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> Default for Binding<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Counter: Send {
        fn add(&mut self, n: u32);
    }

    struct Total(u32);

    impl Counter for Total {
        fn add(&mut self, n: u32) {
            self.0 += n;
        }
    }

    #[test]
    fn forwards_to_bound_target() {
        let binding: Binding<dyn Counter> = Binding::new();
        assert_eq!(binding.with(|c| c.add(1)), None);

        let target = Arc::new(Mutex::new(Total(0)));
        let as_dyn: Arc<Mutex<dyn Counter>> = target.clone();
        binding.bind(&as_dyn);
        assert!(binding.is_bound());

        binding.with(|c| c.add(5)).unwrap();
        assert_eq!(target.lock().unwrap().0, 5);

        binding.unbind();
        assert!(!binding.is_bound());
    }

    #[test]
    fn dropped_target_unbinds() {
        let binding: Binding<dyn Counter> = Binding::new();
        {
            let target: Arc<Mutex<dyn Counter>> = Arc::new(Mutex::new(Total(0)));
            binding.bind(&target);
            assert!(binding.is_bound());
        }
        assert!(!binding.is_bound());
        assert_eq!(binding.with(|c| c.add(1)), None);
    }

    #[test]
    fn poisoned_target_is_still_reachable() {
        let binding: Binding<dyn Counter> = Binding::new();
        let target = Arc::new(Mutex::new(Total(0)));
        let as_dyn: Arc<Mutex<dyn Counter>> = target.clone();
        binding.bind(&as_dyn);

        std::thread::scope(|s| {
            let engine = s.spawn(|| {
                let _guard = target.lock().unwrap();
                panic!("engine panicked while holding the target");
            });
            assert!(engine.join().is_err());
        });
        assert!(target.is_poisoned());

        assert_eq!(binding.with(|c| c.add(3)), Some(()));
        let total = target.lock().unwrap_or_else(PoisonError::into_inner).0;
        assert_eq!(total, 3);
    }
}
