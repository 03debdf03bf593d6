use std::sync::{Arc, Mutex};

/// Shared state container for one console.
///
/// Every mutation flows through [`Store::apply`], which runs the console's
/// reducer under the lock. Readers take snapshots via [`Store::state`]; the
/// state types are cheap enough to clone per frame.
pub struct Store<S, E> {
    inner: Arc<Mutex<S>>,
    reduce: fn(S, E) -> S,
}

impl<S: Clone, E> Store<S, E> {
    pub fn new(initial: S, reduce: fn(S, E) -> S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
            reduce,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> S {
        self.inner.lock().unwrap().clone()
    }

    pub fn apply(&self, ev: E) {
        let mut guard = self.inner.lock().unwrap();
        let next = (self.reduce)(guard.clone(), ev);
        *guard = next;
    }
}

// Derived Clone would demand S: Clone + E: Clone on the impl.
impl<S, E> Clone for Store<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            reduce: self.reduce,
        }
    }
}
