//! One-shot completion callback lists.
//!
//! Several engine operations want to run something on the *next* occurrence
//! of an event and never again: "when the next door-state report arrives,
//! stop the retry timer", "once this frame left the wire, send the release".
//! [`OnceCallbacks`] holds those pending closures and guarantees each is
//! invoked at most once before being dropped.

/// A list of pending closures, each invoked exactly once by [`trigger`].
///
/// [`trigger`]: OnceCallbacks::trigger
pub struct OnceCallbacks<T> {
    pending: Vec<Box<dyn FnOnce(&T)>>,
}

impl<T> OnceCallbacks<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queue a closure for the next trigger.
    pub fn push(&mut self, f: impl FnOnce(&T) + 'static) {
        self.pending.push(Box::new(f));
    }

    /// Invoke and drop every pending closure, in queue order.
    pub fn trigger(&mut self, value: &T) {
        for f in self.pending.drain(..) {
            f(value);
        }
    }

    /// Drop all pending closures without invoking them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl<T> Default for OnceCallbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for OnceCallbacks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceCallbacks")
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_trigger_invokes_each_exactly_once() {
        let mut callbacks = OnceCallbacks::new();
        let count = Rc::new(RefCell::new(0));

        for _ in 0..3 {
            let count2 = Rc::clone(&count);
            callbacks.push(move |_: &u32| *count2.borrow_mut() += 1);
        }

        callbacks.trigger(&1);
        callbacks.trigger(&2); // nothing left to run
        assert_eq!(*count.borrow(), 3);
        assert!(callbacks.is_empty());
    }

    #[test]
    fn test_trigger_preserves_queue_order() {
        let mut callbacks = OnceCallbacks::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in [1, 2, 3] {
            let order2 = Rc::clone(&order);
            callbacks.push(move |_: &()| order2.borrow_mut().push(tag));
        }

        callbacks.trigger(&());
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_clear_drops_without_invoking() {
        let mut callbacks = OnceCallbacks::new();
        let fired = Rc::new(RefCell::new(false));
        let fired2 = Rc::clone(&fired);
        callbacks.push(move |_: &()| *fired2.borrow_mut() = true);

        assert_eq!(callbacks.len(), 1);
        callbacks.clear();
        callbacks.trigger(&());
        assert!(!*fired.borrow());
    }

    #[test]
    fn test_callback_receives_trigger_value() {
        let mut callbacks = OnceCallbacks::new();
        let seen = Rc::new(RefCell::new(0u32));
        let seen2 = Rc::clone(&seen);
        callbacks.push(move |v: &u32| *seen2.borrow_mut() = *v);

        callbacks.trigger(&99);
        assert_eq!(*seen.borrow(), 99);
    }
}
