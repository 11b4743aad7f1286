//! Equality-gated observable value container.
//!
//! Every piece of domain state the protocol engine owns is wrapped in an
//! [`Observable`]: a plain value plus a list of subscriber callbacks that
//! fire when, and only when, the stored value actually changes. Receiving
//! the same status twice must not re-notify consumers.
//!
//! Dispatch is synchronous, in subscription order, on the caller's
//! execution context. There is no cross-thread machinery here: the engine
//! runs on a single cooperative poll loop and so do its subscribers.
//!
//! # Examples
//!
//! ```
//! use gdolink_core::Observable;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut level = Observable::new(0u16);
//! let seen = Rc::new(Cell::new(0u32));
//! let seen2 = Rc::clone(&seen);
//! level.subscribe(move |_v: &u16| seen2.set(seen2.get() + 1));
//!
//! assert!(level.set(42));
//! assert!(!level.set(42)); // unchanged, no callback
//! assert_eq!(seen.get(), 1);
//! ```

/// A value container that notifies subscribers on change.
pub struct Observable<T> {
    value: T,
    subscribers: Vec<Box<dyn FnMut(&T)>>,
}

impl<T: PartialEq> Observable<T> {
    /// Create an observable holding `initial`, with no subscribers.
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            subscribers: Vec::new(),
        }
    }

    /// Borrow the current value.
    pub fn peek(&self) -> &T {
        &self.value
    }

    /// Register a subscriber invoked with every new value.
    ///
    /// Subscribers are called in registration order.
    pub fn subscribe(&mut self, f: impl FnMut(&T) + 'static) {
        self.subscribers.push(Box::new(f));
    }

    /// Store `value`, notifying subscribers only if it differs from the
    /// current value. Returns whether a change occurred.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for subscriber in &mut self.subscribers {
            subscriber(&self.value);
        }
        true
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: PartialEq + Copy> Observable<T> {
    /// Get a copy of the current value.
    pub fn get(&self) -> T {
        self.value
    }
}

impl<T: PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_set_notifies_on_change() {
        let mut obs = Observable::new(0u32);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        obs.subscribe(move |v| log2.borrow_mut().push(*v));

        assert!(obs.set(1));
        assert!(obs.set(2));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_set_same_value_notifies_once() {
        let mut obs = Observable::new(0u32);
        let count = Rc::new(RefCell::new(0));
        let count2 = Rc::clone(&count);
        obs.subscribe(move |_| *count2.borrow_mut() += 1);

        assert!(obs.set(7));
        assert!(!obs.set(7));
        assert!(!obs.set(7));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let mut obs = Observable::new(0u8);
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order2 = Rc::clone(&order);
            obs.subscribe(move |_| order2.borrow_mut().push(tag));
        }

        obs.set(1);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_get_and_peek() {
        let mut obs = Observable::new(3.5f32);
        assert_eq!(obs.get(), 3.5);
        obs.set(4.0);
        assert_eq!(*obs.peek(), 4.0);
    }

    #[test]
    fn test_initial_value_does_not_notify() {
        let mut obs = Observable::new(false);
        let fired = Rc::new(RefCell::new(false));
        let fired2 = Rc::clone(&fired);
        obs.subscribe(move |_| *fired2.borrow_mut() = true);

        assert!(!obs.set(false));
        assert!(!*fired.borrow());
    }
}
