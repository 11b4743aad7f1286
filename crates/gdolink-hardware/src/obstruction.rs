//! Obstruction-beam pulse counter.
//!
//! The safety beam reports health by pulsing its output low at a steady
//! rate; a blocked beam goes quiet. The host wires the beam pin to an edge
//! interrupt whose handler does exactly one thing: bump this counter. All
//! classification happens later, on the poll loop, when the engine drains
//! the count for the elapsed cycle.
//!
//! This is the single piece of state shared between the interrupt context
//! and the poll loop, which is why it is an atomic and nothing more — the
//! handler must never call into engine state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Cloneable atomic pulse counter.
///
/// Clones share the same underlying counter; hand one clone to the
/// interrupt registration and keep another for the engine.
#[derive(Debug, Clone, Default)]
pub struct PulseCounter {
    count: Arc<AtomicU32>,
}

impl PulseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one low pulse. Interrupt-context safe: a single atomic add.
    #[inline]
    pub fn record_pulse(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take and reset the count accumulated since the last drain.
    #[inline]
    pub fn drain(&self) -> u32 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Current count without resetting.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_drain() {
        let counter = PulseCounter::new();
        counter.record_pulse();
        counter.record_pulse();
        counter.record_pulse();

        assert_eq!(counter.peek(), 3);
        assert_eq!(counter.drain(), 3);
        assert_eq!(counter.drain(), 0);
    }

    #[test]
    fn test_clones_share_the_counter() {
        let counter = PulseCounter::new();
        let isr_side = counter.clone();

        isr_side.record_pulse();
        isr_side.record_pulse();
        assert_eq!(counter.drain(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counter = PulseCounter::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let side = counter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    side.record_pulse();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.drain(), 4000);
    }
}
