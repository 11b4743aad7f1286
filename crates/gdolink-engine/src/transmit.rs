//! Outbound command queue.
//!
//! The bus is half-duplex: at most one frame may be in flight, and the
//! order commands were issued in is the order they must leave the wire.
//! The queue holds pending commands FIFO; the engine pulls one per poll
//! cycle, encodes it with the current rolling code, and fires the
//! completion callback exactly once after the write.

use gdolink_protocol::Command;
use std::collections::VecDeque;

/// A queued outbound command.
pub struct PendingCommand {
    pub command: Command,
    pub data: u32,
    /// Advance the rolling code past the embedded value. Retries pass
    /// false so they do not consume a counter value of their own.
    pub increment: bool,
    /// Invoked once, after the frame was written to the transport.
    pub on_sent: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("command", &self.command)
            .field("data", &self.data)
            .field("increment", &self.increment)
            .field("on_sent", &self.on_sent.is_some())
            .finish()
    }
}

/// FIFO queue with a single-transmit-in-flight guard.
#[derive(Debug, Default)]
pub struct TransmitQueue {
    queue: VecDeque<PendingCommand>,
    transmit_pending: bool,
}

impl TransmitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a command. Callers waiting on completion pass `on_sent`.
    pub fn push(
        &mut self,
        command: Command,
        data: u32,
        increment: bool,
        on_sent: Option<Box<dyn FnOnce()>>,
    ) {
        self.queue.push_back(PendingCommand {
            command,
            data,
            increment,
            on_sent,
        });
    }

    /// Take the next command for transmission.
    ///
    /// Returns `None` while a previous transmit is still marked pending
    /// or the queue is empty. The caller must invoke
    /// [`complete_transmit`](Self::complete_transmit) when the write
    /// finished (successfully or not).
    pub fn begin_transmit(&mut self) -> Option<PendingCommand> {
        if self.transmit_pending {
            return None;
        }
        let entry = self.queue.pop_front()?;
        self.transmit_pending = true;
        Some(entry)
    }

    /// Clear the in-flight flag after a write completed.
    pub fn complete_transmit(&mut self) {
        self.transmit_pending = false;
    }

    /// Whether a transmit is currently in flight.
    #[must_use]
    pub fn transmit_pending(&self) -> bool {
        self.transmit_pending
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_fifo_order() {
        let mut queue = TransmitQueue::new();
        queue.push(Command::GetStatus, 0, true, None);
        queue.push(Command::GetOpenings, 0, true, None);

        let first = queue.begin_transmit().unwrap();
        assert_eq!(first.command, Command::GetStatus);
        queue.complete_transmit();

        let second = queue.begin_transmit().unwrap();
        assert_eq!(second.command, Command::GetOpenings);
    }

    #[test]
    fn test_single_transmit_in_flight() {
        let mut queue = TransmitQueue::new();
        queue.push(Command::GetStatus, 0, true, None);
        queue.push(Command::GetOpenings, 0, true, None);

        assert!(queue.begin_transmit().is_some());
        assert!(queue.transmit_pending());
        assert!(queue.begin_transmit().is_none()); // still in flight

        queue.complete_transmit();
        assert!(queue.begin_transmit().is_some());
    }

    #[test]
    fn test_on_sent_callback_travels_with_entry() {
        let mut queue = TransmitQueue::new();
        let fired = Rc::new(RefCell::new(false));
        let fired2 = Rc::clone(&fired);
        queue.push(
            Command::DoorAction,
            1,
            true,
            Some(Box::new(move || *fired2.borrow_mut() = true)),
        );

        let entry = queue.begin_transmit().unwrap();
        assert!(!*fired.borrow());
        if let Some(on_sent) = entry.on_sent {
            on_sent();
        }
        assert!(*fired.borrow());
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = TransmitQueue::new();
        assert!(queue.is_empty());
        assert!(queue.begin_transmit().is_none());
        assert!(!queue.transmit_pending());
    }
}
