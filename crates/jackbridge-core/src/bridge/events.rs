//! Realtime → main thread event queue
//!
//! The realtime callback must not log, so anything the main thread should
//! hear about is pushed as a small `Copy` event onto an `rtrb` queue. Pushing
//! never blocks; when the queue is full the event is dropped (the counters in
//! [`super::stats::BridgeStats`] still record it).

use rtrb::{Consumer, Producer, RingBuffer};

/// Capacity for the event queue
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Facts reported by the realtime side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A cycle arrived with the wrong frame count (fatal)
    ProtocolViolation { expected: usize, got: usize },
    /// The adapter observed shutdown and emitted its first silent cycle
    Stopped,
}

impl BridgeEvent {
    /// Whether the event means the bridge cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeEvent::ProtocolViolation { .. })
    }
}

/// Creates a new event queue pair
///
/// Returns (sender for the realtime adapter, receiver for the main thread).
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (producer, consumer) = RingBuffer::new(EVENT_QUEUE_CAPACITY);
    (EventSender { producer }, EventReceiver { consumer })
}

/// Realtime side of the event queue
pub struct EventSender {
    producer: Producer<BridgeEvent>,
}

impl EventSender {
    /// Push an event (non-blocking, dropped if the queue is full)
    #[inline]
    pub fn send(&mut self, event: BridgeEvent) {
        let _ = self.producer.push(event);
    }
}

/// Main-thread side of the event queue
pub struct EventReceiver {
    consumer: Consumer<BridgeEvent>,
}

impl EventReceiver {
    /// Drain all pending events
    pub fn drain(&mut self) -> Vec<BridgeEvent> {
        let mut events = Vec::with_capacity(self.consumer.slots());
        while let Ok(event) = self.consumer.pop() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (mut tx, mut rx) = event_queue();
        tx.send(BridgeEvent::ProtocolViolation {
            expected: 512,
            got: 256,
        });
        tx.send(BridgeEvent::Stopped);

        let events = rx.drain();
        assert_eq!(
            events,
            vec![
                BridgeEvent::ProtocolViolation {
                    expected: 512,
                    got: 256
                },
                BridgeEvent::Stopped
            ]
        );
        assert!(events[0].is_fatal());
        assert!(!events[1].is_fatal());
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_full_queue_drops_silently() {
        let (mut tx, mut rx) = event_queue();
        for _ in 0..EVENT_QUEUE_CAPACITY + 10 {
            tx.send(BridgeEvent::Stopped);
        }
        assert_eq!(rx.drain().len(), EVENT_QUEUE_CAPACITY);
    }
}
