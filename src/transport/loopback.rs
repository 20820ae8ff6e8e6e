//! In-memory loopback bus
//!
//! Every accepted frame is reflected back to the receive queue, the way a
//! CAN controller in loopback mode behaves. A `LoopbackHandle` lets a test
//! or simulator inject frames from "other" participants and inspect what
//! was sent.

use super::Transport;
use crate::constants::LOOPBACK_CAPACITY;
use crate::protocol::CanFrame;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct Bus {
    rx: VecDeque<CanFrame>,
    sent: VecDeque<CanFrame>,
    capacity: usize,
    reflect: bool,
}

/// Loopback transport backed by a bounded in-memory queue
pub struct LoopbackTransport {
    bus: Arc<Mutex<Bus>>,
}

/// Second end of a loopback bus
#[derive(Clone)]
pub struct LoopbackHandle {
    bus: Arc<Mutex<Bus>>,
}

impl LoopbackTransport {
    /// Create a bus that reflects sent frames, holding at most `capacity`
    pub fn new(capacity: usize) -> Self {
        Self::with_reflect(capacity, true)
    }

    /// Create a bus that does not reflect sent frames
    ///
    /// Useful when a handle plays the part of the other participants.
    pub fn silent(capacity: usize) -> Self {
        Self::with_reflect(capacity, false)
    }

    fn with_reflect(capacity: usize, reflect: bool) -> Self {
        Self {
            bus: Arc::new(Mutex::new(Bus {
                rx: VecDeque::with_capacity(capacity),
                sent: VecDeque::with_capacity(capacity),
                capacity,
                reflect,
            })),
        }
    }

    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            bus: self.bus.clone(),
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(LOOPBACK_CAPACITY)
    }
}

impl Transport for LoopbackTransport {
    fn try_send(&mut self, frame: &CanFrame) -> bool {
        let mut bus = self.bus.lock();
        if bus.reflect && bus.rx.len() >= bus.capacity {
            return false;
        }
        if bus.sent.len() >= bus.capacity {
            bus.sent.pop_front();
        }
        bus.sent.push_back(*frame);
        if bus.reflect {
            bus.rx.push_back(*frame);
        }
        true
    }

    fn try_receive(&mut self) -> Option<CanFrame> {
        self.bus.lock().rx.pop_front()
    }
}

impl LoopbackHandle {
    /// Put a frame on the receive queue, false if the queue is full
    pub fn inject(&self, frame: CanFrame) -> bool {
        let mut bus = self.bus.lock();
        if bus.rx.len() >= bus.capacity {
            return false;
        }
        bus.rx.push_back(frame);
        true
    }

    /// Drain the frames sent so far (oldest first)
    pub fn take_sent(&self) -> Vec<CanFrame> {
        self.bus.lock().sent.drain(..).collect()
    }

    /// Frames waiting to be received
    pub fn pending(&self) -> usize {
        self.bus.lock().rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflects_sent_frames() {
        let mut transport = LoopbackTransport::new(4);
        let handle = transport.handle();

        assert!(transport.try_send(&CanFrame::new(0x10, &[1])));

        assert_eq!(handle.pending(), 1);
        assert_eq!(transport.try_receive().unwrap().id, 0x10);
        assert_eq!(transport.try_receive(), None);
        assert_eq!(handle.take_sent().len(), 1);
    }

    #[test]
    fn test_rejects_when_full() {
        let mut transport = LoopbackTransport::new(2);

        assert!(transport.try_send(&CanFrame::new(1, &[])));
        assert!(transport.try_send(&CanFrame::new(2, &[])));
        assert!(!transport.try_send(&CanFrame::new(3, &[])));
    }

    #[test]
    fn test_silent_bus_only_records() {
        let mut transport = LoopbackTransport::silent(2);
        let handle = transport.handle();

        for id in 0..5 {
            assert!(transport.try_send(&CanFrame::new(id, &[])));
        }

        assert_eq!(transport.try_receive(), None);
        let sent = handle.take_sent();
        assert_eq!(sent.iter().map(|f| f.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_inject_from_handle() {
        let mut transport = LoopbackTransport::silent(1);
        let handle = transport.handle();

        assert!(handle.inject(CanFrame::new(7, &[])));
        assert!(!handle.inject(CanFrame::new(8, &[])));
        assert_eq!(transport.try_receive().unwrap().id, 7);
    }
}
