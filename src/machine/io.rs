//! Channel endpoints connecting the machine to its driver.
//!
//! Each machine talks to exactly one external driver over two directional
//! channels: the machine consumes input values and produces output values,
//! the driver does the opposite. Channel capacity is the driver's choice —
//! [`bounded(0)`](bounded) gives the rendezvous handshake where an output
//! instruction blocks until the driver accepts, `bounded(n)` or
//! [`unbounded`] let the driver pre-seed inputs or collect outputs lazily.
//!
//! The contract is strict: the driver supplies exactly the inputs the
//! program requests, in order, and drains outputs. A driver that stops
//! supplying or draining while keeping its endpoints open deadlocks the run
//! by design; only dropping an endpoint is observable to the machine (a
//! dropped input sender fails the next input instruction, a dropped output
//! receiver ends the run).
//!
//! Pipelines compose by wiring one machine's output channel as another's
//! input channel; values arrive in exact production order.

use crate::machine::memory::Word;

pub use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Consuming end of the input channel, owned by the machine.
#[derive(Debug)]
pub(crate) struct InputPort {
    rx: Receiver<Word>,
}

impl InputPort {
    pub(crate) fn new(rx: Receiver<Word>) -> Self {
        Self { rx }
    }

    /// Blocks until the driver supplies the next value.
    ///
    /// `None` means the channel is closed and drained: the driver hung up
    /// without supplying the requested input.
    pub(crate) fn recv(&self) -> Option<Word> {
        self.rx.recv().ok()
    }
}

/// Producing end of the output channel, owned by the machine.
///
/// Closed exactly once, on the run's terminal path, so a blocked driver
/// always wakes up.
#[derive(Debug)]
pub(crate) struct OutputPort {
    tx: Option<Sender<Word>>,
}

impl OutputPort {
    pub(crate) fn new(tx: Sender<Word>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Blocks until the driver accepts `value`, or returns `false` if the
    /// driver dropped the consuming end.
    pub(crate) fn send(&self, value: Word) -> bool {
        match &self.tx {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Drops the sending end, waking any driver blocked on the channel.
    pub(crate) fn close(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn input_recv_yields_supplied_values_in_order() {
        let (tx, rx) = unbounded();
        let port = InputPort::new(rx);
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        assert_eq!(port.recv(), Some(1));
        assert_eq!(port.recv(), Some(2));
    }

    #[test]
    fn input_recv_on_closed_channel_is_none() {
        let (tx, rx) = unbounded();
        let port = InputPort::new(rx);
        tx.send(7).unwrap();
        drop(tx);
        assert_eq!(port.recv(), Some(7));
        assert_eq!(port.recv(), None);
    }

    #[test]
    fn output_send_fails_once_receiver_is_gone() {
        let (tx, rx) = unbounded();
        let port = OutputPort::new(tx);
        assert!(port.send(5));
        drop(rx);
        assert!(!port.send(6));
    }

    #[test]
    fn closing_the_output_wakes_a_blocked_driver() {
        let (tx, rx) = bounded::<Word>(0);
        let mut port = OutputPort::new(tx);
        let driver = thread::spawn(move || rx.recv().is_err());
        port.close();
        assert!(port.tx.is_none());
        assert!(!port.send(1));
        assert!(driver.join().unwrap());
    }

    #[test]
    fn rendezvous_send_blocks_until_the_driver_accepts() {
        let (tx, rx) = bounded::<Word>(0);
        let port = OutputPort::new(tx);
        let driver = thread::spawn(move || rx.recv().unwrap());
        assert!(port.send(9));
        assert_eq!(driver.join().unwrap(), 9);
    }
}
