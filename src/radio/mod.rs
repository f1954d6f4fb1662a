//! Transceiver boundary
//!
//! The driver talks to the physical radio only through [`Radio`]. Power
//! control is latched by the driver, so implementations may assume `on` and
//! `off` alternate.

use crate::core::RadioTxStatus;

/// Half-duplex packet radio
pub trait Radio {
    /// Powers the transceiver up for listening
    fn on(&mut self);

    /// Powers the transceiver down
    fn off(&mut self);

    /// Transmits one complete frame
    fn send(&mut self, frame: &[u8]) -> RadioTxStatus;

    /// Copies the most recent received frame into `buf`, returning the
    /// number of bytes written (0 when nothing was received)
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// A frame is currently being received
    fn receiving_packet(&mut self) -> bool;

    /// A received frame is waiting to be read
    fn pending_packet(&mut self) -> bool;

    /// No carrier detected on the channel
    fn channel_clear(&mut self) -> bool;
}

impl<R: Radio + ?Sized> Radio for Box<R> {
    fn on(&mut self) {
        (**self).on()
    }

    fn off(&mut self) {
        (**self).off()
    }

    fn send(&mut self, frame: &[u8]) -> RadioTxStatus {
        (**self).send(frame)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn receiving_packet(&mut self) -> bool {
        (**self).receiving_packet()
    }

    fn pending_packet(&mut self) -> bool {
        (**self).pending_packet()
    }

    fn channel_clear(&mut self) -> bool {
        (**self).channel_clear()
    }
}
