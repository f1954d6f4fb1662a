//! Test doubles for driving a [`Plb`](crate::mac::Plb) without hardware
//!
//! [`ScriptedRadio`] records every transmitted frame and answers them through
//! a responder closure standing in for the neighbor. [`FakeClock`] advances on
//! every read so spin-waits terminate instantly, and [`ManualTimer`] records
//! arming requests for the test to fire by hand.
//!
//! Frame helpers assume the [`NullFramer`] layout.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{FrameType, LinkAddr, RadioTxStatus};
use crate::mac::UpperLayer;
use crate::protocol::NullFramer;
use crate::radio::Radio;
use crate::time::{Clock, Ticks, Timer};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

/// Builds a frame from `sender` to `receiver`
pub fn frame_from(sender: LinkAddr, receiver: LinkAddr, frame_type: FrameType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(NullFramer::HEADER_LEN + 1 + payload.len());
    frame.extend_from_slice(&receiver.0);
    frame.extend_from_slice(&sender.0);
    frame.push(frame_type.tag());
    frame.extend_from_slice(payload);
    frame
}

/// Builds the reply to `request` carrying `reply_type`, addressed back to
/// the request's sender
pub fn ack_frame(request: &[u8], reply_type: FrameType) -> Vec<u8> {
    if request.len() < NullFramer::HEADER_LEN {
        return vec![reply_type.tag()];
    }
    let receiver = LinkAddr([request[2], request[3]]);
    let sender = LinkAddr([request[0], request[1]]);
    frame_from(sender, receiver, reply_type, &[])
}

/// Radio whose neighbor is a closure
pub struct ScriptedRadio {
    responder: Option<Responder>,
    rx_queue: VecDeque<Vec<u8>>,
    sent: Vec<Bytes>,
    tx_attempts: u32,
    fail_tx: Option<RadioTxStatus>,
    busy: bool,
    loss: Option<(f64, StdRng)>,
    on: bool,
    on_count: u32,
    off_count: u32,
}

impl fmt::Debug for ScriptedRadio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedRadio")
            .field("sent", &self.sent.len())
            .field("queued", &self.rx_queue.len())
            .field("on", &self.on)
            .finish()
    }
}

impl Default for ScriptedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRadio {
    /// A radio nobody answers
    pub fn new() -> Self {
        ScriptedRadio {
            responder: None,
            rx_queue: VecDeque::new(),
            sent: Vec::new(),
            tx_attempts: 0,
            fail_tx: None,
            busy: false,
            loss: None,
            on: false,
            on_count: 0,
            off_count: 0,
        }
    }

    /// Replies produced by `responder` become readable right after the
    /// frame that triggered them
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Every transmission is rejected with `status`
    pub fn failing_tx(mut self, status: RadioTxStatus) -> Self {
        self.fail_tx = Some(status);
        self
    }

    /// Reports carrier on the channel
    pub fn with_busy_channel(mut self, busy: bool) -> Self {
        self.busy = busy;
        self
    }

    /// Drops each reply with probability `rate`, reproducibly from `seed`
    pub fn with_loss(mut self, rate: f64, seed: u64) -> Self {
        self.loss = Some((rate.clamp(0.0, 1.0), StdRng::seed_from_u64(seed)));
        self
    }

    /// Queues a frame as if it had just been received
    pub fn inject(&mut self, frame: Vec<u8>) {
        self.rx_queue.push_back(frame);
    }

    /// Frames successfully handed to the radio, in order
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    /// Number of sent frames carrying `frame_type`
    pub fn sent_of_type(&self, frame_type: FrameType) -> usize {
        self.sent
            .iter()
            .filter(|f| f.get(NullFramer::HEADER_LEN) == Some(&frame_type.tag()))
            .count()
    }

    /// Calls to `send`, including rejected ones
    pub fn tx_attempts(&self) -> u32 {
        self.tx_attempts
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// `(on, off)` call counts
    pub fn power_toggles(&self) -> (u32, u32) {
        (self.on_count, self.off_count)
    }

    fn lost(&mut self) -> bool {
        match &mut self.loss {
            Some((rate, rng)) => rng.gen_bool(*rate),
            None => false,
        }
    }
}

impl Radio for ScriptedRadio {
    fn on(&mut self) {
        self.on = true;
        self.on_count += 1;
    }

    fn off(&mut self) {
        self.on = false;
        self.off_count += 1;
    }

    fn send(&mut self, frame: &[u8]) -> RadioTxStatus {
        self.tx_attempts += 1;
        if let Some(status) = self.fail_tx {
            return status;
        }
        self.sent.push(Bytes::copy_from_slice(frame));

        let reply = self.responder.as_mut().and_then(|respond| respond(frame));
        if let Some(reply) = reply {
            if !self.lost() {
                self.rx_queue.push_back(reply);
            }
        }
        RadioTxStatus::Ok
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.rx_queue.pop_front() {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                len
            }
            None => 0,
        }
    }

    fn receiving_packet(&mut self) -> bool {
        false
    }

    fn pending_packet(&mut self) -> bool {
        !self.rx_queue.is_empty()
    }

    fn channel_clear(&mut self) -> bool {
        !self.busy
    }
}

/// Microsecond clock that moves forward by `step` on every read
#[derive(Debug)]
pub struct FakeClock {
    now: Cell<Ticks>,
    step: Ticks,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::with_step(50)
    }

    pub fn with_step(step: Ticks) -> Self {
        FakeClock {
            now: Cell::new(0),
            step: step.max(1),
        }
    }

    pub fn advance(&self, ticks: Ticks) {
        self.now.set(self.now.get().wrapping_add(ticks));
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Ticks {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }

    fn ticks_per_second(&self) -> u32 {
        1_000_000
    }
}

/// Timer that only records what it was asked to do
#[derive(Debug, Default)]
pub struct ManualTimer {
    scheduled: Vec<Ticks>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every arming so far, oldest first
    pub fn scheduled(&self) -> Vec<Ticks> {
        self.scheduled.clone()
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, after: Ticks) {
        self.scheduled.push(after);
    }
}

/// One payload handed to the upper layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub frame_type: FrameType,
    pub sender: LinkAddr,
    pub payload: Vec<u8>,
}

/// Upper layer that keeps every delivery; clones share the log
#[derive(Debug, Default, Clone)]
pub struct RecordingUpper {
    deliveries: Rc<RefCell<Vec<Delivery>>>,
}

impl RecordingUpper {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.borrow().clone()
    }
}

impl UpperLayer for RecordingUpper {
    fn input(&mut self, frame_type: FrameType, sender: LinkAddr, payload: &[u8]) {
        self.deliveries.borrow_mut().push(Delivery {
            frame_type,
            sender,
            payload: payload.to_vec(),
        });
    }
}
