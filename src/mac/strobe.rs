//! Reliable strobe transport and ack sampling

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::core::{AckOutcome, Error, FrameType, LinkAddr, RadioTxStatus, Result};
use crate::protocol::{build_frame, WaitState};
use crate::radio::Radio;
use crate::time::{hold, Clock, Timer};
use crate::util::bit_string;

use super::Plb;

/// How a strobe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeResult {
    pub outcome: AckOutcome,
    /// Number of times the frame was transmitted
    pub attempts: u32,
}

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Strobes a control frame of `frame_type` toward `dst` until it is
    /// acknowledged or `strobe_num_max` transmissions have been made.
    pub fn send_strobe(&mut self, dst: LinkAddr, frame_type: FrameType) -> Result<StrobeResult> {
        let max = self.config.strobe_num_max;
        self.strobe(dst, frame_type, max)
    }

    pub(crate) fn strobe(
        &mut self,
        dst: LinkAddr,
        frame_type: FrameType,
        max_attempts: u32,
    ) -> Result<StrobeResult> {
        let frame = self.control_frame(dst, frame_type)?;

        self.radio_on();
        let mut attempts = 0;
        let mut outcome = AckOutcome::NoAck;
        while attempts < max_attempts && !outcome.is_acked() {
            debug!(%frame_type, %dst, attempt = attempts + 1, "strobe");
            if let Err(err) = self.transmit(&frame) {
                self.release_radio();
                return Err(err);
            }
            attempts += 1;
            outcome = self.wait_ack(frame_type);
        }
        self.release_radio();

        if outcome.is_acked() {
            debug!(%frame_type, %dst, attempts, ?outcome, "strobe acked");
        } else {
            debug!(%frame_type, %dst, attempts, "strobe not acked");
        }
        Ok(StrobeResult { outcome, attempts })
    }

    /// Samples the radio once for an ack of `sent`.
    ///
    /// The radio is held on for the duration of the sample; the previous
    /// wait state is restored afterwards.
    pub(crate) fn wait_ack(&mut self, sent: FrameType) -> AckOutcome {
        let previous = self.session.wait;
        self.session.wait = WaitState::Reply;

        let interval = self.duration_ticks(self.config.inter_packet_interval);
        hold(&self.clock, interval);

        let mut outcome = AckOutcome::NoAck;
        if self.radio.receiving_packet() || self.radio.pending_packet() || !self.radio.channel_clear() {
            let settle = self.duration_ticks(self.config.after_ack_detect_wait);
            hold(&self.clock, settle);

            let mut ackbuf = vec![0u8; self.config.ack_read_len];
            let len = self.radio.read(&mut ackbuf);
            if len > 0 {
                let tag = ackbuf[len - 1];
                outcome = AckOutcome::classify(sent, tag);
                trace!(%sent, tag, ?outcome, "activity during ack window");
            } else {
                trace!(%sent, "activity during ack window but nothing read");
            }
        }

        self.session.wait = previous;
        outcome
    }

    /// Answers the sender of the last parsed frame with `ack_type`
    pub(crate) fn send_ack(&mut self, ack_type: FrameType) {
        let dst = self.last_sender;
        let frame = match self.control_frame(dst, ack_type) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%ack_type, %dst, error = %err, "ack not built");
                return;
            }
        };

        self.radio_on();
        debug!(%ack_type, %dst, "send ack");
        if let Err(err) = self.transmit(&frame) {
            warn!(%ack_type, %dst, error = %err, "ack not sent");
            return;
        }
        self.release_radio();
    }

    /// Builds `[header][tag]` toward `dst` in the staging buffer
    pub(crate) fn control_frame(&mut self, dst: LinkAddr, frame_type: FrameType) -> Result<Bytes> {
        self.buf.clear();
        build_frame(
            self.framer.as_ref(),
            &mut self.buf,
            self.config.node_addr,
            dst,
            frame_type,
            self.config.max_frame_len,
        )
    }

    pub(crate) fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        trace!(len = frame.len(), bits = %bit_string(frame), "tx");
        match self.radio.send(frame) {
            RadioTxStatus::Ok => Ok(()),
            status => Err(Error::RadioTx(status)),
        }
    }

    pub(crate) fn radio_on(&mut self) {
        if !self.radio_on {
            self.radio.on();
            self.radio_on = true;
        }
    }

    pub(crate) fn radio_off(&mut self) {
        if self.radio_on {
            self.radio.off();
            self.radio_on = false;
        }
    }

    /// Powers the radio down unless a reply is outstanding
    pub(crate) fn release_radio(&mut self) {
        if !self.session.is_waiting() {
            self.radio_off();
        }
    }
}
