//! Neighbor clock synchronization handshake
//!
//! SYNC_START is strobed toward the previous hop. When it goes unanswered
//! for `sync_start_threshold` strobes the initiator sends SYNC_REQ itself.
//! The previous hop answers SYNC_REQ with SYNC_ACK toward its next hop, and
//! the initiator closes with SYNC_END. REQ/ACK/END each carry one payload
//! byte produced and consumed by a [`SyncPayload`].

use tracing::{debug, info, warn};

use crate::core::{Error, FrameType, LinkAddr, Result, TxStatus};
use crate::mac::Plb;
use crate::protocol::{build_frame, WaitState};
use crate::radio::Radio;
use crate::time::{Clock, Ticks, Timer};

/// Application hook for the sync payload byte
pub trait SyncPayload {
    /// Byte to carry in an outgoing SYNC_REQ, SYNC_ACK or SYNC_END
    fn outgoing(&mut self, frame_type: FrameType, now: Ticks) -> u8;

    /// Called with the payload of a received sync frame
    fn incoming(&mut self, frame_type: FrameType, sender: LinkAddr, payload: &[u8], now: Ticks);
}

/// Carries a zero byte and ignores what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroSyncPayload;

impl SyncPayload for ZeroSyncPayload {
    fn outgoing(&mut self, _frame_type: FrameType, _now: Ticks) -> u8 {
        0
    }

    fn incoming(&mut self, _frame_type: FrameType, _sender: LinkAddr, _payload: &[u8], _now: Ticks) {}
}

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Starts the handshake with the previous hop, returning the status and
    /// transmission count reported to the upper layer
    pub(crate) fn send_sync_start(&mut self) -> (TxStatus, u32) {
        let Some(dst) = self.prev_hop() else {
            warn!("first node in chain, nothing to sync with");
            return (TxStatus::Err, 1);
        };

        self.session.begin_wait(WaitState::Sync);
        let threshold = self.config.sync_start_threshold;
        let strobe = match self.strobe(dst, FrameType::SyncStart, threshold) {
            Ok(strobe) => strobe,
            Err(err) => {
                warn!(%dst, error = %err, "SYNC_START failed");
                self.session.wait = WaitState::Idle;
                return (TxStatus::from(&err), 1);
            }
        };

        if strobe.outcome.is_acked() {
            self.session.sync_req = true;
            debug!(%dst, attempts = strobe.attempts, "SYNC_START acked");
            return (TxStatus::Ok, strobe.attempts);
        }

        debug!(%dst, attempts = strobe.attempts, "SYNC_START unanswered, sending SYNC_REQ");
        match self.send_sync(FrameType::SyncReq) {
            Ok(()) => (TxStatus::Ok, strobe.attempts + 1),
            Err(err) => {
                warn!(%dst, error = %err, "SYNC_REQ failed");
                (TxStatus::from(&err), strobe.attempts + 1)
            }
        }
    }

    /// Sends one SYNC_REQ, SYNC_ACK or SYNC_END frame.
    ///
    /// REQ and END go to the previous hop, ACK to the next hop. The session
    /// waits for a sync reply until END has been sent or received.
    pub(crate) fn send_sync(&mut self, frame_type: FrameType) -> Result<()> {
        let dst = match frame_type {
            FrameType::SyncReq | FrameType::SyncEnd => self
                .prev_hop()
                .ok_or_else(|| Error::invalid_state(format!("{} needs a previous hop", frame_type)))?,
            FrameType::SyncAck => self.next_hop(),
            other => {
                return Err(Error::invalid_state(format!("{} is not a sync reply", other)));
            }
        };

        self.session.begin_wait(WaitState::Sync);
        let byte = self.sync_payload.outgoing(frame_type, self.clock.now());

        self.buf.clear();
        self.buf.set_data(&[byte]);
        let sent = build_frame(
            self.framer.as_ref(),
            &mut self.buf,
            self.config.node_addr,
            dst,
            frame_type,
            self.config.max_frame_len,
        )
        .and_then(|frame| {
            self.radio_on();
            debug!(%frame_type, %dst, "send sync");
            self.transmit(&frame)
        });
        if let Err(err) = sent {
            self.session.wait = WaitState::Idle;
            return Err(err);
        }

        match frame_type {
            FrameType::SyncReq => self.session.sync_req = true,
            FrameType::SyncAck => self.session.sync_ack = true,
            _ => {
                self.session.sync_end = true;
                self.session.wait = WaitState::Idle;
                info!(%dst, "sync handshake complete");
            }
        }
        Ok(())
    }

    /// Answers a received sync frame, logging failures
    pub(crate) fn reply_sync(&mut self, frame_type: FrameType) {
        if let Err(err) = self.send_sync(frame_type) {
            warn!(%frame_type, error = %err, "sync reply failed");
        }
    }

    pub(crate) fn sync_received(&mut self, frame_type: FrameType, sender: LinkAddr, payload: &[u8]) {
        let now = self.clock.now();
        self.sync_payload.incoming(frame_type, sender, payload, now);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::{RadioTxStatus, RdcConfig};
    use crate::mac::OutgoingPacket;
    use crate::sim::{ack_frame, FakeClock, ManualTimer, ScriptedRadio};

    type Seen = Rc<RefCell<Vec<(FrameType, Vec<u8>)>>>;

    /// Stamps outgoing frames with a counter and records what arrives
    struct CountingPayload {
        next: u8,
        seen: Seen,
    }

    impl SyncPayload for CountingPayload {
        fn outgoing(&mut self, _frame_type: FrameType, _now: Ticks) -> u8 {
            self.next += 1;
            self.next
        }

        fn incoming(&mut self, frame_type: FrameType, _sender: LinkAddr, payload: &[u8], _now: Ticks) {
            self.seen.borrow_mut().push((frame_type, payload.to_vec()));
        }
    }

    fn driver(node: u8, radio: ScriptedRadio) -> Plb<ScriptedRadio, FakeClock, ManualTimer> {
        Plb::new(RdcConfig::for_node(LinkAddr::new(node)), radio, FakeClock::new(), ManualTimer::new())
            .unwrap()
    }

    fn send_sync_request(plb: &mut Plb<ScriptedRadio, FakeClock, ManualTimer>) -> Vec<(TxStatus, u32)> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        plb.send(
            OutgoingPacket::sync(),
            Box::new(move |status, n| sink.borrow_mut().push((status, n))),
        );
        let out = log.borrow().clone();
        out
    }

    #[test]
    fn test_unanswered_start_falls_back_to_sync_req() {
        let mut plb = driver(3, ScriptedRadio::new());
        let reports = send_sync_request(&mut plb);

        assert_eq!(reports, vec![(TxStatus::Ok, 6)]);
        assert_eq!(plb.radio().sent_of_type(FrameType::SyncStart), 5);
        assert_eq!(plb.radio().sent_of_type(FrameType::SyncReq), 1);
        let req = plb.radio().sent().last().cloned().unwrap();
        // [dst][src][tag][payload]
        assert_eq!(&req[..], &[2, 0, 3, 0, 0x21, 0]);
        assert!(plb.session().sync_req);
        assert_eq!(plb.session().wait, WaitState::Sync);
        assert!(plb.radio().is_on());
    }

    #[test]
    fn test_acked_start_skips_sync_req() {
        let radio = ScriptedRadio::new()
            .with_responder(|frame: &[u8]| Some(ack_frame(frame, FrameType::SyncReq)));
        let mut plb = driver(3, radio);
        let reports = send_sync_request(&mut plb);
        assert_eq!(reports, vec![(TxStatus::Ok, 1)]);
        assert_eq!(plb.radio().sent_of_type(FrameType::SyncReq), 0);
        assert!(plb.session().sync_req);
    }

    #[test]
    fn test_first_node_cannot_start_sync() {
        let mut plb = driver(1, ScriptedRadio::new());
        assert_eq!(send_sync_request(&mut plb), vec![(TxStatus::Err, 1)]);
        assert!(plb.radio().sent().is_empty());
    }

    #[test]
    fn test_radio_failure_is_fatal_for_sync() {
        let mut plb = driver(3, ScriptedRadio::new().failing_tx(RadioTxStatus::Err));
        assert_eq!(send_sync_request(&mut plb), vec![(TxStatus::ErrFatal, 1)]);
        assert_eq!(plb.session().wait, WaitState::Idle);
    }

    #[test]
    fn test_payload_hook_fills_and_reads_sync_bytes() {
        let seen: Seen = Rc::default();
        let payload = CountingPayload {
            next: 40,
            seen: Rc::clone(&seen),
        };
        let mut plb = driver(3, ScriptedRadio::new()).with_sync_payload(Box::new(payload));

        plb.input(&crate::sim::frame_from(
            LinkAddr::new(4),
            LinkAddr::new(3),
            FrameType::SyncReq,
            &[9],
        ));

        let ack = plb.radio().sent().last().cloned().unwrap();
        assert_eq!(&ack[..], &[4, 0, 3, 0, 0x42, 41]);
        assert_eq!(*seen.borrow(), vec![(FrameType::SyncReq, vec![9])]);
    }

    #[test]
    fn test_non_sync_type_is_rejected() {
        let mut plb = driver(3, ScriptedRadio::new());
        assert!(matches!(
            plb.send_sync(FrameType::Data),
            Err(Error::InvalidState(_))
        ));
    }
}
