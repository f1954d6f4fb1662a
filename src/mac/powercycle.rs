//! Duty-cycle power manager and the data send path
//!
//! The cycle is an explicit ON/OFF state machine re-entered from the timer
//! callback. Each ON phase first pushes the queued data frame when the
//! downstream neighbor is ready.

use tracing::{debug, info, warn};

use crate::core::{AckOutcome, Error, FrameType, Result, TxStatus, PACKETBUF_SIZE};
use crate::protocol::{build_frame, CyclePhase};
use crate::radio::Radio;
use crate::time::{hold, Clock, Timer};

use super::{OutgoingPacket, Plb};

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Resumes the duty cycle when the armed timer fires
    pub fn on_timer(&mut self) {
        if !self.active {
            debug!("timer fired after off, cycle stopped");
            self.phase = CyclePhase::Idle;
            return;
        }
        match self.phase {
            CyclePhase::On => self.enter_off_phase(),
            CyclePhase::Off => self.enter_on_phase(),
            CyclePhase::Idle => debug!("timer fired outside the cycle"),
        }
    }

    pub(crate) fn enter_on_phase(&mut self) {
        if self.session.ready_to_send() {
            self.session.send_req = false;
            self.send_pending_data();
        }
        self.radio_on();
        self.phase = CyclePhase::On;
        let ticks = self.duration_ticks(self.config.on_time);
        self.timer.schedule(ticks);
        debug!(ticks, "on phase");
    }

    fn enter_off_phase(&mut self) {
        let stale = self.session.wait;
        if self.session.age_wait() {
            warn!(wait = ?stale, "reply never arrived, giving up");
        }
        if !self.session.is_waiting() {
            self.radio_off();
        }
        self.phase = CyclePhase::Off;
        let ticks = self.duration_ticks(self.config.off_time);
        self.timer.schedule(ticks);
        debug!(ticks, radio_on = self.radio_on, "off phase");
    }

    fn send_pending_data(&mut self) {
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        self.session.has_data = false;
        let (status, transmissions) = self.send_data(&pending.packet);
        (pending.callback)(status, transmissions);
    }

    /// Runs one complete data exchange and reports how it ended
    pub(crate) fn send_data(&mut self, packet: &OutgoingPacket) -> (TxStatus, u32) {
        let result = self.try_send_data(packet);
        let (status, transmissions) = match &result {
            Ok(()) => (TxStatus::Ok, 1),
            Err(err) => {
                let attempts = match err {
                    Error::NoAck { attempts } => *attempts,
                    _ => 1,
                };
                (TxStatus::from(err), attempts)
            }
        };
        match result {
            Ok(()) => info!(len = packet.payload.len(), "data delivered"),
            Err(err) => warn!(error = %err, ?status, "data not delivered"),
        }
        (status, transmissions)
    }

    fn try_send_data(&mut self, packet: &OutgoingPacket) -> Result<()> {
        let dst = packet.next_hop.unwrap_or(self.next_hop);

        let strobe = self.send_strobe(dst, FrameType::Preamble)?;
        match strobe.outcome {
            AckOutcome::NoAck => {
                return Err(Error::NoAck {
                    attempts: strobe.attempts,
                })
            }
            AckOutcome::AckedWithData => return Err(Error::PeerHasData),
            AckOutcome::Acked => {}
        }

        self.buf.clear();
        self.buf.set_data(&packet.payload);
        let frame = build_frame(
            self.framer.as_ref(),
            &mut self.buf,
            self.config.node_addr,
            dst,
            FrameType::Data,
            PACKETBUF_SIZE,
        )?;

        let guard = self.duration_ticks(self.config.pre_data_delay);
        hold(&self.clock, guard);

        self.radio_on();
        debug!(%dst, len = frame.len(), "send DATA");
        if let Err(err) = self.transmit(&frame) {
            self.release_radio();
            return Err(err);
        }
        let outcome = self.wait_ack(FrameType::Data);
        self.release_radio();

        if outcome.is_acked() {
            Ok(())
        } else {
            Err(Error::NoAck { attempts: 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::core::{FrameType, LinkAddr, RdcConfig, TxStatus};
    use crate::mac::{OutgoingPacket, Plb};
    use crate::protocol::{CyclePhase, WaitState};
    use crate::sim::{ack_frame, frame_from, FakeClock, ManualTimer, ScriptedRadio};

    fn driver(radio: ScriptedRadio) -> Plb<ScriptedRadio, FakeClock, ManualTimer> {
        let config = RdcConfig {
            strobe_num_max: 2,
            pre_data_delay: Duration::from_millis(5),
            ..RdcConfig::for_node(LinkAddr::new(2))
        };
        Plb::new(config, radio, FakeClock::new(), ManualTimer::new()).unwrap()
    }

    /// Acks every request type the driver strobes
    fn cooperative_peer() -> ScriptedRadio {
        ScriptedRadio::new().with_responder(|frame: &[u8]| {
            FrameType::from_tag(frame[4])
                .and_then(FrameType::ack)
                .map(|ack| ack_frame(frame, ack))
        })
    }

    #[test]
    fn test_cycle_alternates_phases() {
        let mut plb = driver(ScriptedRadio::new());
        plb.on();
        assert_eq!(plb.phase(), CyclePhase::On);
        assert!(plb.radio().is_on());
        assert_eq!(plb.timer().scheduled(), vec![100_000]);

        plb.on_timer();
        assert_eq!(plb.phase(), CyclePhase::Off);
        assert!(!plb.radio().is_on());

        plb.on_timer();
        assert_eq!(plb.phase(), CyclePhase::On);
        assert!(plb.radio().is_on());
        assert_eq!(plb.timer().scheduled().len(), 3);
    }

    #[test]
    fn test_off_phase_keeps_radio_for_pending_reply() {
        let mut plb = driver(ScriptedRadio::new());
        plb.on();
        plb.session.wait = WaitState::Reply;
        plb.on_timer();
        assert_eq!(plb.phase(), CyclePhase::Off);
        assert!(plb.radio().is_on());
    }

    #[test]
    fn test_lost_data_frame_releases_radio_after_a_cycle() {
        let mut plb = driver(ScriptedRadio::new());
        plb.on();
        let preamble = frame_from(LinkAddr::new(1), LinkAddr::new(2), FrameType::Preamble, &[]);
        plb.input(&preamble);
        assert_eq!(plb.session().wait, WaitState::Reply);

        // DATA never follows
        plb.on_timer();
        assert!(plb.radio().is_on());
        plb.on_timer();
        plb.on_timer();
        assert_eq!(plb.phase(), CyclePhase::Off);
        assert_eq!(plb.session().wait, WaitState::Idle);
        assert!(!plb.session().preamble_got);
        assert!(!plb.radio().is_on());

        plb.off(false);
        assert!(!plb.is_on());

        plb.input(&preamble);
        assert_eq!(plb.radio().sent_of_type(FrameType::PreambleAck), 2);
    }

    #[test]
    fn test_timer_after_off_stops_cycle() {
        let mut plb = driver(ScriptedRadio::new());
        plb.on();
        plb.off(false);
        plb.on_timer();
        assert_eq!(plb.phase(), CyclePhase::Idle);
        assert_eq!(plb.timer().scheduled().len(), 1);
    }

    #[test]
    fn test_queued_data_sent_once_ready() {
        let mut plb = driver(cooperative_peer());
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        plb.send(
            OutgoingPacket::data(&b"reading"[..]),
            Box::new(move |status, n| sink.borrow_mut().push((status, n))),
        );
        plb.on();

        assert_eq!(*log.borrow(), vec![(TxStatus::Ok, 1)]);
        assert!(!plb.has_pending_send());
        assert!(!plb.session().send_req);
        assert!(!plb.session().has_data);
        let data = plb
            .radio()
            .sent()
            .iter()
            .find(|f| f[4] == FrameType::Data.tag())
            .cloned()
            .unwrap();
        assert_eq!(&data[5..], b"reading");
    }

    #[test]
    fn test_missing_data_ack_reports_no_ack() {
        let radio = ScriptedRadio::new().with_responder(|frame: &[u8]| {
            match FrameType::from_tag(frame[4]) {
                Some(FrameType::Data) | None => None,
                Some(t) => t.ack().map(|ack| ack_frame(frame, ack)),
            }
        });
        let mut plb = driver(radio);
        let (status, n) = plb.send_data(&OutgoingPacket::data(&b"x"[..]));
        assert_eq!((status, n), (TxStatus::NoAck, 1));
        assert_eq!(plb.radio().sent_of_type(FrameType::Data), 1);
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        let mut plb = driver(cooperative_peer());
        let (status, n) = plb.send_data(&OutgoingPacket::data(vec![0u8; 200]));
        assert_eq!((status, n), (TxStatus::Err, 1));
        assert_eq!(plb.radio().sent_of_type(FrameType::Data), 0);
    }
}
