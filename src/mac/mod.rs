//! PLB radio duty-cycle driver
//!
//! [`Plb`] is the RDC surface handed to the upper layer. It owns the session
//! state, the staging buffer and the collaborators (radio, clock, timer,
//! framer, upper layer). All work runs to completion on the caller's context:
//! the host calls [`Plb::on_timer`] when the armed timer fires and
//! [`Plb::input`] when the radio has received a frame.

mod beacon;
mod dispatch;
mod powercycle;
mod strobe;

pub use self::strobe::StrobeResult;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::core::{packet_type, LinkAddr, RdcConfig, Result, TxStatus};
use crate::protocol::{CyclePhase, NullFramer, PacketBuf, SessionState, StateInfo};
use crate::radio::Radio;
use crate::sync::{SyncPayload, ZeroSyncPayload};
use crate::time::{Clock, Timer};

/// Send-complete callback: status and number of transmissions
pub type SentCallback = Box<dyn FnMut(TxStatus, u32)>;

/// Receiver of inbound payloads
pub trait UpperLayer {
    /// Called for DATA, SYNC_REQ and SYNC_ACK frames with the bytes following
    /// the type tag
    fn input(&mut self, frame_type: crate::core::FrameType, sender: LinkAddr, payload: &[u8]);
}

/// Upper layer that drops everything it is given
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUpper;

impl UpperLayer for NullUpper {
    fn input(&mut self, frame_type: crate::core::FrameType, sender: LinkAddr, _payload: &[u8]) {
        debug!(%frame_type, %sender, "no upper layer, payload dropped");
    }
}

/// A packet handed down by the upper layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPacket {
    pub payload: Bytes,
    /// Destination; the configured next hop when `None`
    pub next_hop: Option<LinkAddr>,
    /// [`packet_type::DATA`] or [`packet_type::SYNC`]
    pub packet_type: u8,
}

impl OutgoingPacket {
    pub fn data(payload: impl Into<Bytes>) -> Self {
        OutgoingPacket {
            payload: payload.into(),
            next_hop: None,
            packet_type: packet_type::DATA,
        }
    }

    /// Request to start a sync handshake with the previous hop
    pub fn sync() -> Self {
        OutgoingPacket {
            payload: Bytes::new(),
            next_hop: None,
            packet_type: packet_type::SYNC,
        }
    }

    pub fn to(mut self, next_hop: LinkAddr) -> Self {
        self.next_hop = Some(next_hop);
        self
    }
}

/// Data send waiting for the power cycle
pub(crate) struct PendingSend {
    pub packet: OutgoingPacket,
    pub callback: SentCallback,
}

/// The PLB driver instance
pub struct Plb<R: Radio, C: Clock, T: Timer> {
    pub(crate) config: RdcConfig,
    pub(crate) radio: R,
    pub(crate) clock: C,
    pub(crate) timer: T,
    pub(crate) framer: Box<dyn crate::protocol::Framer>,
    pub(crate) upper: Box<dyn UpperLayer>,
    pub(crate) sync_payload: Box<dyn SyncPayload>,
    pub(crate) buf: PacketBuf,
    pub(crate) session: SessionState,
    pub(crate) phase: CyclePhase,
    pub(crate) next_hop: LinkAddr,
    pub(crate) prev_hop: Option<LinkAddr>,
    /// Sender of the last parsed frame, target of acks
    pub(crate) last_sender: LinkAddr,
    pub(crate) pending: Option<PendingSend>,
    pub(crate) active: bool,
    pub(crate) radio_on: bool,
}

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Creates a driver with the reference framer and no upper layer
    pub fn new(config: RdcConfig, radio: R, clock: C, timer: T) -> Result<Self> {
        config.validate_for_rate(clock.ticks_per_second())?;
        let mut plb = Plb {
            next_hop: config.next_hop(),
            prev_hop: config.prev_hop(),
            config,
            radio,
            clock,
            timer,
            framer: Box::new(NullFramer::new()),
            upper: Box::new(NullUpper),
            sync_payload: Box::new(ZeroSyncPayload),
            buf: PacketBuf::new(),
            session: SessionState::default(),
            phase: CyclePhase::Idle,
            last_sender: LinkAddr::NULL,
            pending: None,
            active: false,
            radio_on: false,
        };
        plb.init();
        Ok(plb)
    }

    pub fn with_framer(mut self, framer: Box<dyn crate::protocol::Framer>) -> Self {
        self.framer = framer;
        self
    }

    pub fn with_upper_layer(mut self, upper: Box<dyn UpperLayer>) -> Self {
        self.upper = upper;
        self
    }

    pub fn with_sync_payload(mut self, payload: Box<dyn SyncPayload>) -> Self {
        self.sync_payload = payload;
        self
    }

    /// Resets the session and resolves the neighbor addresses
    pub fn init(&mut self) {
        self.reset_session();
        self.phase = CyclePhase::Idle;
        self.next_hop = self.config.next_hop();
        self.prev_hop = self.config.prev_hop();
        info!(
            node = %self.config.node_addr,
            next_hop = %self.next_hop,
            prev_hop = ?self.prev_hop.map(|a| a.to_string()),
            "plb initialized"
        );
    }

    /// Accepts a packet from the upper layer.
    ///
    /// DATA packets are queued until the power cycle finds the downstream
    /// neighbor ready; only one may be queued at a time. SYNC packets start
    /// the sync handshake immediately. `sent` is called exactly once.
    pub fn send(&mut self, packet: OutgoingPacket, mut sent: SentCallback) {
        match packet.packet_type {
            packet_type::DATA => {
                if self.pending.is_some() {
                    warn!("data send already queued, rejecting");
                    sent(TxStatus::Err, 1);
                    return;
                }
                debug!(len = packet.payload.len(), "data send queued");
                self.pending = Some(PendingSend {
                    packet,
                    callback: sent,
                });
                self.session.send_req = true;
                self.session.has_data = true;
            }
            packet_type::SYNC => {
                let (status, transmissions) = self.send_sync_start();
                sent(status, transmissions);
            }
            other => {
                warn!(packet_type = other, "unknown packet type");
                sent(TxStatus::Err, 1);
            }
        }
    }

    /// Sends each packet immediately through the data path, stopping at the
    /// first one that does not complete successfully
    pub fn send_list(&mut self, packets: Vec<OutgoingPacket>, mut sent: SentCallback) {
        for packet in packets {
            let (status, transmissions) = if packet.packet_type == packet_type::DATA {
                self.send_data(&packet)
            } else {
                (TxStatus::Err, 1)
            };
            sent(status, transmissions);
            if status != TxStatus::Ok {
                debug!(?status, "send list stopped");
                return;
            }
        }
    }

    /// Starts a session: rendezvous with both neighbors, then enter the duty
    /// cycle. Does nothing when already on.
    pub fn on(&mut self) {
        if self.active {
            debug!("plb already on");
            return;
        }
        info!(node = %self.config.node_addr, "plb on");
        self.active = true;
        self.reset_session();
        self.beacon_sd();
        self.beacon_ds();
        self.enter_on_phase();
    }

    /// Ends the session unless a reply is outstanding, in which case the
    /// radio is kept on and the cycle continues
    pub fn off(&mut self, keep_radio_on: bool) {
        if self.session.is_waiting() {
            debug!(wait = ?self.session.wait, "reply outstanding, keeping radio on");
            self.radio_on();
            return;
        }
        info!(node = %self.config.node_addr, "plb off");
        self.active = false;
        self.phase = CyclePhase::Idle;
        if keep_radio_on {
            self.radio_on();
        } else {
            self.radio_off();
        }
    }

    /// Channel sampling is managed internally
    pub fn channel_check_interval(&self) -> u16 {
        0
    }

    pub fn is_on(&self) -> bool {
        self.active
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &RdcConfig {
        &self.config
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn has_pending_send(&self) -> bool {
        self.pending.is_some()
    }

    /// Gets information about the current state
    pub fn state_info(&self) -> StateInfo {
        let state_type = match (self.active, self.phase) {
            (false, _) => "Off",
            (true, _) if self.session.is_waiting() => "Waiting",
            (true, CyclePhase::On) => "On",
            (true, CyclePhase::Off) => "Sleeping",
            (true, CyclePhase::Idle) => "Starting",
        };
        StateInfo {
            state_type,
            phase: self.phase,
            radio_on: self.radio_on,
            pending_send: self.pending.is_some(),
            session: self.session.clone(),
        }
    }

    /// Clears the session flags, keeping a queued send visible
    fn reset_session(&mut self) {
        self.session.reset();
        let queued = self.pending.is_some();
        self.session.send_req = queued;
        self.session.has_data = queued;
    }

    pub(crate) fn next_hop(&self) -> LinkAddr {
        self.next_hop
    }

    pub(crate) fn prev_hop(&self) -> Option<LinkAddr> {
        self.prev_hop
    }

    pub(crate) fn duration_ticks(&self, duration: std::time::Duration) -> crate::time::Ticks {
        crate::util::duration_to_ticks(duration, self.clock.ticks_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FrameType, LinkAddr};
    use crate::sim::{FakeClock, ManualTimer, ScriptedRadio};
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestPlb = Plb<ScriptedRadio, FakeClock, ManualTimer>;

    fn driver(node: u8, radio: ScriptedRadio) -> TestPlb {
        let config = RdcConfig {
            strobe_num_max: 3,
            ..RdcConfig::for_node(LinkAddr::new(node))
        };
        Plb::new(config, radio, FakeClock::new(), ManualTimer::new()).unwrap()
    }

    fn recorder() -> (Rc<RefCell<Vec<(TxStatus, u32)>>>, SentCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, Box::new(move |status, n| sink.borrow_mut().push((status, n))))
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RdcConfig {
            strobe_num_max: 0,
            ..Default::default()
        };
        assert!(Plb::new(config, ScriptedRadio::new(), FakeClock::new(), ManualTimer::new()).is_err());
    }

    #[test]
    fn test_new_rejects_delay_beyond_tick_range() {
        let config = RdcConfig {
            pre_data_delay: std::time::Duration::from_secs(3600),
            ..Default::default()
        };
        let result = Plb::new(config, ScriptedRadio::new(), FakeClock::new(), ManualTimer::new());
        assert!(matches!(result, Err(crate::core::Error::Config(_))));
    }

    #[test]
    fn test_unknown_packet_type_fails_immediately() {
        let mut plb = driver(2, ScriptedRadio::new());
        let (log, cb) = recorder();
        let packet = OutgoingPacket {
            packet_type: 7,
            ..OutgoingPacket::data(&b"x"[..])
        };
        plb.send(packet, cb);
        assert_eq!(*log.borrow(), vec![(TxStatus::Err, 1)]);
        assert!(plb.radio().sent().is_empty());
    }

    #[test]
    fn test_second_data_send_is_rejected_while_one_is_queued() {
        let mut plb = driver(2, ScriptedRadio::new());
        let (first, cb1) = recorder();
        let (second, cb2) = recorder();
        plb.send(OutgoingPacket::data(&b"a"[..]), cb1);
        plb.send(OutgoingPacket::data(&b"b"[..]), cb2);
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec![(TxStatus::Err, 1)]);
        assert!(plb.session().send_req);
        assert!(plb.session().has_data);
    }

    #[test]
    fn test_off_keeps_radio_on_while_waiting() {
        let mut plb = driver(2, ScriptedRadio::new());
        plb.on();
        plb.session.wait = crate::protocol::WaitState::Reply;
        plb.off(false);
        assert!(plb.is_on());
        assert!(plb.radio().is_on());

        plb.session.wait = crate::protocol::WaitState::Idle;
        plb.off(false);
        assert!(!plb.is_on());
        assert!(!plb.radio().is_on());
        assert_eq!(plb.state_info().state_type, "Off");
    }

    #[test]
    fn test_off_can_leave_radio_listening() {
        let mut plb = driver(2, ScriptedRadio::new());
        plb.on();
        plb.off(true);
        assert!(!plb.is_on());
        assert!(plb.radio().is_on());
    }

    #[test]
    fn test_send_list_stops_at_first_failure() {
        let mut plb = driver(2, ScriptedRadio::new());
        let (log, cb) = recorder();
        plb.send_list(
            vec![
                OutgoingPacket::data(&b"one"[..]),
                OutgoingPacket::data(&b"two"[..]),
            ],
            cb,
        );
        assert_eq!(*log.borrow(), vec![(TxStatus::NoAck, 3)]);
        // Only the first packet's preamble strobes went out
        assert_eq!(plb.radio().sent_of_type(FrameType::Preamble), 3);
    }

    #[test]
    fn test_channel_check_interval_is_zero() {
        let plb = driver(2, ScriptedRadio::new());
        assert_eq!(plb.channel_check_interval(), 0);
    }
}
