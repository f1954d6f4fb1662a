//! Inbound frame dispatch

use tracing::{debug, trace};

use crate::core::FrameType;
use crate::protocol::{frame_type_of, AddrSlot, PacketBuf, WaitState};
use crate::radio::Radio;
use crate::time::{Clock, Timer};
use crate::util::bit_string;

use super::Plb;

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Handles one frame received by the radio.
    ///
    /// Frames the framer cannot parse are dropped without side effects. Ack
    /// types are only meaningful inside an ack window and are ignored here.
    pub fn input(&mut self, raw: &[u8]) {
        trace!(len = raw.len(), bits = %bit_string(raw), "rx");

        let mut buf = PacketBuf::from_frame(raw);
        if let Err(err) = self.framer.parse(&mut buf) {
            debug!(error = %err, "dropping unparsable frame");
            return;
        }
        let Some(frame_type) = frame_type_of(&buf) else {
            debug!(tag = ?buf.data().first(), "ignoring unknown frame type");
            return;
        };
        let sender = buf.addr(AddrSlot::Sender);
        self.buf = buf;
        self.last_sender = sender;
        debug!(%frame_type, %sender, "input");

        match frame_type {
            FrameType::BeaconSd => {
                if !self.session.a_wait {
                    self.send_ack(FrameType::BeaconSdAck);
                    self.session.a_wait = true;
                }
            }
            FrameType::BeaconDs => {
                if !self.session.c_wait {
                    self.send_ack(FrameType::BeaconDsAck);
                    self.session.c_wait = true;
                }
            }
            FrameType::Preamble => {
                if !self.session.preamble_got {
                    let reply = FrameType::preamble_reply(self.session.has_data);
                    if !self.session.has_data {
                        // Hold the radio on for the DATA frame
                        self.session.begin_wait(WaitState::Reply);
                    }
                    self.send_ack(reply);
                    self.session.preamble_got = true;
                }
            }
            FrameType::Data => {
                let payload = self.tagged_payload();
                self.send_ack(FrameType::DataAck);
                self.session.preamble_got = false;
                if self.session.wait == WaitState::Reply {
                    self.session.wait = WaitState::Idle;
                }
                self.upper.input(frame_type, sender, &payload);
            }
            FrameType::SyncStart => {
                trace!(%sender, "sync start heard");
            }
            FrameType::SyncReq => {
                let payload = self.tagged_payload();
                self.session.sync_req = true;
                self.sync_received(frame_type, sender, &payload);
                self.reply_sync(FrameType::SyncAck);
                self.upper.input(frame_type, sender, &payload);
            }
            FrameType::SyncAck => {
                let payload = self.tagged_payload();
                self.session.sync_ack = true;
                self.sync_received(frame_type, sender, &payload);
                self.reply_sync(FrameType::SyncEnd);
                self.upper.input(frame_type, sender, &payload);
            }
            FrameType::SyncEnd => {
                let payload = self.tagged_payload();
                self.session.sync_end = true;
                self.sync_received(frame_type, sender, &payload);
                if self.session.wait == WaitState::Sync {
                    self.session.wait = WaitState::Idle;
                }
            }
            FrameType::BeaconSdAck
            | FrameType::BeaconDsAck
            | FrameType::PreambleAck
            | FrameType::PreambleAckData
            | FrameType::DataAck => {
                trace!(%frame_type, "ack outside an ack window ignored");
            }
        }
    }

    /// Bytes following the type tag of the parsed frame
    fn tagged_payload(&self) -> Vec<u8> {
        self.buf.data().get(1..).unwrap_or_default().to_vec()
    }
}
