//! Neighbor rendezvous run at session start

use tracing::{debug, info, warn};

use crate::core::FrameType;
use crate::radio::Radio;
use crate::time::{Clock, Timer};

use super::Plb;

impl<R: Radio, C: Clock, T: Timer> Plb<R, C, T> {
    /// Strobes BEACON_SD toward the next hop. An ack marks the next hop as
    /// listening and opens the DATA gate (`c_wait`).
    pub(crate) fn beacon_sd(&mut self) {
        let dst = self.next_hop();
        match self.send_strobe(dst, FrameType::BeaconSd) {
            Ok(result) if result.outcome.is_acked() => {
                self.session.sd_acked = true;
                self.session.c_wait = true;
                info!(%dst, attempts = result.attempts, "next hop listening");
            }
            Ok(result) => {
                debug!(%dst, attempts = result.attempts, "next hop silent");
            }
            Err(err) => warn!(%dst, error = %err, "BEACON_SD failed"),
        }
    }

    /// Strobes BEACON_DS toward the previous hop; skipped on the first node
    pub(crate) fn beacon_ds(&mut self) {
        let Some(dst) = self.prev_hop() else {
            debug!("first node in chain, no BEACON_DS");
            return;
        };
        match self.send_strobe(dst, FrameType::BeaconDs) {
            Ok(result) if result.outcome.is_acked() => {
                self.session.ds_acked = true;
                info!(%dst, attempts = result.attempts, "previous hop listening");
            }
            Ok(result) => {
                debug!(%dst, attempts = result.attempts, "previous hop silent");
            }
            Err(err) => warn!(%dst, error = %err, "BEACON_DS failed"),
        }
    }
}
