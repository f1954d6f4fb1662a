use serde::{Deserialize, Serialize};

/// OFF phases a wait may span before the reply is given up on
pub const MAX_WAIT_CYCLES: u8 = 1;

/// What kind of reply the node is currently holding the radio on for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitState {
    /// Nothing outstanding, the radio may be powered down
    #[default]
    Idle,
    /// Waiting for an ack or for the DATA frame following a preamble
    Reply,
    /// In the middle of a sync handshake
    Sync,
}

/// Per-session protocol flags.
///
/// Every flag starts false and is reset when the driver goes from off to on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Next hop answered our BEACON_SD
    pub sd_acked: bool,
    /// Previous hop answered our BEACON_DS
    pub ds_acked: bool,
    /// BEACON_SD already answered this session
    pub a_wait: bool,
    /// BEACON_DS already answered this session; also gates DATA sends
    pub c_wait: bool,
    /// PREAMBLE already answered, cleared when DATA arrives
    pub preamble_got: bool,
    /// A data send is queued on this node
    pub has_data: bool,
    /// The power cycle should push the queued data at its next ON phase
    pub send_req: bool,
    pub wait: WaitState,
    /// OFF phases the current wait has lasted
    pub wait_cycles: u8,
    pub sync_req: bool,
    pub sync_ack: bool,
    pub sync_end: bool,
}

impl SessionState {
    pub fn reset(&mut self) {
        *self = SessionState::default();
    }

    /// True while a reply is outstanding and the radio must stay powered
    pub fn is_waiting(&self) -> bool {
        self.wait != WaitState::Idle
    }

    /// Starts holding the radio on for `wait`
    pub fn begin_wait(&mut self, wait: WaitState) {
        self.wait = wait;
        self.wait_cycles = 0;
    }

    /// Counts an OFF phase spent waiting. A wait that outlives
    /// [`MAX_WAIT_CYCLES`] is dropped together with the preamble it was
    /// answering; returns true when that happens.
    pub fn age_wait(&mut self) -> bool {
        if !self.is_waiting() {
            return false;
        }
        self.wait_cycles = self.wait_cycles.saturating_add(1);
        if self.wait_cycles <= MAX_WAIT_CYCLES {
            return false;
        }
        self.wait = WaitState::Idle;
        self.wait_cycles = 0;
        self.preamble_got = false;
        true
    }

    /// Downstream readiness required before DATA may be strobed
    pub fn ready_to_send(&self) -> bool {
        self.send_req && self.c_wait
    }
}

/// Phase of the duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    /// Driver is off, no timer armed
    Idle,
    On,
    Off,
}

/// Information about the current driver state
#[derive(Debug, Clone, Serialize)]
pub struct StateInfo {
    /// Current state type
    pub state_type: &'static str,
    /// Current duty-cycle phase
    pub phase: CyclePhase,
    /// Whether the transceiver is currently powered
    pub radio_on: bool,
    /// Whether a data send is waiting for the power cycle
    pub pending_send: bool,
    /// Snapshot of the session flags
    pub session: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_all_flags() {
        let mut state = SessionState {
            sd_acked: true,
            c_wait: true,
            preamble_got: true,
            wait: WaitState::Sync,
            sync_end: true,
            ..Default::default()
        };
        assert!(state.is_waiting());
        state.reset();
        assert_eq!(state, SessionState::default());
        assert!(!state.is_waiting());
    }

    #[test]
    fn test_wait_expires_after_a_full_cycle() {
        let mut state = SessionState::default();
        state.preamble_got = true;
        state.begin_wait(WaitState::Reply);
        assert!(!state.age_wait());
        assert_eq!(state.wait, WaitState::Reply);
        assert!(state.age_wait());
        assert_eq!(state.wait, WaitState::Idle);
        assert!(!state.preamble_got);
        assert!(!state.age_wait());
    }

    #[test]
    fn test_new_wait_restarts_the_count() {
        let mut state = SessionState::default();
        state.begin_wait(WaitState::Sync);
        state.age_wait();
        state.begin_wait(WaitState::Sync);
        assert!(!state.age_wait());
        assert_eq!(state.wait, WaitState::Sync);
    }

    #[test]
    fn test_ready_requires_request_and_readiness() {
        let mut state = SessionState::default();
        state.send_req = true;
        assert!(!state.ready_to_send());
        state.c_wait = true;
        assert!(state.ready_to_send());
    }
}
