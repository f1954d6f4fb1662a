use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Link-layer node address (two bytes, rime style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LinkAddr(pub [u8; 2]);

impl LinkAddr {
    /// The "no node" sentinel
    pub const NULL: LinkAddr = LinkAddr([0, 0]);

    /// Creates an address from its low byte
    pub fn new(id: u8) -> Self {
        LinkAddr([id, 0])
    }

    /// Returns the low byte, the position of the node in the chain
    pub fn id(&self) -> u8 {
        self.0[0]
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Next node in the chain (address + 1)
    pub fn next_hop(&self) -> Self {
        LinkAddr([self.0[0].wrapping_add(1), self.0[1]])
    }

    /// Previous node in the chain (address - 1), `None` for the first node
    pub fn previous_hop(&self) -> Option<Self> {
        let prev = LinkAddr([self.0[0].saturating_sub(1), self.0[1]]);
        if prev.0[0] == 0 {
            None
        } else {
            Some(prev)
        }
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

/// One-byte frame type tag carried as the first payload byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    BeaconSd,
    BeaconSdAck,
    BeaconDs,
    BeaconDsAck,
    Preamble,
    PreambleAck,
    PreambleAckData,
    Data,
    DataAck,
    SyncStart,
    SyncReq,
    SyncAck,
    SyncEnd,
}

impl FrameType {
    pub const ALL: [FrameType; 13] = [
        FrameType::BeaconSd,
        FrameType::BeaconSdAck,
        FrameType::BeaconDs,
        FrameType::BeaconDsAck,
        FrameType::Preamble,
        FrameType::PreambleAck,
        FrameType::PreambleAckData,
        FrameType::Data,
        FrameType::DataAck,
        FrameType::SyncStart,
        FrameType::SyncReq,
        FrameType::SyncAck,
        FrameType::SyncEnd,
    ];

    /// Wire value of the tag
    pub fn tag(self) -> u8 {
        match self {
            FrameType::BeaconSd => 0x02,
            FrameType::BeaconSdAck => 0x03,
            FrameType::BeaconDs => 0x04,
            FrameType::BeaconDsAck => 0x05,
            FrameType::Preamble => 0x08,
            FrameType::PreambleAck => 0x09,
            FrameType::PreambleAckData => 0x19,
            FrameType::Data => 0x10,
            FrameType::DataAck => 0x11,
            FrameType::SyncStart => 0x20,
            FrameType::SyncReq => 0x21,
            FrameType::SyncAck => 0x42,
            FrameType::SyncEnd => 0x80,
        }
    }

    /// Looks up a tag; unknown values yield `None`
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// The acknowledgment answering a request type, if it has one.
    ///
    /// Plain acks are always `tag | 1`. The combined "preamble acked, and I
    /// have data too" reply is reached through [`FrameType::preamble_reply`].
    pub fn ack(self) -> Option<Self> {
        match self {
            FrameType::BeaconSd => Some(FrameType::BeaconSdAck),
            FrameType::BeaconDs => Some(FrameType::BeaconDsAck),
            FrameType::Preamble => Some(FrameType::PreambleAck),
            FrameType::Data => Some(FrameType::DataAck),
            _ => None,
        }
    }

    /// Reply to a received preamble depending on whether data is queued here
    pub fn preamble_reply(has_data: bool) -> Self {
        if has_data {
            FrameType::PreambleAckData
        } else {
            FrameType::PreambleAck
        }
    }

    /// Whether this is one of the acknowledgment tags consumed by ack-wait
    pub fn is_ack(self) -> bool {
        matches!(
            self,
            FrameType::BeaconSdAck
                | FrameType::BeaconDsAck
                | FrameType::PreambleAck
                | FrameType::PreambleAckData
                | FrameType::DataAck
        )
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameType::BeaconSd => "BEACON_SD",
            FrameType::BeaconSdAck => "BEACON_SD_ACK",
            FrameType::BeaconDs => "BEACON_DS",
            FrameType::BeaconDsAck => "BEACON_DS_ACK",
            FrameType::Preamble => "PREAMBLE",
            FrameType::PreambleAck => "PREAMBLE_ACK",
            FrameType::PreambleAckData => "PREAMBLE_ACK_DATA",
            FrameType::Data => "DATA",
            FrameType::DataAck => "DATA_ACK",
            FrameType::SyncStart => "SYNC_START",
            FrameType::SyncReq => "SYNC_REQ",
            FrameType::SyncAck => "SYNC_ACK",
            FrameType::SyncEnd => "SYNC_END",
        };
        write!(f, "{}({:#04x})", name, self.tag())
    }
}

/// Result of waiting for an acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    NoAck,
    Acked,
    /// The peer acked a preamble but has data of its own queued
    AckedWithData,
}

impl AckOutcome {
    /// Classifies a received tag against the type that was just strobed.
    ///
    /// A tag matches when every set bit of it is also set in `sent + 1`.
    /// A matching tag with the `0x0B` bits all set is the data-bearing
    /// variant. The combined preamble reply does not fit that bit pattern
    /// (0x19), so it is recognised explicitly for preamble strobes.
    pub fn classify(sent: FrameType, received: u8) -> Self {
        if sent == FrameType::Preamble && received == FrameType::PreambleAckData.tag() {
            return AckOutcome::AckedWithData;
        }
        let expected = sent.tag().wrapping_add(1);
        if expected & received != received {
            return AckOutcome::NoAck;
        }
        if received & 0x0B == 0x0B {
            AckOutcome::AckedWithData
        } else {
            AckOutcome::Acked
        }
    }

    pub fn is_acked(self) -> bool {
        !matches!(self, AckOutcome::NoAck)
    }
}

/// Transceiver transmit result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioTxStatus {
    Ok,
    Err,
    Collision,
    NoAck,
}

/// Outcome reported to the upper layer once a send concludes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Ok,
    Collision,
    NoAck,
    /// Not sent because the peer has its own data queued
    Deferred,
    Err,
    ErrFatal,
}

impl From<&Error> for TxStatus {
    fn from(err: &Error) -> Self {
        match err {
            Error::NoAck { .. } => TxStatus::NoAck,
            Error::PeerHasData => TxStatus::Deferred,
            Error::RadioTx(RadioTxStatus::Collision) => TxStatus::Collision,
            Error::RadioTx(_) => TxStatus::ErrFatal,
            _ => TxStatus::Err,
        }
    }
}

/// Packet-type attribute values set by the upper layer
pub mod packet_type {
    pub const DATA: u8 = 0;
    pub const SYNC: u8 = 1;
}
