//! Core types for the PLB radio duty-cycle driver
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod config;
pub mod error;
pub mod types;
pub mod serde;

pub use self::config::RdcConfig;
pub use self::error::{Error, Result};
pub use self::types::{
    packet_type,
    AckOutcome,
    FrameType,
    LinkAddr,
    RadioTxStatus,
    TxStatus,
};

/// Maximum number of times a frame is strobed before giving up
pub const STROBE_NUM_MAX: u32 = 50;

/// Size of the stack buffer used for beacons, preambles, acks and sync frames
pub const MAX_FRAME_LEN: usize = 100;

/// Maximum number of bytes read while sampling for an ack
pub const ACK_READ_LEN: usize = 100;

/// Size of the packet buffer staging DATA frames
pub const PACKETBUF_SIZE: usize = 128;

/// SYNC_START strobes after which the initiator sends SYNC_REQ itself
pub const SYNC_START_THRESHOLD: u32 = 5;
