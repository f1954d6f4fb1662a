use std::io;
use thiserror::Error;

use super::types::RadioTxStatus;

/// Custom error types for the PLB driver
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Header too large: frame of {len} bytes exceeds {max}-byte buffer")]
    HeaderTooLarge { len: usize, max: usize },

    #[error("Frame parse error: {0}")]
    FrameParse(String),

    #[error("Radio rejected transmission: {0:?}")]
    RadioTx(RadioTxStatus),

    #[error("No acknowledgment after {attempts} strobes")]
    NoAck { attempts: u32 },

    #[error("Peer acknowledged preamble with data of its own queued")]
    PeerHasData,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new frame parse error
    pub fn frame_parse(msg: impl Into<String>) -> Self {
        Error::FrameParse(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Creates a new encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Error::Encoding(msg.into())
    }
}
