//! Link-layer header framing
//!
//! The [`Framer`] trait is the boundary to the external header framer. The
//! driver never interprets header bytes itself; it only relies on the framer
//! to fill in and recover the sender/receiver addresses. [`build_frame`] is
//! the adapter every outgoing frame goes through: it tags the payload with
//! its frame type and asks the framer for the header.

use bytes::Bytes;

use crate::core::{Error, FrameType, LinkAddr, Result};
use super::packetbuf::{AddrSlot, PacketBuf};

/// External link-layer header encoder/decoder
pub trait Framer {
    /// Writes the header for the staged frame, returning its length
    fn create(&self, buf: &mut PacketBuf) -> Result<usize>;

    /// Strips and parses the header of a received frame, filling in the
    /// address slots. Returns the header length.
    fn parse(&self, buf: &mut PacketBuf) -> Result<usize>;
}

/// Minimal framer: receiver address followed by sender address
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFramer;

impl NullFramer {
    pub const HEADER_LEN: usize = 4;

    pub fn new() -> Self {
        NullFramer
    }
}

impl Framer for NullFramer {
    fn create(&self, buf: &mut PacketBuf) -> Result<usize> {
        let receiver = buf.addr(AddrSlot::Receiver);
        let sender = buf.addr(AddrSlot::Sender);
        let header = [receiver.0[0], receiver.0[1], sender.0[0], sender.0[1]];
        buf.set_header(&header);
        Ok(Self::HEADER_LEN)
    }

    fn parse(&self, buf: &mut PacketBuf) -> Result<usize> {
        let header = buf.strip_front(Self::HEADER_LEN).ok_or_else(|| {
            Error::frame_parse(format!(
                "{} bytes is shorter than the {}-byte header",
                buf.datalen(),
                Self::HEADER_LEN
            ))
        })?;
        buf.set_header(&header);
        buf.set_addr(AddrSlot::Receiver, LinkAddr([header[0], header[1]]));
        buf.set_addr(AddrSlot::Sender, LinkAddr([header[2], header[3]]));
        Ok(Self::HEADER_LEN)
    }
}

/// Tags the staged payload with `frame_type`, addresses it and frames it.
///
/// The tag becomes the first data byte and any staged payload moves up by
/// one. Fails with [`Error::HeaderTooLarge`] when the framed result would not
/// fit in `max_len` bytes.
pub fn build_frame(
    framer: &dyn Framer,
    buf: &mut PacketBuf,
    sender: LinkAddr,
    dst: LinkAddr,
    frame_type: FrameType,
    max_len: usize,
) -> Result<Bytes> {
    buf.set_addr(AddrSlot::Sender, sender);
    buf.set_addr(AddrSlot::Receiver, dst);
    buf.push_front(frame_type.tag());

    let hdr_len = framer.create(buf)?;
    let len = hdr_len + buf.datalen();
    if len > max_len {
        return Err(Error::HeaderTooLarge { len, max: max_len });
    }

    tracing::trace!(frame_type = %frame_type, %dst, hdr_len, len, "frame created");
    Ok(buf.frame())
}

/// Reads the frame type tag of a parsed frame; unknown tags yield `None`
pub fn frame_type_of(buf: &PacketBuf) -> Option<FrameType> {
    buf.data().first().copied().and_then(FrameType::from_tag)
}
