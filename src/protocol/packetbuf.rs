use bytes::{BufMut, Bytes, BytesMut};

use crate::core::LinkAddr;

/// Address slots carried alongside a staged frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrSlot {
    Sender,
    Receiver,
}

/// Single-frame staging buffer.
///
/// Holds a header region (written by the framer) in front of the data
/// region. Only one frame is staged at a time; building a new frame starts
/// with [`PacketBuf::clear`].
#[derive(Debug, Clone)]
pub struct PacketBuf {
    hdr: BytesMut,
    data: BytesMut,
    sender: LinkAddr,
    receiver: LinkAddr,
}

impl Default for PacketBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketBuf {
    pub fn new() -> Self {
        PacketBuf {
            hdr: BytesMut::with_capacity(crate::core::MAX_FRAME_LEN),
            data: BytesMut::with_capacity(crate::core::PACKETBUF_SIZE),
            sender: LinkAddr::NULL,
            receiver: LinkAddr::NULL,
        }
    }

    /// Stages an outgoing payload
    pub fn with_data(data: &[u8]) -> Self {
        let mut buf = Self::new();
        buf.set_data(data);
        buf
    }

    /// Loads raw received bytes, header still in place
    pub fn from_frame(raw: &[u8]) -> Self {
        Self::with_data(raw)
    }

    /// Empties the buffer and resets the addresses
    pub fn clear(&mut self) {
        self.hdr.clear();
        self.data.clear();
        self.sender = LinkAddr::NULL;
        self.receiver = LinkAddr::NULL;
    }

    pub fn set_data(&mut self, data: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(data);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn datalen(&self) -> usize {
        self.data.len()
    }

    /// Inserts one byte at the front of the data region, shifting the rest up
    pub fn push_front(&mut self, byte: u8) {
        let mut shifted = BytesMut::with_capacity(self.data.len() + 1);
        shifted.put_u8(byte);
        shifted.extend_from_slice(&self.data);
        self.data = shifted;
    }

    /// Installs a header in front of the data region
    pub fn set_header(&mut self, header: &[u8]) {
        self.hdr.clear();
        self.hdr.extend_from_slice(header);
    }

    pub fn header(&self) -> &[u8] {
        &self.hdr
    }

    pub fn hdrlen(&self) -> usize {
        self.hdr.len()
    }

    /// Removes `len` bytes from the front of the data region, returning them
    pub fn strip_front(&mut self, len: usize) -> Option<Bytes> {
        if len > self.data.len() {
            return None;
        }
        Some(self.data.split_to(len).freeze())
    }

    /// Header plus data length
    pub fn totlen(&self) -> usize {
        self.hdr.len() + self.data.len()
    }

    /// Contiguous wire bytes: header followed by data
    pub fn frame(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.totlen());
        out.extend_from_slice(&self.hdr);
        out.extend_from_slice(&self.data);
        out.freeze()
    }

    pub fn set_addr(&mut self, slot: AddrSlot, addr: LinkAddr) {
        match slot {
            AddrSlot::Sender => self.sender = addr,
            AddrSlot::Receiver => self.receiver = addr,
        }
    }

    pub fn addr(&self, slot: AddrSlot) -> LinkAddr {
        match slot {
            AddrSlot::Sender => self.sender,
            AddrSlot::Receiver => self.receiver,
        }
    }
}
