//! Frame staging, header framing and session state
//!
//! Every frame the driver emits is `[link header][type tag][payload]`. The
//! link header belongs to an external [`Framer`]; this module only stages the
//! bytes in a [`PacketBuf`] and prepends the one-byte tag.

pub mod framer;
pub mod packetbuf;
pub mod state;

pub use self::framer::{build_frame, frame_type_of, Framer, NullFramer};
pub use self::packetbuf::{AddrSlot, PacketBuf};
pub use self::state::{CyclePhase, SessionState, StateInfo, WaitState, MAX_WAIT_CYCLES};
