//! PLB: Periodic Listen & Beacon radio duty-cycle driver
//!
//! This library implements the RDC layer of a multi-hop sensor network stack.
//! It keeps the radio mostly off, rendezvouses with the neighbors on either
//! side of a chain through beacons, delivers one frame per hop with a
//! strobe-until-acked transport and runs a small clock sync handshake
//! between adjacent nodes.
//!
//! ```no_run
//! use plb_rdc::core::{LinkAddr, RdcConfig};
//! use plb_rdc::host::{self, HostEvent, TokioTimer};
//! use plb_rdc::mac::Plb;
//! use plb_rdc::sim::ScriptedRadio;
//! use plb_rdc::time::SystemClock;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> plb_rdc::Result<()> {
//!     let (tx, rx) = mpsc::unbounded_channel::<HostEvent>();
//!     let timer = TokioTimer::new(tx.clone(), SystemClock::TICKS_PER_SECOND);
//!     let config = RdcConfig::for_node(LinkAddr::new(2));
//!     let mut driver = Plb::new(config, ScriptedRadio::new(), SystemClock::new(), timer)?;
//!     host::run(&mut driver, rx).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod host;
pub mod mac;
pub mod protocol;
pub mod radio;
pub mod sim;
pub mod sync;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Error, RdcConfig, Result};
pub use crate::mac::{OutgoingPacket, Plb, SentCallback, UpperLayer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
