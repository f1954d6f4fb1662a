//! Tokio host integration
//!
//! Runs a driver on the current task: timer expirations and received frames
//! arrive as [`HostEvent`]s on one channel and are fed to the driver in
//! order. The driver is not `Send`, so it never leaves the calling task;
//! only the timer sleeps are spawned.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::{Error, Result};
use crate::mac::Plb;
use crate::radio::Radio;
use crate::time::{Clock, Ticks, Timer};
use crate::util::ticks_to_duration;

/// Inputs to the host loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The duty-cycle timer expired
    TimerFired,
    /// The radio received a frame
    Frame(Bytes),
    /// Turn the driver off and leave the loop once no reply is outstanding
    Shutdown { keep_radio_on: bool },
}

/// One-shot timer posting [`HostEvent::TimerFired`] on expiry
#[derive(Debug)]
pub struct TokioTimer {
    events: mpsc::UnboundedSender<HostEvent>,
    ticks_per_second: u32,
    handle: Option<JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(events: mpsc::UnboundedSender<HostEvent>, ticks_per_second: u32) -> Self {
        TokioTimer {
            events,
            ticks_per_second,
            handle: None,
        }
    }

    /// Disarms the timer
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, after: Ticks) {
        self.cancel();
        let delay = ticks_to_duration(after, self.ticks_per_second);
        let events = self.events.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the host loop has ended
            let _ = events.send(HostEvent::TimerFired);
        }));
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Turns `driver` on and serves events until a shutdown request takes
/// effect. Returns the number of events handled.
pub async fn run<R: Radio, C: Clock>(
    driver: &mut Plb<R, C, TokioTimer>,
    mut events: mpsc::UnboundedReceiver<HostEvent>,
) -> Result<u64> {
    if driver.is_on() {
        return Err(Error::invalid_state("driver is already running"));
    }
    driver.on();

    let mut handled = 0u64;
    let mut shutdown: Option<bool> = None;
    while let Some(event) = events.recv().await {
        handled += 1;
        match event {
            HostEvent::TimerFired => driver.on_timer(),
            HostEvent::Frame(frame) => driver.input(&frame),
            HostEvent::Shutdown { keep_radio_on } => shutdown = Some(keep_radio_on),
        }

        if let Some(keep_radio_on) = shutdown {
            driver.off(keep_radio_on);
            if !driver.is_on() {
                break;
            }
            debug!("shutdown deferred, reply outstanding");
        }
    }

    if driver.is_on() {
        driver.off(shutdown.unwrap_or(false));
    }
    info!(handled, "host loop finished");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::{FrameType, LinkAddr, RdcConfig};
    use crate::sim::{frame_from, ScriptedRadio};
    use crate::time::SystemClock;

    fn driver(tx: mpsc::UnboundedSender<HostEvent>) -> Plb<ScriptedRadio, SystemClock, TokioTimer> {
        let config = RdcConfig {
            strobe_num_max: 2,
            on_time: Duration::from_millis(5),
            off_time: Duration::from_millis(5),
            ..RdcConfig::for_node(LinkAddr::new(3))
        };
        let timer = TokioTimer::new(tx, SystemClock::TICKS_PER_SECOND);
        Plb::new(config, ScriptedRadio::new(), SystemClock::new(), timer).unwrap()
    }

    #[tokio::test]
    async fn test_loop_cycles_and_dispatches() {
        crate::util::logging::init_for_tests();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut plb = driver(tx.clone());

        let feeder = tokio::spawn(async move {
            let beacon = frame_from(LinkAddr::new(4), LinkAddr::new(3), FrameType::BeaconDs, &[]);
            tx.send(HostEvent::Frame(Bytes::from(beacon))).unwrap();
            tokio::time::sleep(Duration::from_millis(40)).await;
            tx.send(HostEvent::Shutdown { keep_radio_on: false }).unwrap();
        });

        let handled = tokio_test::assert_ok!(run(&mut plb, rx).await);
        feeder.await.unwrap();

        assert!(handled >= 3, "only {} events handled", handled);
        assert!(!plb.is_on());
        assert!(!plb.radio().is_on());
        assert_eq!(plb.radio().sent_of_type(FrameType::BeaconDsAck), 1);
        // several ON phases powered the radio back up
        assert!(plb.radio().power_toggles().0 > 2);
    }

    #[tokio::test]
    async fn test_shutdown_completes_when_awaited_data_is_lost() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut plb = driver(tx.clone());
        let preamble = frame_from(LinkAddr::new(2), LinkAddr::new(3), FrameType::Preamble, &[]);
        tx.send(HostEvent::Frame(Bytes::from(preamble))).unwrap();
        tx.send(HostEvent::Shutdown { keep_radio_on: false }).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(2), run(&mut plb, rx)).await;
        let handled = tokio_test::assert_ok!(tokio_test::assert_ok!(finished));

        // the shutdown was deferred until the wait for DATA expired
        assert!(handled > 2, "only {} events handled", handled);
        assert!(!plb.is_on());
        assert!(!plb.radio().is_on());
        assert!(!plb.session().preamble_got);
    }

    #[tokio::test]
    async fn test_shutdown_can_leave_radio_on() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut plb = driver(tx.clone());
        tx.send(HostEvent::Shutdown { keep_radio_on: true }).unwrap();
        tokio_test::assert_ok!(run(&mut plb, rx).await);
        assert!(!plb.is_on());
        assert!(plb.radio().is_on());
    }
}
