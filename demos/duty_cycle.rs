//! Runs one node against a scripted neighbor for half a second.
//!
//! `RUST_LOG=plb_rdc=debug cargo run --example duty_cycle`

use std::time::Duration;

use bytes::Bytes;
use plb_rdc::core::{FrameType, LinkAddr, RdcConfig};
use plb_rdc::host::{self, HostEvent, TokioTimer};
use plb_rdc::mac::{OutgoingPacket, Plb};
use plb_rdc::sim::{ack_frame, frame_from, RecordingUpper, ScriptedRadio};
use plb_rdc::time::SystemClock;
use plb_rdc::util::logging;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> plb_rdc::Result<()> {
    logging::init();

    let me = LinkAddr::new(2);
    let config = RdcConfig {
        strobe_num_max: 10,
        pre_data_delay: Duration::from_millis(20),
        ..RdcConfig::for_node(me)
    };

    // Both neighbors ack every request on the third strobe
    let mut strobes = 0u32;
    let radio = ScriptedRadio::new()
        .with_responder(move |frame: &[u8]| {
            strobes += 1;
            let request = FrameType::from_tag(frame[4])?;
            let ack = request.ack()?;
            (strobes % 3 == 0 || request == FrameType::Data).then(|| ack_frame(frame, ack))
        })
        .with_loss(0.1, 7);

    let (tx, rx) = mpsc::unbounded_channel();
    let timer = TokioTimer::new(tx.clone(), SystemClock::TICKS_PER_SECOND);
    let upper = RecordingUpper::default();
    let mut driver = Plb::new(config, radio, SystemClock::new(), timer)?
        .with_upper_layer(Box::new(upper.clone()));

    driver.send(
        OutgoingPacket::data(Bytes::from_static(b"temperature=21.5")),
        Box::new(|status, transmissions| println!("send complete: {:?} after {} tx", status, transmissions)),
    );

    tokio::spawn(async move {
        let prev = LinkAddr::new(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = tx.send(HostEvent::Frame(Bytes::from(frame_from(prev, me, FrameType::Preamble, &[]))));
        let _ = tx.send(HostEvent::Frame(Bytes::from(frame_from(prev, me, FrameType::Data, b"upstream"))));
        tokio::time::sleep(Duration::from_millis(350)).await;
        let _ = tx.send(HostEvent::Shutdown { keep_radio_on: false });
    });

    let handled = host::run(&mut driver, rx).await?;

    println!("events handled: {}", handled);
    println!("frames sent: {}", driver.radio().sent().len());
    for delivery in upper.deliveries() {
        println!(
            "delivered {} from {}: {}",
            delivery.frame_type,
            delivery.sender,
            String::from_utf8_lossy(&delivery.payload)
        );
    }
    if let Ok(json) = serde_json::to_string_pretty(&driver.state_info()) {
        println!("{}", json);
    }
    Ok(())
}
