//! Runs the broadcaster against the UDP-simulated air
//!
//! Start a few of these with different node indices (0..8) and each will
//! echo the others' counters:
//!
//! ```text
//! cargo run -p broadcaster-udp -- 0
//! cargo run -p broadcaster-udp -- 1
//! ```
//!
//! Set `RUST_LOG=debug` for bring-up detail.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use tracing_subscriber::EnvFilter;

use nowcast::{
    bring_up, console::StdoutConsole, fail, prepare_interface, split_frame_queue, udp::UdpRadio,
    BeaconConfig, Broadcaster, FrameQueue, Halt, StatusLed,
};

struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// Stands in for the board LED; traces level changes
struct TraceLed;

impl ErrorType for TraceLed {
    type Error = core::convert::Infallible;
}

impl OutputPin for TraceLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        tracing::trace!("LED pin low");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        tracing::trace!("LED pin high");
        Ok(())
    }
}

struct Exit;

impl Halt for Exit {
    fn halt(&mut self) -> ! {
        std::process::exit(1)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let node = match std::env::args().nth(1).map(|arg| arg.parse::<u8>()) {
        None => 0,
        Some(Ok(node)) => node,
        Some(Err(_)) => {
            eprintln!("usage: broadcaster-udp [NODE]");
            std::process::exit(2);
        }
    };

    let mut console = StdoutConsole;
    println!();

    let cfg = BeaconConfig::DEFAULT;
    let mut led = StatusLed::new(TraceLed, cfg.led_active_low);

    let mut radio = match UdpRadio::bind(node) {
        Ok(radio) => radio,
        Err(e) => {
            tracing::error!("Could not join the air as node {}: {:?}", node, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Node {} is {}", node, radio.mac());

    let queue: &'static mut FrameQueue = Box::leak(Box::new(FrameQueue::new()));
    let (sink, drain) = split_frame_queue(queue);

    prepare_interface(&mut radio, &mut console);
    if let Err(e) = bring_up(&mut radio, &cfg, sink) {
        tracing::error!("Bring-up failed at {:?}: {:?}", e.step, e.source);
        fail(&mut console, &e, &mut Exit);
    }

    Broadcaster::new(cfg, drain).run(&mut radio, &mut led, &mut ThreadDelay, &mut console)
}
