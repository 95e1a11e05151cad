//! The broadcast loop
//!
//! Fire-and-forget, at-most-once: every period the current counter goes out
//! to the broadcast address, whatever happened to the previous one. A failed
//! send is printed and counted; it never changes the cadence.

use core::fmt::Write;

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use heapless::String;

use crate::{
    config::BeaconConfig,
    console::{line, print_frame, Console},
    led::StatusLed,
    radio::{FrameDrain, MacAddress, Radio},
};

/// Longest payload a `Counter` renders to ("255")
pub const COUNTER_PAYLOAD_LEN: usize = 3;

/// A counter that wraps silently from 255 to 0
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counter(u8);

impl Counter {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Advance, returning the value before the increment
    pub fn advance(&mut self) -> u8 {
        let old = self.0;
        self.0 = self.0.wrapping_add(1);
        old
    }

    /// Unsigned decimal, no padding, no leading zeros
    pub fn payload(&self) -> String<COUNTER_PAYLOAD_LEN> {
        let mut out = String::new();
        // A u8 never needs more than three digits
        let _ = write!(out, "{}", self.0);
        out
    }
}

/// Send outcome bookkeeping, for diagnostics only
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendStats {
    pub sent: u32,
    pub failed: u32,

    /// Failures since the last successful send
    pub consecutive_failures: u32,
}

impl SendStats {
    fn record_success(&mut self) {
        self.sent = self.sent.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self) {
        self.failed = self.failed.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// All state carried from one broadcast to the next
pub struct Broadcaster {
    config: BeaconConfig,
    counter: Counter,
    stats: SendStats,
    inbound: FrameDrain,
}

impl Broadcaster {
    pub fn new(config: BeaconConfig, inbound: FrameDrain) -> Self {
        Self {
            config,
            counter: Counter::default(),
            stats: SendStats::default(),
            inbound,
        }
    }

    pub fn counter(&self) -> Counter {
        self.counter
    }

    pub fn stats(&self) -> SendStats {
        self.stats
    }

    /// Print every frame received since the last call
    pub fn drain_inbound<C: Console>(&mut self, console: &mut C) -> usize {
        let mut count = 0;
        while let Some(frame) = self.inbound.dequeue() {
            print_frame(console, &frame);
            count += 1;
        }
        count
    }

    /// Broadcast the current counter and advance it
    ///
    /// Returns whether the radio accepted the frame.
    pub fn broadcast<R: Radio, C: Console>(&mut self, radio: &mut R, console: &mut C) -> bool {
        let payload = self.counter.payload();
        let value = self.counter.advance();

        match radio.send(&MacAddress::BROADCAST, payload.as_bytes()) {
            Ok(()) => {
                trace!("Sent {}", value);
                self.stats.record_success();
                true
            }
            Err(_) => {
                self.stats.record_failure();
                warn!(
                    "Send of {} failed, {} in a row",
                    value, self.stats.consecutive_failures
                );
                line(console, format_args!("ESP-NOW sending fail!"));
                false
            }
        }
    }

    /// One full period: drain, send, blink, sleep
    pub fn step<R, P, D, C>(
        &mut self,
        radio: &mut R,
        led: &mut StatusLed<P>,
        delay: &mut D,
        console: &mut C,
    ) where
        R: Radio,
        P: OutputPin,
        D: DelayNs,
        C: Console,
    {
        radio.service();
        self.drain_inbound(console);
        self.broadcast(radio, console);

        led.on();
        delay.delay_ms(self.config.led_on_ms);
        led.off();
        delay.delay_ms(self.config.led_off_ms());
    }

    /// Broadcast forever
    pub fn run<R, P, D, C>(
        mut self,
        radio: &mut R,
        led: &mut StatusLed<P>,
        delay: &mut D,
        console: &mut C,
    ) -> !
    where
        R: Radio,
        P: OutputPin,
        D: DelayNs,
        C: Console,
    {
        info!("Broadcasting every {} ms", self.config.period_ms);
        loop {
            self.step(radio, led, delay, console);
        }
    }
}
