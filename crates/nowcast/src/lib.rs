//! # nowcast
//!
//! A connectionless broadcaster for ESP-NOW style radios.
//!
//! The crate brings a radio up in a fixed order, then sends a wrapping
//! counter to the broadcast address once per period, forever. Frames heard
//! from other stations are echoed to a diagnostics console as hex.
//!
//! The radio itself is abstracted by the [`Radio`] trait. Boards implement
//! it on top of their vendor stack; hosts can use the UDP-simulated air from
//! the `udp` feature.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod bring_up;
pub mod broadcaster;
pub mod config;
pub mod console;
pub mod led;
pub mod radio;

#[cfg(feature = "udp")]
pub mod udp;

#[cfg(test)]
mod mock;

pub use crate::{
    bring_up::{bring_up, fail, prepare_interface, report_failure, BringUpError, BringUpStep, Halt},
    broadcaster::{Broadcaster, Counter, SendStats},
    config::BeaconConfig,
    console::{Console, HexDump},
    led::StatusLed,
    radio::{
        split_frame_queue, Channel, Country, CountryPolicy, FrameDrain, FrameQueue, FrameSink,
        InboundFrame, MacAddress, PeerInfo, Radio, Role,
    },
};
