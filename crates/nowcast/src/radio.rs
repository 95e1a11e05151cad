//! The Radio Interface
//!
//! This module defines the `Radio` trait, the capability interface a
//! broadcaster needs from its wireless stack. There is one method per
//! bring-up step, plus `send` for the broadcast loop. Implementors may be:
//!
//! * A vendor ESP-NOW stack on a Wi-Fi microcontroller
//! * A simulated air over UDP on a host (see the `udp` feature)
//! * A recording test double
//!
//! Each method is a one-time, local configuration call. Implementors report
//! failure through `Self::Error`; the caller decides whether that failure is
//! fatal (bring-up) or merely logged (sending).

use core::fmt;
use core::ops::RangeInclusive;

use heapless::{
    spsc::{Consumer, Producer, Queue},
    Vec,
};

/// Largest payload carried by a single ESP-NOW frame
pub const MAX_PAYLOAD_LEN: usize = 250;

/// Number of slots in the inbound frame queue
///
/// The queue holds one less frame than this.
pub const FRAME_QUEUE_SLOTS: usize = 9;

/// Channels usable without an explicit country configuration
pub const DEFAULT_REGULATORY_RANGE: RangeInclusive<u8> = 1..=13;

/// Queue carrying frames from the radio context to the main loop
pub type FrameQueue = Queue<InboundFrame, FRAME_QUEUE_SLOTS>;

/// The main-loop half of a `FrameQueue`
pub type FrameDrain = Consumer<'static, InboundFrame, FRAME_QUEUE_SLOTS>;

/// A six byte hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// The reserved all-ones address, delivered to every listener
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

/// Formats as `AA-BB-CC-DD-EE-FF`
impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str("-")?;
            }
            write!(f, "{:02X}", octet)?;
        }
        Ok(())
    }
}

/// A Wi-Fi channel number, 1 through 14
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 14;

    pub const fn new(number: u8) -> Option<Self> {
        if number >= Self::MIN && number <= Self::MAX {
            Some(Self(number))
        } else {
            None
        }
    }

    pub const fn number(&self) -> u8 {
        self.0
    }

    /// Can this channel be used without configuring a country first?
    pub const fn in_default_range(&self) -> bool {
        self.0 >= *DEFAULT_REGULATORY_RANGE.start() && self.0 <= *DEFAULT_REGULATORY_RANGE.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CountryPolicy {
    /// Follow the country advertised by a connected access point
    Auto,

    /// Always use the configured channel range
    Manual,
}

/// Regulatory region metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Country {
    /// ISO 3166 alpha-2 code, e.g. `*b"JP"`
    pub code: [u8; 2],
    pub first_channel: u8,
    pub channel_count: u8,
    pub policy: CountryPolicy,
}

impl Country {
    /// Japan permits channel 14
    pub const JAPAN: Country = Country {
        code: *b"JP",
        first_channel: 1,
        channel_count: 14,
        policy: CountryPolicy::Manual,
    };

    /// The last channel this region permits
    pub const fn last_channel(&self) -> u8 {
        self.first_channel.saturating_add(self.channel_count).saturating_sub(1)
    }

    pub const fn permits(&self, channel: Channel) -> bool {
        self.channel_count > 0
            && channel.number() >= self.first_channel
            && channel.number() <= self.last_channel()
    }

    /// Is this a range a radio could actually be configured with?
    pub const fn is_well_formed(&self) -> bool {
        self.first_channel >= Channel::MIN
            && self.channel_count > 0
            && self.last_channel() <= Channel::MAX
    }

    pub fn code_str(&self) -> &str {
        core::str::from_utf8(&self.code).unwrap_or("??")
    }
}

/// The protocol role a station registers as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    Idle,
    Controller,
    Slave,
    /// Both sends and receives
    Combo,
}

/// A peer registered with the protocol stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerInfo {
    pub address: MacAddress,
    pub role: Role,
    pub channel: Channel,

    /// Local master key, `None` for unencrypted peers
    pub key: Option<[u8; 16]>,
}

impl PeerInfo {
    /// The unencrypted all-listeners peer on `channel`
    pub const fn broadcast(channel: Channel) -> Self {
        Self {
            address: MacAddress::BROADCAST,
            role: Role::Combo,
            channel,
            key: None,
        }
    }
}

/// A frame received from another station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub src: MacAddress,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundFrame {
    /// Returns `None` if `data` is longer than `MAX_PAYLOAD_LEN`
    pub fn new(src: MacAddress, data: &[u8]) -> Option<Self> {
        Vec::from_slice(data)
            .ok()
            .map(|payload| InboundFrame { src, payload })
    }
}

/// The radio-side half of a `FrameQueue`
///
/// Handed to the radio at bring-up. Frames that don't fit are dropped and
/// counted, never blocked on.
pub struct FrameSink {
    producer: Producer<'static, InboundFrame, FRAME_QUEUE_SLOTS>,
    dropped: u32,
}

impl FrameSink {
    pub fn new(producer: Producer<'static, InboundFrame, FRAME_QUEUE_SLOTS>) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Enqueue one received frame, returning `false` if it was dropped
    pub fn push(&mut self, src: MacAddress, data: &[u8]) -> bool {
        let frame = match InboundFrame::new(src, data) {
            Some(frame) => frame,
            None => {
                self.dropped = self.dropped.saturating_add(1);
                warn!("Oversized frame dropped: {} bytes", data.len());
                return false;
            }
        };

        match self.producer.enqueue(frame) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!("Inbound queue full, {} frames dropped", self.dropped);
                false
            }
        }
    }

    /// Frames dropped since creation
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Split a statically allocated queue into its radio and main-loop halves
pub fn split_frame_queue(queue: &'static mut FrameQueue) -> (FrameSink, FrameDrain) {
    let (producer, consumer) = queue.split();
    (FrameSink::new(producer), consumer)
}

/// A trait for defining the wireless stack used by a broadcaster
pub trait Radio {
    type Error: fmt::Debug;

    /// Put the interface into a mode the broadcast protocol can use
    ///
    /// Failure here is reported but not fatal.
    fn prepare_interface(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Apply regulatory region metadata
    fn set_country(&mut self, country: &Country) -> Result<(), Self::Error>;

    /// Tune the radio to `channel`
    fn set_channel(&mut self, channel: Channel) -> Result<(), Self::Error>;

    /// Start the broadcast protocol on top of the tuned radio
    fn init_protocol(&mut self) -> Result<(), Self::Error>;

    fn set_role(&mut self, role: Role) -> Result<(), Self::Error>;

    fn add_peer(&mut self, peer: &PeerInfo) -> Result<(), Self::Error>;

    /// Register where received frames go
    ///
    /// The radio must only ever `push` into the sink; it must not block.
    fn register_receiver(&mut self, sink: FrameSink) -> Result<(), Self::Error>;

    /// Transmit one frame. Delivery is not confirmed.
    fn send(&mut self, dest: &MacAddress, payload: &[u8]) -> Result<(), Self::Error>;

    /// Move pending received frames into the registered sink
    ///
    /// Stacks that deliver from their own interrupt context can leave this
    /// empty.
    fn service(&mut self) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use std::boxed::Box;
    use std::format;

    #[test]
    fn mac_display() {
        let mac = MacAddress::new([0xAA, 0xBB, 0x0C, 0x01, 0x00, 0xFF]);
        assert_eq!(format!("{}", mac), "AA-BB-0C-01-00-FF");
        assert_eq!(format!("{}", MacAddress::BROADCAST), "FF-FF-FF-FF-FF-FF");
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!mac.is_broadcast());
    }

    #[test]
    fn channel_bounds() {
        assert!(Channel::new(0).is_none());
        assert!(Channel::new(15).is_none());
        assert_eq!(Channel::new(1).map(|c| c.number()), Some(1));

        assert!(Channel::new(6).unwrap().in_default_range());
        assert!(Channel::new(13).unwrap().in_default_range());
        assert!(!Channel::new(14).unwrap().in_default_range());
    }

    #[test]
    fn country_ranges() {
        let ch14 = Channel::new(14).unwrap();
        assert_eq!(Country::JAPAN.last_channel(), 14);
        assert!(Country::JAPAN.permits(ch14));
        assert!(Country::JAPAN.is_well_formed());
        assert_eq!(Country::JAPAN.code_str(), "JP");

        let us = Country {
            code: *b"US",
            first_channel: 1,
            channel_count: 11,
            policy: CountryPolicy::Manual,
        };
        assert!(!us.permits(ch14));
        assert!(us.permits(Channel::new(11).unwrap()));

        let bogus = Country {
            channel_count: 20,
            ..Country::JAPAN
        };
        assert!(!bogus.is_well_formed());
    }

    #[test]
    fn broadcast_peer() {
        let ch = Channel::new(14).unwrap();
        let peer = PeerInfo::broadcast(ch);
        assert_eq!(peer.address.octets(), [0xFF; 6]);
        assert_eq!(peer.channel, ch);
        assert_eq!(peer.role, Role::Combo);
        assert!(peer.key.is_none());
    }

    #[test]
    fn sink_drops_when_full() {
        let queue: &'static mut FrameQueue = Box::leak(Box::new(FrameQueue::new()));
        let (mut sink, mut drain) = split_frame_queue(queue);
        let src = MacAddress::new([1, 2, 3, 4, 5, 6]);

        for i in 0..(FRAME_QUEUE_SLOTS - 1) {
            assert!(sink.push(src, &[i as u8]));
        }
        assert!(!sink.push(src, &[0xEE]));
        assert_eq!(sink.dropped(), 1);

        let first = drain.dequeue().unwrap();
        assert_eq!(first.src, src);
        assert_eq!(&first.payload[..], &[0]);

        // One slot freed
        assert!(sink.push(src, &[0xEE]));
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn sink_rejects_oversized() {
        let queue: &'static mut FrameQueue = Box::leak(Box::new(FrameQueue::new()));
        let (mut sink, mut drain) = split_frame_queue(queue);

        let big = [0u8; MAX_PAYLOAD_LEN + 1];
        assert!(!sink.push(MacAddress::BROADCAST, &big));
        assert_eq!(sink.dropped(), 1);
        assert!(drain.dequeue().is_none());

        let max = [0u8; MAX_PAYLOAD_LEN];
        assert!(sink.push(MacAddress::BROADCAST, &max));
        assert_eq!(drain.dequeue().unwrap().payload.len(), MAX_PAYLOAD_LEN);
    }
}
