//! A simulated air, over UDP on the loopback interface
//!
//! Every node binds one port in `base_port..base_port + nodes`. A broadcast
//! is one datagram to every other port in that range. Datagrams carry a COBS
//! framed `AirFrame`; receivers drop frames from other channels, and frames
//! addressed to someone else.
//!
//! The radio enforces regulatory range the way a real stack would: channel 14
//! is refused until a country permitting it has been set.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::vec::Vec;

use postcard::{from_bytes_cobs, to_stdvec_cobs};
use serde::{Deserialize, Serialize};

use crate::radio::{
    Channel, Country, FrameSink, MacAddress, PeerInfo, Radio, Role, DEFAULT_REGULATORY_RANGE,
    MAX_PAYLOAD_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirConfig {
    pub base_port: u16,
    pub nodes: u8,
}

impl AirConfig {
    pub const DEFAULT: AirConfig = AirConfig {
        base_port: 47100,
        nodes: 8,
    };

    /// Does every node's port fit in a `u16`?
    pub fn fits(&self) -> bool {
        self.base_port
            .checked_add(u16::from(self.nodes.saturating_sub(1)))
            .is_some()
    }

    fn addr(&self, node: u8) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.base_port + u16::from(node)))
    }
}

impl Default for AirConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One frame on the simulated air
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirFrame {
    pub channel: u8,
    pub src: MacAddress,
    pub dst: MacAddress,
    pub payload: Vec<u8>,
}

impl AirFrame {
    /// Would a station tuned to `channel` with address `mac` receive this?
    pub fn heard_by(&self, channel: Channel, mac: &MacAddress) -> bool {
        self.channel == channel.number()
            && self.src != *mac
            && (self.dst.is_broadcast() || self.dst == *mac)
    }
}

#[derive(Debug)]
pub enum Error {
    Io(ErrorKind),
    Encoding,
    InvalidNode(u8),
    PortRange,
    InvalidCountry,
    ChannelNotPermitted(u8),
    ChannelMismatch,
    NoChannel,
    NotInitialized,
    UnknownPeer,
    PeerExists,
    PayloadTooLarge(usize),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.kind())
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Hand one datagram to every node in `targets`
///
/// A node that can't be reached is logged and skipped. Fails only when no
/// node at all took the datagram.
fn fan_out<I, F>(targets: I, mut send: F) -> Result<usize>
where
    I: IntoIterator<Item = u8>,
    F: FnMut(u8) -> std::io::Result<()>,
{
    let mut reached = 0;
    let mut last_err = None;
    for node in targets {
        match send(node) {
            Ok(()) => reached += 1,
            Err(e) => {
                warn!("UDP send to node {} failed", node);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) if reached == 0 => Err(e.into()),
        _ => Ok(reached),
    }
}

pub struct UdpRadio {
    socket: UdpSocket,
    air: AirConfig,
    node: u8,
    mac: MacAddress,
    country: Option<Country>,
    channel: Option<Channel>,
    initialized: bool,
    role: Option<Role>,
    peers: Vec<PeerInfo>,
    sink: Option<FrameSink>,
}

impl UdpRadio {
    /// Join the default air as `node`
    pub fn bind(node: u8) -> Result<Self> {
        Self::bind_with(AirConfig::DEFAULT, node)
    }

    pub fn bind_with(air: AirConfig, node: u8) -> Result<Self> {
        if !air.fits() {
            return Err(Error::PortRange);
        }
        if node >= air.nodes {
            return Err(Error::InvalidNode(node));
        }

        let socket = UdpSocket::bind(air.addr(node))?;
        socket.set_nonblocking(true)?;

        Ok(UdpRadio {
            socket,
            air,
            node,
            mac: Self::node_mac(node),
            country: None,
            channel: None,
            initialized: false,
            role: None,
            peers: Vec::new(),
            sink: None,
        })
    }

    /// Locally administered address derived from the node index
    pub const fn node_mac(node: u8) -> MacAddress {
        MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, node])
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    fn permits(&self, channel: Channel) -> bool {
        match &self.country {
            Some(country) => country.permits(channel),
            None => DEFAULT_REGULATORY_RANGE.contains(&channel.number()),
        }
    }

    fn initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn receive_one(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv_from(buf) {
            Ok((n, _)) => Some(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(_) => {
                warn!("Node {}: UDP receive error", self.node);
                None
            }
        }
    }
}

impl Radio for UdpRadio {
    type Error = Error;

    fn set_country(&mut self, country: &Country) -> Result<()> {
        if !country.is_well_formed() {
            return Err(Error::InvalidCountry);
        }
        debug!(
            "Node {}: country {} channels {}..={}",
            self.node,
            country.code_str(),
            country.first_channel,
            country.last_channel()
        );
        self.country = Some(*country);
        Ok(())
    }

    fn set_channel(&mut self, channel: Channel) -> Result<()> {
        if !self.permits(channel) {
            return Err(Error::ChannelNotPermitted(channel.number()));
        }
        self.channel = Some(channel);
        Ok(())
    }

    fn init_protocol(&mut self) -> Result<()> {
        if self.channel.is_none() {
            return Err(Error::NoChannel);
        }
        self.initialized = true;
        Ok(())
    }

    fn set_role(&mut self, role: Role) -> Result<()> {
        self.initialized()?;
        self.role = Some(role);
        Ok(())
    }

    fn add_peer(&mut self, peer: &PeerInfo) -> Result<()> {
        self.initialized()?;
        if Some(peer.channel) != self.channel {
            return Err(Error::ChannelMismatch);
        }
        if self.peers.iter().any(|p| p.address == peer.address) {
            return Err(Error::PeerExists);
        }
        self.peers.push(*peer);
        Ok(())
    }

    fn register_receiver(&mut self, sink: FrameSink) -> Result<()> {
        self.initialized()?;
        self.sink = Some(sink);
        Ok(())
    }

    fn send(&mut self, dest: &MacAddress, payload: &[u8]) -> Result<()> {
        self.initialized()?;
        let channel = self.channel.ok_or(Error::NoChannel)?;

        if !self.peers.iter().any(|p| p.address == *dest) {
            return Err(Error::UnknownPeer);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge(payload.len()));
        }

        let frame = AirFrame {
            channel: channel.number(),
            src: self.mac,
            dst: *dest,
            payload: payload.to_vec(),
        };
        let datagram = to_stdvec_cobs(&frame).map_err(|_| Error::Encoding)?;

        let (socket, air, me) = (&self.socket, self.air, self.node);
        let reached = fan_out((0..air.nodes).filter(|n| *n != me), |node| {
            socket.send_to(&datagram, air.addr(node)).map(drop)
        })?;
        trace!("Node {}: frame handed to {} nodes", me, reached);
        Ok(())
    }

    fn service(&mut self) {
        let (channel, mac) = match (self.channel, self.sink.is_some()) {
            (Some(channel), true) => (channel, self.mac),
            _ => return,
        };

        let mut buf = [0u8; 1024];
        while let Some(n) = self.receive_one(&mut buf) {
            let frame = match from_bytes_cobs::<AirFrame>(&mut buf[..n]) {
                Ok(frame) => frame,
                Err(_) => {
                    warn!("Node {}: undecodable datagram, {} bytes", self.node, n);
                    continue;
                }
            };

            if !frame.heard_by(channel, &mac) {
                trace!("Node {}: ignoring frame on channel {}", self.node, frame.channel);
                continue;
            }

            if let Some(sink) = self.sink.as_mut() {
                sink.push(frame.src, &frame.payload);
            }
        }
    }
}
