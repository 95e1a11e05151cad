//! A recording radio for unit tests

use std::boxed::Box;
use std::vec::Vec;

use crate::bring_up::BringUpStep;
use crate::radio::{
    split_frame_queue, Channel, Country, FrameQueue, FrameSink, MacAddress, PeerInfo, Radio, Role,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetCountry(Country),
    SetChannel(u8),
    InitProtocol,
    SetRole(Role),
    AddPeer(PeerInfo),
    RegisterReceiver,
    Send(MacAddress, Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Default)]
pub struct MockRadio {
    pub calls: Vec<Call>,
    pub fail_at: Option<BringUpStep>,
    pub fail_prepare: bool,

    /// Sends fail while this is set
    pub fail_sends: bool,
    pub sink: Option<FrameSink>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(step: BringUpStep) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::default()
        }
    }

    /// A sink backed by a fresh, leaked queue
    pub fn sink() -> FrameSink {
        let queue: &'static mut FrameQueue = Box::leak(Box::new(FrameQueue::new()));
        split_frame_queue(queue).0
    }

    pub fn sent(&self) -> Vec<&[u8]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Send(_, data) => Some(data.as_slice()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, step: BringUpStep, call: Call) -> Result<(), MockError> {
        self.calls.push(call);
        if self.fail_at == Some(step) {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

impl Radio for MockRadio {
    type Error = MockError;

    fn prepare_interface(&mut self) -> Result<(), MockError> {
        if self.fail_prepare {
            Err(MockError)
        } else {
            Ok(())
        }
    }

    fn set_country(&mut self, country: &Country) -> Result<(), MockError> {
        self.record(BringUpStep::Region, Call::SetCountry(*country))
    }

    fn set_channel(&mut self, channel: Channel) -> Result<(), MockError> {
        self.record(BringUpStep::Channel, Call::SetChannel(channel.number()))
    }

    fn init_protocol(&mut self) -> Result<(), MockError> {
        self.record(BringUpStep::ProtocolInit, Call::InitProtocol)
    }

    fn set_role(&mut self, role: Role) -> Result<(), MockError> {
        self.record(BringUpStep::Role, Call::SetRole(role))
    }

    fn add_peer(&mut self, peer: &PeerInfo) -> Result<(), MockError> {
        self.record(BringUpStep::BroadcastPeer, Call::AddPeer(*peer))
    }

    fn register_receiver(&mut self, sink: FrameSink) -> Result<(), MockError> {
        self.sink = Some(sink);
        self.record(BringUpStep::Receiver, Call::RegisterReceiver)
    }

    fn send(&mut self, dest: &MacAddress, payload: &[u8]) -> Result<(), MockError> {
        self.calls.push(Call::Send(*dest, payload.to_vec()));
        if self.fail_sends {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}
