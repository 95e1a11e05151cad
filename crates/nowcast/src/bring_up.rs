//! Ordered radio bring-up
//!
//! One pass, strictly in order, no retries:
//!
//! 1. region (only for channels outside the default regulatory range)
//! 2. channel
//! 3. protocol init
//! 4. role
//! 5. broadcast peer
//! 6. receive sink
//!
//! The first failing step stops the sequence. Bring-up is not idempotent;
//! run it once per boot.

use core::fmt;

use crate::{
    config::BeaconConfig,
    console::{line, Console},
    radio::{FrameSink, PeerInfo, Radio, Role},
};

/// The steps of `bring_up`, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpStep {
    Region,
    Channel,
    ProtocolInit,
    Role,
    BroadcastPeer,
    Receiver,
}

impl BringUpStep {
    /// Name of the radio call made by this step
    pub const fn call(&self) -> &'static str {
        match self {
            BringUpStep::Region => "wifi_set_country()",
            BringUpStep::Channel => "wifi_set_channel()",
            BringUpStep::ProtocolInit => "esp_now_init()",
            BringUpStep::Role => "esp_now_set_self_role()",
            BringUpStep::BroadcastPeer => "esp_now_add_peer()",
            BringUpStep::Receiver => "esp_now_register_recv_cb()",
        }
    }
}

/// A bring-up step failed; nothing after it ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpError<E> {
    pub step: BringUpStep,
    pub source: E,
}

impl<E> fmt::Display for BringUpError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fail!", self.step.call())
    }
}

/// A terminal state the device never leaves
pub trait Halt {
    fn halt(&mut self) -> !;
}

fn attempt<E>(step: BringUpStep, res: Result<(), E>) -> Result<(), BringUpError<E>> {
    match res {
        Ok(()) => {
            debug!("Bring-up: {:?} ok", step);
            Ok(())
        }
        Err(source) => {
            error!("Bring-up: {:?} failed", step);
            Err(BringUpError { step, source })
        }
    }
}

/// Put the interface in a usable mode. Failure is printed, then ignored.
pub fn prepare_interface<R: Radio, C: Console>(radio: &mut R, console: &mut C) {
    if radio.prepare_interface().is_err() {
        warn!("Interface preparation failed, continuing");
        line(console, format_args!("AP disconnect fail!"));
    }
}

/// Run the ordered bring-up sequence
pub fn bring_up<R: Radio>(
    radio: &mut R,
    config: &BeaconConfig,
    sink: FrameSink,
) -> Result<(), BringUpError<R::Error>> {
    let channel = config.channel;

    if config.needs_region() {
        info!("Channel {} needs a region, applying it", channel.number());
        attempt(BringUpStep::Region, radio.set_country(&config.country))?;
    }

    attempt(BringUpStep::Channel, radio.set_channel(channel))?;
    attempt(BringUpStep::ProtocolInit, radio.init_protocol())?;
    attempt(BringUpStep::Role, radio.set_role(Role::Combo))?;
    attempt(
        BringUpStep::BroadcastPeer,
        radio.add_peer(&PeerInfo::broadcast(channel)),
    )?;
    attempt(BringUpStep::Receiver, radio.register_receiver(sink))?;

    info!("Bring-up complete on channel {}", channel.number());
    Ok(())
}

/// Print the failing step and the overall failure, then flush
pub fn report_failure<C: Console, E>(console: &mut C, err: &BringUpError<E>) {
    line(console, format_args!("{}", err));
    line(console, format_args!("ESP-NOW initialization fail!"));
    console.flush();
}

/// Report a failed bring-up and never return
pub fn fail<C: Console, E, H: Halt>(console: &mut C, err: &BringUpError<E>, halt: &mut H) -> ! {
    report_failure(console, err);
    halt.halt()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::test_console::RecordingConsole;
    use crate::mock::{Call, MockRadio, MockError};
    use crate::radio::{Channel, MacAddress};
    use std::format;
    use std::vec;

    #[test]
    fn channel_14_configures_region_first() {
        let mut radio = MockRadio::new();
        let cfg = BeaconConfig::DEFAULT;

        bring_up(&mut radio, &cfg, MockRadio::sink()).unwrap();

        assert_eq!(
            radio.calls,
            vec![
                Call::SetCountry(cfg.country),
                Call::SetChannel(14),
                Call::InitProtocol,
                Call::SetRole(Role::Combo),
                Call::AddPeer(PeerInfo::broadcast(cfg.channel)),
                Call::RegisterReceiver,
            ]
        );
    }

    #[test]
    fn channel_6_skips_region() {
        let mut radio = MockRadio::new();
        let cfg = BeaconConfig::DEFAULT.with_channel(Channel::new(6).unwrap());

        bring_up(&mut radio, &cfg, MockRadio::sink()).unwrap();

        assert!(!radio.calls.iter().any(|c| matches!(c, Call::SetCountry(_))));
        assert_eq!(radio.calls[0], Call::SetChannel(6));
        assert_eq!(radio.calls.len(), 5);
    }

    #[test]
    fn failure_stops_later_steps() {
        let steps = [
            BringUpStep::Region,
            BringUpStep::Channel,
            BringUpStep::ProtocolInit,
            BringUpStep::Role,
            BringUpStep::BroadcastPeer,
            BringUpStep::Receiver,
        ];

        for (idx, step) in steps.iter().enumerate() {
            let mut radio = MockRadio::failing_at(*step);
            let err = bring_up(&mut radio, &BeaconConfig::DEFAULT, MockRadio::sink()).unwrap_err();

            assert_eq!(err.step, *step);
            assert_eq!(err.source, MockError);
            // The failing call was made, nothing after it
            assert_eq!(radio.calls.len(), idx + 1, "failing at {:?}", step);
        }
    }

    #[test]
    fn peer_is_broadcast_on_configured_channel() {
        let mut radio = MockRadio::new();
        let cfg = BeaconConfig::DEFAULT.with_channel(Channel::new(1).unwrap());
        bring_up(&mut radio, &cfg, MockRadio::sink()).unwrap();

        let peer = radio
            .calls
            .iter()
            .find_map(|c| match c {
                Call::AddPeer(p) => Some(*p),
                _ => None,
            })
            .unwrap();
        assert_eq!(peer.address, MacAddress::BROADCAST);
        assert_eq!(peer.channel.number(), 1);
    }

    #[test]
    fn failure_report() {
        let mut console = RecordingConsole::default();
        let err = BringUpError {
            step: BringUpStep::Role,
            source: MockError,
        };

        assert_eq!(format!("{}", err), "esp_now_set_self_role() fail!");
        report_failure(&mut console, &err);

        assert_eq!(
            console.lines(),
            ["esp_now_set_self_role() fail!", "ESP-NOW initialization fail!"]
        );
        assert_eq!(console.flushes, 1);
    }

    #[test]
    fn interface_failure_is_not_fatal() {
        let mut radio = MockRadio::new();
        radio.fail_prepare = true;
        let mut console = RecordingConsole::default();

        prepare_interface(&mut radio, &mut console);
        assert_eq!(console.lines(), ["AP disconnect fail!"]);

        bring_up(&mut radio, &BeaconConfig::DEFAULT, MockRadio::sink()).unwrap();
    }
}
