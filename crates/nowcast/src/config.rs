//! Compile-time configuration
//!
//! There are no configuration files, environment variables or command-line
//! flags on the device. Everything a broadcaster needs is fixed at build
//! time in `BeaconConfig::DEFAULT`, and checked by `const` assertions below.

use crate::radio::{Channel, Country};

/// Raw constants, kept together so a board can see them at a glance
pub mod consts {
    /// Wi-Fi channel the broadcaster transmits on
    pub const ESP_NOW_CHANNEL: u8 = 14;

    /// Time between successive broadcasts
    pub const PERIOD_MS: u32 = 500;

    /// How long the status LED stays lit per broadcast
    pub const LED_ON_MS: u32 = 25;

    /// The status LED lights when its pin is driven low
    pub const LED_ACTIVE_LOW: bool = true;

    /// Diagnostics console speed, 8N1
    pub const CONSOLE_BAUD: u32 = 115_200;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BeaconConfig {
    pub channel: Channel,

    /// Applied only when `channel` is outside the default regulatory range
    pub country: Country,

    pub period_ms: u32,
    pub led_on_ms: u32,
    pub led_active_low: bool,
    pub console_baud: u32,
}

impl BeaconConfig {
    pub const DEFAULT: BeaconConfig = BeaconConfig {
        channel: match Channel::new(consts::ESP_NOW_CHANNEL) {
            Some(channel) => channel,
            None => panic!("ESP_NOW_CHANNEL must be 1..=14"),
        },
        country: Country::JAPAN,
        period_ms: consts::PERIOD_MS,
        led_on_ms: consts::LED_ON_MS,
        led_active_low: consts::LED_ACTIVE_LOW,
        console_baud: consts::CONSOLE_BAUD,
    };

    /// Same as `DEFAULT`, on another channel
    pub const fn with_channel(self, channel: Channel) -> Self {
        BeaconConfig { channel, ..self }
    }

    /// Does bring-up need to configure a country before tuning?
    pub const fn needs_region(&self) -> bool {
        !self.channel.in_default_range()
    }

    /// Time the LED stays dark for the rest of each period
    pub const fn led_off_ms(&self) -> u32 {
        self.period_ms.saturating_sub(self.led_on_ms)
    }

    pub const fn is_valid(&self) -> bool {
        self.period_ms > 0
            && self.led_on_ms < self.period_ms
            && self.console_baud > 0
            && (!self.needs_region()
                || (self.country.is_well_formed() && self.country.permits(self.channel)))
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[allow(unused)]
mod validation {
    use super::*;

    const _: () = assert!(BeaconConfig::DEFAULT.is_valid(), "Invalid default configuration");
    const _: () = assert!(consts::LED_ON_MS >= 1, "LED blink too short to see");
    const _: () = assert!(consts::PERIOD_MS >= 10, "Broadcast period too short");
}
