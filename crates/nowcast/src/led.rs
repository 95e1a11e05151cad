//! Status LED, blinked once per broadcast

use embedded_hal::digital::OutputPin;

/// A status LED with configurable polarity
pub struct StatusLed<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Takes ownership of `pin` and switches the LED off
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self { pin, active_low };
        led.off();
        led
    }

    pub fn on(&mut self) {
        let _ = if self.active_low {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
    }

    pub fn off(&mut self) {
        let _ = if self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
pub(crate) mod test_pin {
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorType, OutputPin};
    use std::vec::Vec;

    /// Remembers every level it was driven to, `true` meaning high
    #[derive(Debug, Default)]
    pub struct RecordingPin {
        pub levels: Vec<bool>,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.levels.push(true);
            Ok(())
        }
    }
}
