#![no_std]

use esp_backtrace as _; // panicking-behavior
use esp_println as _; // global logger

pub mod console;
pub mod esp_now_radio;

use esp_hal::rtc_cntl::Rtc;
use nowcast::Halt;

defmt::timestamp!(
    "{=u64:us}",
    esp_hal::time::now().duration_since_epoch().to_micros()
);

/// Deep sleep with no wake source; only a reset brings the board back
pub struct DeepSleep<'d>(pub Rtc<'d>);

impl Halt for DeepSleep<'_> {
    fn halt(&mut self) -> ! {
        defmt::info!("Entering deep sleep");
        self.0.sleep_deep(&[])
    }
}
