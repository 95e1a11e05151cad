//! Diagnostics console on UART0, transmit-only, 8N1

use esp_hal::{
    gpio::interconnect::PeripheralOutput,
    peripheral::Peripheral,
    uart::{Config, Error, Instance, UartTx},
    Blocking,
};
use nowcast::Console;

pub struct UartConsole<'d> {
    tx: UartTx<'d, Blocking>,
}

impl<'d> UartConsole<'d> {
    pub fn new<TX: PeripheralOutput>(
        uart: impl Peripheral<P = impl Instance> + 'd,
        tx: impl Peripheral<P = TX> + 'd,
        baudrate: u32,
    ) -> Result<Self, Error> {
        let config = Config::default().baudrate(baudrate);
        let tx = UartTx::new_with_config(uart, config, tx)?;
        Ok(Self { tx })
    }
}

impl core::fmt::Write for UartConsole<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        core::fmt::Write::write_str(&mut self.tx, s)
    }
}

impl Console for UartConsole<'_> {
    fn flush(&mut self) {
        let _ = embedded_io::Write::flush(&mut self.tx);
    }
}
