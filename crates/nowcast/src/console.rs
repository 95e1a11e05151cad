//! Diagnostics console
//!
//! Human-readable, line oriented, transmit-only. Nothing here is meant to be
//! parsed by a machine.

use core::fmt::{self, Write};

use crate::radio::InboundFrame;

/// A text sink for diagnostic lines
pub trait Console: Write {
    /// Block until everything written so far has left the device
    fn flush(&mut self) {}
}

/// Formats bytes as uppercase hex pairs separated by single spaces
///
/// `[0x0A, 0xFF]` renders as `0A FF`. An empty slice renders as nothing.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.0.iter();
        if let Some(first) = bytes.next() {
            write!(f, "{:02X}", first)?;
            for byte in bytes {
                write!(f, " {:02X}", byte)?;
            }
        }
        Ok(())
    }
}

/// Write one diagnostic line, ignoring transport errors
pub fn line<C: Console>(console: &mut C, args: fmt::Arguments<'_>) {
    let _ = console.write_fmt(args);
    let _ = console.write_str("\r\n");
}

/// Echo a received frame as `ESP-NOW packet from <mac>: <hex>`
pub fn print_frame<C: Console>(console: &mut C, frame: &InboundFrame) {
    trace!("Inbound frame: {} bytes", frame.payload.len());
    line(
        console,
        format_args!(
            "ESP-NOW packet from {}: {}",
            frame.src,
            HexDump(&frame.payload)
        ),
    );
}

#[cfg(feature = "std")]
mod std_console {
    use super::Console;
    use std::io::Write as _;

    /// Console writing to the process' standard output
    #[derive(Debug, Default)]
    pub struct StdoutConsole;

    impl core::fmt::Write for StdoutConsole {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            std::io::stdout()
                .write_all(s.as_bytes())
                .map_err(|_| core::fmt::Error)
        }
    }

    impl Console for StdoutConsole {
        fn flush(&mut self) {
            let _ = std::io::stdout().flush();
        }
    }
}

#[cfg(feature = "std")]
pub use std_console::StdoutConsole;


#[cfg(test)]
mod test {
    use super::test_console::RecordingConsole;
    use super::*;
    use crate::radio::MacAddress;
    use std::format;

    #[test]
    fn hex_dump_format() {
        assert_eq!(format!("{}", HexDump(&[0x0A, 0xFF])), "0A FF");
        assert_eq!(format!("{}", HexDump(&[0x00])), "00");
        assert_eq!(format!("{}", HexDump(&[] as &[u8])), "");
        assert_eq!(
            format!("{}", HexDump(&[0xde, 0xad, 0xbe, 0xef])),
            "DE AD BE EF"
        );
    }

    #[test]
    fn frame_echo() {
        let mut console = RecordingConsole::default();
        let frame = InboundFrame::new(
            MacAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x01, 0x7F]),
            b"42",
        )
        .unwrap();

        print_frame(&mut console, &frame);
        assert_eq!(
            console.text,
            "ESP-NOW packet from 24-0A-C4-00-01-7F: 34 32\r\n"
        );
    }

    #[test]
    fn empty_frame_echo() {
        let mut console = RecordingConsole::default();
        let frame = InboundFrame::new(MacAddress::BROADCAST, &[]).unwrap();

        print_frame(&mut console, &frame);
        assert_eq!(
            console.lines(),
            ["ESP-NOW packet from FF-FF-FF-FF-FF-FF: "]
        );
    }
}
