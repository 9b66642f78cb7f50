//! Inbound commands to the control loop.
//!
//! A command is a bare servo angle.  BLE centrals write it as ASCII
//! decimal text; the proximity logic posts it directly.

/// Which producer wrote a command into the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandSource {
    /// A BLE central wrote the command characteristic.
    #[default]
    Wireless,
    /// The control loop's proximity arbitration.
    Proximity,
}

/// Parse a BLE write payload as a base-10 integer, C `atoi` style.
///
/// Leading ASCII whitespace is skipped, one optional sign is accepted,
/// then the longest run of digits is consumed.  Anything that does not
/// start with a number parses to `0`; trailing garbage is ignored.
/// Values outside `i16` saturate.
pub fn parse_command(raw: &[u8]) -> i16 {
    let mut bytes = raw
        .iter()
        .copied()
        .skip_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let mut magnitude: i32 = 0;
    for digit in bytes.take_while(u8::is_ascii_digit) {
        magnitude = magnitude
            .saturating_mul(10)
            .saturating_add(i32::from(digit - b'0'));
    }

    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
