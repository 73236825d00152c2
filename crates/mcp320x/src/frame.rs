use crate::{Input, MAX_CODE};

/// Start bit, preceded by five zero bits so every frame takes the same time to clock out.
const START: u16 = 0b0000_0100_0000_0000;

/// Offset of the selection pattern within a command frame.
const PATTERN_SHIFT: u16 = 6;

/// Builds the 16 bit command frame selecting `channel`.
///
/// ```text
/// 0 0 0 0 0 S M D2 | D1 D0 x x x x x x
/// ```
///
/// `S` is the start bit, `M` selects single ended (1) or differential (0)
/// input and `D2..D0` the channel. The chip samples during the clock after
/// `D0`, answers with a null bit and then the 12 result bits.
pub fn command<CH: Input>(channel: CH) -> u16 {
    START | (u16::from(channel.pattern() & 0b1111) << PATTERN_SHIFT)
}

/// Extracts the conversion result from a 16 bit response.
///
/// The response is read from the second and third byte of a transaction.
/// Its upper three bits are undefined and bit 12 is the null bit.
pub fn decode(response: u16) -> u16 {
    response & MAX_CODE
}

/// Bytes clocked out for one conversion: the command frame followed by a
/// padding byte while the low result bits are clocked in.
pub(crate) fn outgoing(frame: u16) -> [u8; 3] {
    let [high, low] = frame.to_be_bytes();

    [high, low, 0b0000_0000]
}

/// Response word held in the last two bytes of a transaction.
pub(crate) fn incoming(buffer: [u8; 3]) -> u16 {
    u16::from_be_bytes([buffer[1], buffer[2]])
}
