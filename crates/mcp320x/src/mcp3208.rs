//! MCP3208: eight inputs, usable as eight single ended channels referenced
//! to analog ground or as four differential pairs of selectable polarity.

use crate::Mcp320x;

/// MCP3208 driver
pub type Mcp3208<SPI, TIM> = Mcp320x<SPI, TIM, Channel>;

crate::channels! {
    /// Channel list for MCP3208
    ///
    /// Each variant is the 4 bit selection pattern `{single/diff, d2, d1, d0}`.
    Channel {
        /// single channel 0
        Single0 = 0b1000 => "single0",
        /// single channel 1
        Single1 = 0b1001 => "single1",
        /// single channel 2
        Single2 = 0b1010 => "single2",
        /// single channel 3
        Single3 = 0b1011 => "single3",
        /// single channel 4
        Single4 = 0b1100 => "single4",
        /// single channel 5
        Single5 = 0b1101 => "single5",
        /// single channel 6
        Single6 = 0b1110 => "single6",
        /// single channel 7
        Single7 = 0b1111 => "single7",
        /// differential pair 0, input 0 positive, input 1 negative
        Diff0Pn = 0b0000 => "diff0pn",
        /// differential pair 0, input 0 negative, input 1 positive
        Diff0Np = 0b0001 => "diff0np",
        /// differential pair 1, input 2 positive, input 3 negative
        Diff1Pn = 0b0010 => "diff1pn",
        /// differential pair 1, input 2 negative, input 3 positive
        Diff1Np = 0b0011 => "diff1np",
        /// differential pair 2, input 4 positive, input 5 negative
        Diff2Pn = 0b0100 => "diff2pn",
        /// differential pair 2, input 4 negative, input 5 positive
        Diff2Np = 0b0101 => "diff2np",
        /// differential pair 3, input 6 positive, input 7 negative
        Diff3Pn = 0b0110 => "diff3pn",
        /// differential pair 3, input 6 negative, input 7 positive
        Diff3Np = 0b0111 => "diff3np",
    }
}
