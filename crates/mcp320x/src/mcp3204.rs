//! MCP3204: four inputs, usable as four single ended channels or two
//! differential pairs. Shares the MCP3208 protocol; the chip ignores `d2`.

use crate::Mcp320x;

/// MCP3204 driver
pub type Mcp3204<SPI, TIM> = Mcp320x<SPI, TIM, Channel>;

crate::channels! {
    /// Channel list for MCP3204
    Channel {
        /// single channel 0
        Single0 = 0b1000 => "single0",
        /// single channel 1
        Single1 = 0b1001 => "single1",
        /// single channel 2
        Single2 = 0b1010 => "single2",
        /// single channel 3
        Single3 = 0b1011 => "single3",
        /// differential pair 0, input 0 positive, input 1 negative
        Diff0Pn = 0b0000 => "diff0pn",
        /// differential pair 0, input 0 negative, input 1 positive
        Diff0Np = 0b0001 => "diff0np",
        /// differential pair 1, input 2 positive, input 3 negative
        Diff1Pn = 0b0010 => "diff1pn",
        /// differential pair 1, input 2 negative, input 3 positive
        Diff1Np = 0b0011 => "diff1np",
    }
}
