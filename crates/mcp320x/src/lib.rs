//! Provides a driver for a Microchip MCP3204/3208 12 bit ADC via the `embedded-hal` ecosystem.
//!
//! Besides single conversions the driver offers batch reads into a caller
//! owned buffer, software rate limiting based on a measured per-sample
//! latency, and trigger gated captures that discard samples until a
//! predicate on the sampled value holds.
//!
//! The chip select line is owned by the [`SpiDevice`](embedded_hal::spi::SpiDevice)
//! and is asserted for exactly one transaction per conversion. Timing is
//! provided by a single injected timer implementing both [`Clock`] and
//! [`DelayNs`](embedded_hal::delay::DelayNs).

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

use embedded_hal::spi::{Mode, MODE_3};

mod convert;
mod driver;
mod error;
mod frame;
mod timing;

#[cfg(test)]
mod mock;

#[cfg(feature = "mcp3204")]
pub mod mcp3204;

#[cfg(feature = "mcp3208")]
pub mod mcp3208;

pub use convert::{analog_resolution, to_analog, to_digital};
pub use driver::Mcp320x;
pub use error::{Error, ParseChannelError};
pub use frame::{command, decode};
pub use timing::{rate_delay, Clock, Rate};

#[cfg(feature = "std")]
pub use timing::SpinTimer;

#[cfg(feature = "mcp3204")]
pub use mcp3204::Mcp3204;

#[cfg(feature = "mcp3208")]
pub use mcp3208::Mcp3208;

/// ADC resolution in bits.
pub const RESOLUTION_BITS: u8 = 12;

/// Largest conversion result.
pub const MAX_CODE: u16 = (1 << RESOLUTION_BITS) - 1;

/// SPI mode expected by the driver: clock idles high, data is sampled on the
/// trailing edge, most significant bit first. The chip accepts mode 0 as well.
pub const MODE: Mode = MODE_3;

/// Number of back-to-back conversions averaged by
/// [`Mcp320x::calibrate`] and [`Mcp320x::sample_time`].
pub const CALIBRATION_SAMPLES: u16 = 64;

/// An input configuration of an MCP320x chip.
///
/// Implemented by [`mcp3208::Channel`] and [`mcp3204::Channel`]; the trait is
/// sealed so every implementor maps onto a valid selection pattern.
pub trait Input: Copy + private::Sealed {
    /// Selection bits `{single/diff, d2, d1, d0}` as clocked into the chip.
    fn pattern(self) -> u8;
}

mod private {
    pub trait Sealed {}
}

/// Buffer element a 12 bit conversion result can be stored in.
///
/// Every implementor holds all codes up to [`MAX_CODE`] exactly, so signed
/// 16 bit buffers work as well as wider integer and float ones.
pub trait Sample: private::Sealed {
    /// Converts a conversion result, at most [`MAX_CODE`].
    fn from_code(code: u16) -> Self;
}

macro_rules! samples {
    ($($ty:ty),+) => {
        $(
            impl private::Sealed for $ty {}

            impl Sample for $ty {
                fn from_code(code: u16) -> Self {
                    (code & MAX_CODE) as $ty
                }
            }
        )+
    };
}

samples!(u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

/// Declares a channel list for one chip variant.
macro_rules! channels {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $bits:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $bits,)+
        }

        impl $name {
            /// Iterate over all channels.
            pub fn all() -> impl Iterator<Item = Self> {
                [$(Self::$variant,)+].into_iter()
            }

            /// Short lowercase name, as accepted by [`FromStr`](core::str::FromStr).
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl $crate::private::Sealed for $name {}

        impl $crate::Input for $name {
            fn pattern(self) -> u8 {
                self as u8
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::ParseChannelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::all()
                    .find(|channel| channel.name().eq_ignore_ascii_case(s))
                    .ok_or($crate::ParseChannelError)
            }
        }
    };
}

pub(crate) use channels;
