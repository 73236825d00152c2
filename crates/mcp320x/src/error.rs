use core::fmt;

/// Errors reported by the driver. `E` is the error type of the SPI device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The SPI transaction failed.
    Spi(E),
    /// A rate limited operation was requested before [`calibrate`](crate::Mcp320x::calibrate) ran.
    NotCalibrated,
    /// The output buffer cannot hold the requested number of samples.
    BufferTooSmall { requested: usize, capacity: usize },
    /// A sample rate of 0 Hz was requested.
    ZeroRate,
    /// A timing measurement over zero samples was requested.
    NoSamples,
    /// The trigger predicate did not hold before the timeout elapsed.
    Timeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(e) => write!(f, "SPI error: {e:?}"),
            Error::NotCalibrated => f.write_str("sample timing has not been calibrated"),
            Error::BufferTooSmall {
                requested,
                capacity,
            } => write!(
                f,
                "buffer holds {capacity} samples but {requested} were requested"
            ),
            Error::ZeroRate => f.write_str("sample rate must be at least 1 Hz"),
            Error::NoSamples => f.write_str("at least one sample is required"),
            Error::Timeout => f.write_str("trigger condition not met before timeout"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// Returned when a string names no channel of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseChannelError;

impl fmt::Display for ParseChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown channel, expected e.g. `single0` or `diff1np`")
    }
}

impl core::error::Error for ParseChannelError {}
