use log::{trace, warn};

/// A monotonic time source.
pub trait Clock {
    /// Current timestamp in nanoseconds. Must never go backwards.
    fn now_ns(&mut self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now_ns(&mut self) -> u64 {
        T::now_ns(self)
    }
}

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Sample rate requested for a batch read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rate {
    /// Sample as fast as the bus allows.
    #[default]
    Unlimited,
    /// Approximate the given frequency by waiting after every sample.
    Hz(u32),
}

impl Rate {
    /// Sample period in nanoseconds. `None` when unlimited or 0 Hz.
    pub fn period_ns(self) -> Option<u32> {
        match self {
            Rate::Unlimited => None,
            Rate::Hz(hz) => NANOS_PER_SECOND.checked_div(hz),
        }
    }
}

/// Time to wait after each sample so that one sample every `1 / hz` seconds
/// is taken, given a measured per-sample latency of `sample_time` ns.
///
/// Saturates at zero when the bus cannot keep up with the requested rate.
/// A rate of 0 Hz is treated as 1 Hz.
pub fn rate_delay(hz: u32, sample_time: u32) -> u32 {
    let period = NANOS_PER_SECOND / hz.max(1);
    let delay = period.saturating_sub(sample_time);

    if delay == 0 {
        warn!("{hz} Hz exceeds the measured sample time of {sample_time} ns, sampling at best effort");
    } else {
        trace!("{hz} Hz: waiting {delay} ns after each {sample_time} ns sample");
    }

    delay
}

/// Monotonic clock and busy-wait delay backed by [`std::time::Instant`].
///
/// Spinning keeps sub-microsecond waits accurate where a sleeping delay
/// would be rounded up to the scheduler tick.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct SpinTimer {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SpinTimer {
    /// Starts a timer whose clock counts from now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SpinTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SpinTimer {
    fn now_ns(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

#[cfg(feature = "std")]
impl embedded_hal::delay::DelayNs for SpinTimer {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_nanos(u64::from(ns));

        while std::time::Instant::now() < deadline {
            core::hint::spin_loop();
        }
    }
}
