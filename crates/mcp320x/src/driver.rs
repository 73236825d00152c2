use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::debug;

use crate::{convert, frame, timing, Clock, Error, Input, Rate, Sample, CALIBRATION_SAMPLES};

/// MCP320x driver, generic over the chip's channel list.
///
/// Use the [`Mcp3208`](crate::Mcp3208) or [`Mcp3204`](crate::Mcp3204) aliases.
pub struct Mcp320x<SPI, TIM, CH> {
    spi: SPI,
    timer: TIM,
    vref: u16,
    baseline: Option<u32>,
    channel: PhantomData<CH>,
}

impl<SPI, TIM, CH> Mcp320x<SPI, TIM, CH> {
    /// Returns the reference voltage in mV.
    pub fn vref(&self) -> u16 {
        self.vref
    }

    /// Returns the voltage represented by one code step, in µV.
    pub fn analog_resolution(&self) -> u32 {
        convert::analog_resolution(self.vref)
    }

    /// Converts a raw value to mV based on the reference voltage.
    pub fn to_analog(&self, raw: u16) -> u16 {
        convert::to_analog(raw, self.vref)
    }

    /// Converts a value in mV to its digital representation based on the reference voltage.
    pub fn to_digital(&self, mv: u16) -> u16 {
        convert::to_digital(mv, self.vref)
    }

    /// Measured time of one sample in ns, if [`calibrate`](Self::calibrate) has run.
    pub fn calibration(&self) -> Option<u32> {
        self.baseline
    }

    /// Forgets the measured sample time, e.g. after the SPI clock changed.
    /// Rate limited reads fail with [`Error::NotCalibrated`] until the next calibration.
    pub fn invalidate_calibration(&mut self) {
        self.baseline = None;
    }

    /// Releases the SPI device and timer.
    pub fn release(self) -> (SPI, TIM) {
        (self.spi, self.timer)
    }
}

impl<SPI, TIM, CH> Mcp320x<SPI, TIM, CH>
where
    SPI: SpiDevice,
    TIM: Clock + DelayNs,
    CH: Input,
{
    /// Creates a new driver from an SPI device and a timer.
    /// Please ensure the SPI bus is in [`MODE`](crate::MODE) and that
    /// the device drives this chip's select line.
    /// `vref` is the reference voltage in mV.
    pub fn new(spi: SPI, timer: TIM, vref: u16) -> Self {
        Self {
            spi,
            timer,
            vref,
            baseline: None,
            channel: PhantomData,
        }
    }

    /// Measures the time of one sample on `ch`, averaged over
    /// [`CALIBRATION_SAMPLES`] reads, and keeps it as the baseline for rate
    /// limited reads. Returns the measured time in ns.
    ///
    /// Calibrate again whenever the SPI clock or anything else affecting the
    /// sampling speed changes.
    pub fn calibrate(&mut self, ch: CH) -> Result<u32, Error<SPI::Error>> {
        let sample_time = self.measure(frame::command(ch), CALIBRATION_SAMPLES, 0)?;

        debug!("Calibrated sample time: {sample_time} ns");

        self.baseline = Some(sample_time);

        Ok(sample_time)
    }

    /// Time to wait after each sample to approximate `rate`, in ns.
    ///
    /// Zero when the requested period is shorter than the calibrated sample
    /// time; the read then runs as fast as the bus allows.
    pub fn delay_for(&self, rate: Rate) -> Result<u32, Error<SPI::Error>> {
        match rate {
            Rate::Unlimited => Ok(0),
            Rate::Hz(0) => Err(Error::ZeroRate),
            Rate::Hz(hz) => self
                .baseline
                .map(|sample_time| timing::rate_delay(hz, sample_time))
                .ok_or(Error::NotCalibrated),
        }
    }

    /// Read a channel and return the 12 bit value as a [`u16`].
    pub fn read(&mut self, ch: CH) -> Result<u16, Error<SPI::Error>> {
        self.transfer(frame::command(ch)).map_err(Error::Spi)
    }

    /// Fills `buffer` with consecutive reads of `ch`. The element type can be
    /// any [`Sample`], e.g. `u16`, `i16`, `u32` or `f32`.
    pub fn read_into<T: Sample>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        rate: Rate,
    ) -> Result<(), Error<SPI::Error>> {
        let num = buffer.len();

        self.read_n(ch, buffer, num, rate)
    }

    /// Fills `buffer` with consecutive reads of `ch`, starting with the first
    /// sample for which `predicate` holds. See [`read_n_if`](Self::read_n_if).
    pub fn read_into_if<T, P>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        rate: Rate,
        predicate: P,
    ) -> Result<(), Error<SPI::Error>>
    where
        T: Sample,
        P: FnMut(u16) -> bool,
    {
        let num = buffer.len();

        self.read_n_if(ch, buffer, num, rate, predicate)
    }

    /// Stores `num` consecutive reads of `ch` in `buffer[..num]`.
    ///
    /// With [`Rate::Hz`] the driver waits after every sample for the
    /// requested period minus the calibrated sample time. The limit is
    /// software controlled and has a low precision.
    pub fn read_n<T: Sample>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        num: usize,
        rate: Rate,
    ) -> Result<(), Error<SPI::Error>> {
        let slots = Self::slots(buffer, num)?;
        let delay = self.delay_for(rate)?;

        self.fill(frame::command(ch), slots, delay)
    }

    /// Samples `ch` until `predicate` holds, then stores that sample and the
    /// following ones in `buffer[..num]`.
    ///
    /// Samples taken while the predicate is false are discarded and do not
    /// count towards `num`; the rate limit applies to them as well. The
    /// sample that satisfies the predicate is the first one stored.
    ///
    /// This blocks until the predicate holds. There is no cancellation, so
    /// use [`read_n_if_within`](Self::read_n_if_within) or a predicate with
    /// its own deadline when the trigger may never occur. Nothing is sampled
    /// when `num` is zero.
    pub fn read_n_if<T, P>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        num: usize,
        rate: Rate,
        predicate: P,
    ) -> Result<(), Error<SPI::Error>>
    where
        T: Sample,
        P: FnMut(u16) -> bool,
    {
        self.gated(ch, buffer, num, rate, None, predicate)
    }

    /// Like [`read_n_if`](Self::read_n_if), but gives up with
    /// [`Error::Timeout`] when the predicate has not held within `timeout_ns`.
    /// The buffer is left untouched on timeout.
    pub fn read_n_if_within<T, P>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        num: usize,
        rate: Rate,
        timeout_ns: u64,
        predicate: P,
    ) -> Result<(), Error<SPI::Error>>
    where
        T: Sample,
        P: FnMut(u16) -> bool,
    {
        self.gated(ch, buffer, num, rate, Some(timeout_ns), predicate)
    }

    /// Average time of one sample on `ch` in ns over [`CALIBRATION_SAMPLES`]
    /// unlimited reads. Does not change the calibration.
    pub fn sample_time(&mut self, ch: CH) -> Result<u32, Error<SPI::Error>> {
        self.sample_time_n(ch, CALIBRATION_SAMPLES, Rate::Unlimited)
    }

    /// Average time of one sample on `ch` in ns over `num` reads at `rate`.
    /// Does not change the calibration.
    pub fn sample_time_n(&mut self, ch: CH, num: u16, rate: Rate) -> Result<u32, Error<SPI::Error>> {
        let delay = self.delay_for(rate)?;

        self.measure(frame::command(ch), num, delay)
    }

    fn gated<T, P>(
        &mut self,
        ch: CH,
        buffer: &mut [T],
        num: usize,
        rate: Rate,
        timeout: Option<u64>,
        mut predicate: P,
    ) -> Result<(), Error<SPI::Error>>
    where
        T: Sample,
        P: FnMut(u16) -> bool,
    {
        let slots = Self::slots(buffer, num)?;
        let delay = self.delay_for(rate)?;
        let command = frame::command(ch);

        let Some((first, rest)) = slots.split_first_mut() else {
            return Ok(());
        };

        *first = T::from_code(self.trigger(command, delay, timeout, &mut predicate)?);

        self.fill(command, rest, delay)
    }

    /// Samples until `predicate` holds and returns the triggering sample.
    fn trigger<P: FnMut(u16) -> bool>(
        &mut self,
        command: u16,
        delay: u32,
        timeout: Option<u64>,
        predicate: &mut P,
    ) -> Result<u16, Error<SPI::Error>> {
        let start = self.timer.now_ns();
        let mut discarded: u64 = 0;

        loop {
            let value = self.transfer(command).map_err(Error::Spi)?;

            self.pause(delay);

            if predicate(value) {
                debug!("Triggered on {value} after {discarded} discarded samples");

                return Ok(value);
            }

            discarded += 1;

            if let Some(timeout) = timeout {
                if self.timer.now_ns().saturating_sub(start) >= timeout {
                    debug!("No trigger within {timeout} ns, {discarded} samples discarded");

                    return Err(Error::Timeout);
                }
            }
        }
    }

    fn fill<T: Sample>(
        &mut self,
        command: u16,
        slots: &mut [T],
        delay: u32,
    ) -> Result<(), Error<SPI::Error>> {
        for slot in slots {
            *slot = T::from_code(self.transfer(command).map_err(Error::Spi)?);

            self.pause(delay);
        }

        Ok(())
    }

    /// Average ns per sample over `num` reads.
    fn measure(&mut self, command: u16, num: u16, delay: u32) -> Result<u32, Error<SPI::Error>> {
        if num == 0 {
            return Err(Error::NoSamples);
        }

        let start = self.timer.now_ns();

        for _ in 0..num {
            self.transfer(command).map_err(Error::Spi)?;

            self.pause(delay);
        }

        let elapsed = self.timer.now_ns().saturating_sub(start);

        Ok(u32::try_from(elapsed / u64::from(num)).unwrap_or(u32::MAX))
    }

    fn slots<T>(buffer: &mut [T], num: usize) -> Result<&mut [T], Error<SPI::Error>> {
        let capacity = buffer.len();

        buffer.get_mut(..num).ok_or(Error::BufferTooSmall {
            requested: num,
            capacity,
        })
    }

    fn pause(&mut self, delay: u32) {
        if delay > 0 {
            self.timer.delay_ns(delay);
        }
    }

    /// Runs one conversion and returns the decoded result.
    fn transfer(&mut self, command: u16) -> Result<u16, SPI::Error> {
        let mut buffer = frame::outgoing(command);

        self.spi.transfer_in_place(&mut buffer)?;

        Ok(frame::decode(frame::incoming(buffer)))
    }
}

#[cfg(all(test, feature = "mcp3208"))]
mod tests {
    use super::*;
    use crate::mcp3208::{Channel, Mcp3208};
    use crate::mock::{Bench, MockError, MockSpi, MockTimer};

    type Adc<'a> = Mcp3208<MockSpi<'a>, MockTimer<'a>>;

    fn adc(bench: &Bench) -> Adc<'_> {
        Mcp3208::new(bench.spi(), bench.timer(), 3300)
    }

    #[test]
    fn calibration_sets_baseline() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);

        assert_eq!(mcp.calibration(), None);
        assert_eq!(mcp.calibrate(Channel::Single0), Ok(2_000));
        assert_eq!(mcp.calibration(), Some(2_000));
        assert_eq!(bench.transfers(), usize::from(CALIBRATION_SAMPLES));
        assert!(bench.delays().is_empty());

        assert_eq!(mcp.delay_for(Rate::Hz(100_000)), Ok(8_000));
        assert_eq!(mcp.delay_for(Rate::Hz(1_000_000)), Ok(0));
        assert_eq!(mcp.delay_for(Rate::Unlimited), Ok(0));
    }

    #[test]
    fn recalibration_replaces_baseline() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);

        mcp.calibrate(Channel::Single0).unwrap();
        mcp.invalidate_calibration();
        assert_eq!(mcp.delay_for(Rate::Hz(1_000)), Err(Error::NotCalibrated));

        mcp.calibrate(Channel::Diff3Np).unwrap();
        assert_eq!(mcp.calibration(), Some(2_000));
    }

    #[test]
    fn rate_limit_requires_calibration() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 4];

        assert_eq!(
            mcp.read_into(Channel::Single1, &mut buffer, Rate::Hz(1_000)),
            Err(Error::NotCalibrated)
        );
        assert_eq!(
            mcp.sample_time_n(Channel::Single1, 8, Rate::Hz(1_000)),
            Err(Error::NotCalibrated)
        );
        assert_eq!(bench.transfers(), 0);

        assert_eq!(mcp.read_into(Channel::Single1, &mut buffer, Rate::Unlimited), Ok(()));
    }

    #[test]
    fn zero_rate_rejected() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 4];

        mcp.calibrate(Channel::Single0).unwrap();

        assert_eq!(
            mcp.read_into(Channel::Single0, &mut buffer, Rate::Hz(0)),
            Err(Error::ZeroRate)
        );
    }

    #[test]
    fn read_n_writes_exactly_num_in_order() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [u32::MAX; 6];

        bench.script([10, 20, 30, 40, 50, 60]);

        mcp.read_n(Channel::Single2, &mut buffer, 4, Rate::Unlimited).unwrap();

        assert_eq!(buffer, [10, 20, 30, 40, u32::MAX, u32::MAX]);
        assert_eq!(bench.transfers(), 4);
        assert!(bench.delays().is_empty());
    }

    #[test]
    fn signed_and_float_buffers() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut signed = [-1i16; 3];
        let mut floats = [0.0f64; 2];

        bench.script([0, 2048, crate::MAX_CODE, 1, 4094]);

        mcp.read_into(Channel::Single0, &mut signed, Rate::Unlimited).unwrap();
        mcp.read_into_if(Channel::Single0, &mut floats, Rate::Unlimited, |v| v > 0)
            .unwrap();

        assert_eq!(signed, [0, 2048, 4095]);
        assert_eq!(floats, [1.0, 4094.0]);
    }

    #[test]
    fn rate_limited_read_waits_after_each_sample() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 5];

        mcp.calibrate(Channel::Single2).unwrap();
        bench.script([1, 2, 3, 4, 5]);

        let start = bench.now();

        mcp.read_into(Channel::Single2, &mut buffer, Rate::Hz(100_000)).unwrap();

        assert_eq!(buffer, [1, 2, 3, 4, 5]);
        assert_eq!(bench.delays(), [8_000; 5]);
        assert_eq!(bench.now() - start, 5 * 10_000);
    }

    #[test]
    fn rate_above_bus_speed_runs_unthrottled() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 8];

        mcp.calibrate(Channel::Single2).unwrap();
        mcp.read_into(Channel::Single2, &mut buffer, Rate::Hz(1_000_000)).unwrap();

        assert!(bench.delays().is_empty());
        assert_eq!(bench.transfers(), usize::from(CALIBRATION_SAMPLES) + 8);
    }

    #[test]
    fn buffer_too_small_is_reported() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 3];

        assert_eq!(
            mcp.read_n(Channel::Single0, &mut buffer, 4, Rate::Unlimited),
            Err(Error::BufferTooSmall {
                requested: 4,
                capacity: 3
            })
        );
        assert_eq!(
            mcp.read_n_if(Channel::Single0, &mut buffer, 5, Rate::Unlimited, |_| true),
            Err(Error::BufferTooSmall {
                requested: 5,
                capacity: 3
            })
        );
        assert_eq!(bench.transfers(), 0);
        assert_eq!(buffer, [0; 3]);
    }

    #[test]
    fn always_true_predicate_records_first_sample() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 3];

        bench.script([7, 8, 9]);

        mcp.read_into_if(Channel::Single3, &mut buffer, Rate::Unlimited, |_| true)
            .unwrap();

        assert_eq!(buffer, [7, 8, 9]);
        assert_eq!(bench.transfers(), 3);
    }

    #[test]
    fn samples_before_trigger_are_discarded() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 4];

        bench.script([100, 200, 300, 2_500, 400, 2_600, 50]);

        mcp.read_n_if(Channel::Single4, &mut buffer, 3, Rate::Unlimited, |value| {
            value > 2_000
        })
        .unwrap();

        // Once triggered every sample is kept, whatever the predicate says.
        assert_eq!(buffer, [2_500, 400, 2_600, 0]);
        assert_eq!(bench.transfers(), 6);
    }

    #[test]
    fn discarded_samples_are_rate_limited() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 2];

        mcp.calibrate(Channel::Single4).unwrap();
        bench.script([1, 1, 1, 5, 6]);

        mcp.read_into_if(Channel::Single4, &mut buffer, Rate::Hz(100_000), |value| value == 5)
            .unwrap();

        assert_eq!(buffer, [5, 6]);
        assert_eq!(bench.delays(), [8_000; 5]);
    }

    #[test]
    fn false_predicate_keeps_sampling() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 2];
        let mut calls = 0;

        // Give up after a bounded number of rejections so the test terminates.
        mcp.read_into_if(Channel::Single5, &mut buffer, Rate::Unlimited, |_| {
            calls += 1;
            calls > 1_000
        })
        .unwrap();

        assert_eq!(calls, 1_001);
        assert_eq!(bench.transfers(), 1_002);
    }

    #[test]
    fn trigger_timeout() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0xAAu16; 2];

        assert_eq!(
            mcp.read_n_if_within(Channel::Single6, &mut buffer, 2, Rate::Unlimited, 10_000, |_| false),
            Err(Error::Timeout)
        );
        assert_eq!(bench.transfers(), 5);
        assert_eq!(buffer, [0xAA; 2]);
    }

    #[test]
    fn trigger_within_timeout() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 2];

        bench.script([0, 0, 9, 10]);

        mcp.read_n_if_within(Channel::Single6, &mut buffer, 2, Rate::Unlimited, 10_000, |v| v > 0)
            .unwrap();

        assert_eq!(buffer, [9, 10]);
    }

    #[test]
    fn zero_samples_with_predicate_returns_immediately() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer: [u16; 0] = [];

        mcp.read_into_if(Channel::Single0, &mut buffer, Rate::Unlimited, |_| false)
            .unwrap();

        assert_eq!(bench.transfers(), 0);
    }

    #[test]
    fn speed_test_leaves_calibration_alone() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);

        assert_eq!(mcp.sample_time(Channel::Single7), Ok(2_000));
        assert_eq!(mcp.calibration(), None);

        mcp.calibrate(Channel::Single7).unwrap();

        assert_eq!(mcp.sample_time_n(Channel::Single7, 10, Rate::Hz(100_000)), Ok(10_000));
        assert_eq!(mcp.sample_time_n(Channel::Single7, 10, Rate::Hz(1_000_000)), Ok(2_000));
        assert_eq!(mcp.sample_time_n(Channel::Single7, 0, Rate::Unlimited), Err(Error::NoSamples));
        assert_eq!(mcp.calibration(), Some(2_000));
    }

    #[test]
    fn spi_errors_propagate() {
        let bench = Bench::new(2_000);
        let mut mcp = adc(&bench);
        let mut buffer = [0u16; 4];

        bench.script([1, 2, 3, 4]);
        bench.fail_at(2);

        assert_eq!(
            mcp.read_into(Channel::Single0, &mut buffer, Rate::Unlimited),
            Err(Error::Spi(MockError))
        );
        assert_eq!(buffer, [1, 2, 0, 0]);
        assert_eq!(mcp.calibrate(Channel::Single0), Err(Error::Spi(MockError)));
        assert_eq!(mcp.calibration(), None);
    }

    #[test]
    fn conversions_use_vref() {
        let bench = Bench::new(2_000);
        let mcp = adc(&bench);

        assert_eq!(mcp.vref(), 3300);
        assert_eq!(mcp.analog_resolution(), 805);
        assert_eq!(mcp.to_analog(2048), 1650);
        assert_eq!(mcp.to_digital(3300), crate::MAX_CODE);
    }
}
