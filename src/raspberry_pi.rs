use std::cell::RefCell;

use anyhow::bail;
use embedded_hal::spi::{Phase, Polarity, SpiDevice};
use embedded_hal_bus::spi::RefCellDevice;
use log::info;
use mcp320x::mcp3208::{Channel, Mcp3208};
use mcp320x::{Rate, SpinTimer};
use rppal::gpio::Gpio;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::cli::{self, Args, Capture, Command};

pub fn run(args: Args) -> Result<(), anyhow::Error> {
    let gpio = Gpio::new()?;

    let spi = Spi::new(
        bus(args.bus)?,
        slave(args.slave)?,
        args.clock_hz,
        mode(mcp320x::MODE),
    )?;

    info!(
        "SPI{}.{} at {} Hz, chip select on GPIO {}, vref {} mV",
        args.bus, args.slave, args.clock_hz, args.cs_pin, args.vref
    );

    let spi = RefCell::new(spi);

    let device = RefCellDevice::new_no_delay(&spi, gpio.get(args.cs_pin)?.into_output_high());

    let mut mcp = Mcp3208::new(device, SpinTimer::new(), args.vref);

    execute(&mut mcp, args.command)
}

fn execute<SPI>(mcp: &mut Mcp3208<SPI, SpinTimer>, command: Command) -> Result<(), anyhow::Error>
where
    SPI: SpiDevice,
    SPI::Error: Send + Sync + 'static,
{
    match command {
        Command::Read { channel } => {
            let raw = mcp.read(channel)?;

            println!("{channel}: {raw} ({} mV)", mcp.to_analog(raw));
        }
        Command::Calibrate { channel } => {
            let sample_time = mcp.calibrate(channel)?;

            println!(
                "{channel}: {sample_time} ns per sample, at most {} Hz",
                1_000_000_000 / sample_time.max(1)
            );
        }
        Command::Speed {
            channel,
            count,
            rate,
        } => {
            let rate = prepare(mcp, channel, cli::rate(rate))?;
            let sample_time = mcp.sample_time_n(channel, count, rate)?;

            println!("{channel}: {sample_time} ns per sample over {count} samples");
        }
        Command::Capture(capture) => capture_samples(mcp, capture)?,
    }

    Ok(())
}

fn capture_samples<SPI>(mcp: &mut Mcp3208<SPI, SpinTimer>, capture: Capture) -> Result<(), anyhow::Error>
where
    SPI: SpiDevice,
    SPI::Error: Send + Sync + 'static,
{
    let Capture {
        channel,
        count,
        rate,
        trigger_above,
        timeout_ms,
    } = capture;

    let rate = prepare(mcp, channel, cli::rate(rate))?;

    let mut samples = vec![0u16; count];

    match (trigger_above, timeout_ms) {
        (None, _) => mcp.read_into(channel, &mut samples[..], rate)?,
        (Some(mv), timeout) => {
            let threshold = mcp.to_digital(mv);
            let triggered = move |raw: u16| raw >= threshold;

            info!("Waiting for {channel} to reach {mv} mV (code {threshold})");

            match timeout {
                Some(ms) => mcp.read_n_if_within(
                    channel,
                    &mut samples[..],
                    count,
                    rate,
                    ms.saturating_mul(1_000_000),
                    triggered,
                )?,
                None => mcp.read_into_if(channel, &mut samples[..], rate, triggered)?,
            }
        }
    }

    for (index, raw) in samples.into_iter().enumerate() {
        println!("{index}\t{raw}\t{}", mcp.to_analog(raw));
    }

    Ok(())
}

/// Rate limiting needs a fresh measurement of the bus speed.
fn prepare<SPI>(mcp: &mut Mcp3208<SPI, SpinTimer>, channel: Channel, rate: Rate) -> Result<Rate, anyhow::Error>
where
    SPI: SpiDevice,
    SPI::Error: Send + Sync + 'static,
{
    if let Rate::Hz(hz) = rate {
        let sample_time = mcp.calibrate(channel)?;

        info!("Limiting {channel} to {hz} Hz, measured {sample_time} ns per sample");
    }

    Ok(rate)
}

fn bus(number: u8) -> Result<Bus, anyhow::Error> {
    Ok(match number {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => bail!("SPI bus must be 0-6, got {number}"),
    })
}

fn slave(number: u8) -> Result<SlaveSelect, anyhow::Error> {
    Ok(match number {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        _ => bail!("Slave select must be 0-2, got {number}"),
    })
}

fn mode(mode: embedded_hal::spi::Mode) -> Mode {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => Mode::Mode0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => Mode::Mode1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => Mode::Mode2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => Mode::Mode3,
    }
}
