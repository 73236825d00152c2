use clap::{Args as ClapArgs, Parser, Subcommand};
use mcp320x::mcp3208::Channel;
use mcp320x::Rate;

#[derive(Parser, Debug)]
#[command(name = "sampler", about = "Sample an MCP3208 ADC over SPI")]
pub struct Args {
    /// SPI bus number
    #[arg(long, default_value_t = 0)]
    pub bus: u8,
    /// Hardware slave select line of the bus
    #[arg(long, default_value_t = 0)]
    pub slave: u8,
    /// GPIO (BCM numbering) driven as the chip select line
    #[arg(long, default_value_t = 24)]
    pub cs_pin: u8,
    /// SPI clock in Hz
    #[arg(long, default_value_t = 1_000_000)]
    pub clock_hz: u32,
    /// Reference voltage in mV
    #[arg(long, default_value_t = 3300)]
    pub vref: u16,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Read a single value
    Read {
        /// Input configuration, e.g. `single0` or `diff1np`
        #[arg(default_value_t = Channel::Single0)]
        channel: Channel,
    },
    /// Capture a batch of samples
    Capture(Capture),
    /// Measure the average time of one sample
    Speed {
        #[arg(default_value_t = Channel::Single0)]
        channel: Channel,
        /// Number of samples to average over
        #[arg(short = 'n', long, default_value_t = 64)]
        count: u16,
        /// Sample rate limit in Hz
        #[arg(short, long)]
        rate: Option<u32>,
    },
    /// Measure the sample time used for rate limiting
    Calibrate {
        #[arg(default_value_t = Channel::Single0)]
        channel: Channel,
    },
}

#[derive(ClapArgs, Debug, PartialEq)]
pub struct Capture {
    #[arg(default_value_t = Channel::Single0)]
    pub channel: Channel,
    /// Number of samples to record
    #[arg(short = 'n', long, default_value_t = 64)]
    pub count: usize,
    /// Sample rate limit in Hz
    #[arg(short, long)]
    pub rate: Option<u32>,
    /// Start recording at the first sample at or above this voltage (mV)
    #[arg(long)]
    pub trigger_above: Option<u16>,
    /// Give up waiting for the trigger after this many milliseconds
    #[arg(long, requires = "trigger_above")]
    pub timeout_ms: Option<u64>,
}

/// Maps an optional frequency to a sampling rate.
pub fn rate(hz: Option<u32>) -> Rate {
    hz.map_or(Rate::Unlimited, Rate::Hz)
}
