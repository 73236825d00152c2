//! Command-line sampler for an MCP3208 ADC on a Raspberry Pi.
#![cfg_attr(not(feature = "raspberry_pi"), allow(dead_code))]

use clap::Parser;

mod cli;
mod logging;

#[cfg(feature = "raspberry_pi")]
mod raspberry_pi;

fn main() -> Result<(), anyhow::Error> {
    logging::init();

    run(cli::Args::parse())
}

#[cfg(feature = "raspberry_pi")]
fn run(args: cli::Args) -> Result<(), anyhow::Error> {
    raspberry_pi::run(args)
}

#[cfg(not(feature = "raspberry_pi"))]
fn run(_args: cli::Args) -> Result<(), anyhow::Error> {
    anyhow::bail!("Raspberry Pi feature must be enabled")
}
