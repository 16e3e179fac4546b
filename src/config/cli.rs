use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::calibration::CalibratorKind;
use crate::orientation::Orientation;

#[derive(Parser)]
#[command(name = "touchcal")]
#[command(about = "Calibrate a CST816 capacitive touch panel and map touches to screen pixels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Panel model (waveshare-1.69, waveshare-1.28)
    #[arg(long)]
    pub panel: Option<String>,

    /// I2C bus number of the touch controller (skips probing)
    #[arg(long, env = "TOUCHCAL_BUS")]
    pub bus: Option<u32>,

    /// I2C address of the touch controller, e.g. 0x15
    #[arg(long, value_parser = parse_address)]
    pub address: Option<u8>,

    /// Where the calibration profile is stored
    #[arg(long, env = "TOUCHCAL_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Calibration strategy (corner, affine, gesture)
    #[arg(long, value_parser = clap::value_parser!(CalibratorKind))]
    pub calibrator: Option<CalibratorKind>,

    /// Force an axis orientation instead of the stored one (e.g. "swap,invert-x")
    #[arg(long, value_parser = clap::value_parser!(Orientation))]
    pub orientation: Option<Orientation>,

    /// Smoothing factor in (0, 1]; 1 disables smoothing
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// Reject a calibration whose error exceeds this fraction of the screen diagonal
    #[arg(long)]
    pub reject_fraction: Option<f64>,

    /// Poll rate in Hz
    #[arg(long)]
    pub poll_hz: Option<u32>,

    /// Path to config file
    #[arg(long, env = "TOUCHCAL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the panel and log mapped touches and swipes (default)
    Run,
    /// Print raw samples for debugging
    Dump {
        /// Stop after this many touching samples
        #[arg(long)]
        count: Option<u64>,
    },
    /// Run one calibration and exit
    Calibrate,
    /// Print the stored profile
    Show,
    /// Overwrite the stored profile with defaults
    Reset,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("Invalid I2C address '{}': {}", s, e))
}
