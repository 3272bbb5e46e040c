//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a 1-based device index; values below 1 select the first device
fn parse_device_index(s: &str) -> Result<usize, String> {
    let n = s
        .parse::<i64>()
        .map_err(|e| format!("Invalid device number: {}", e))?;
    Ok(usize::try_from(n.max(1)).unwrap_or(1))
}

#[derive(Parser, Debug)]
#[command(name = "tsnic-flash")]
#[command(author, version, about = "TSNIC configuration flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors, no progress bars
    #[arg(short, long)]
    pub quiet: bool,

    /// Controller to use when more than one is installed (1-based)
    #[arg(
        short = 'd',
        long = "device",
        default_value = "1",
        allow_hyphen_values = true,
        value_parser = parse_device_index
    )]
    pub device: usize,

    /// Batch mode: skip the power-off warning countdown
    #[arg(short, long)]
    pub batch: bool,

    /// Only detect the flash chip
    #[arg(short = 'P', long)]
    pub probe: bool,

    /// Dump the whole flash into FILE instead of programming it
    #[arg(short = 'D', long)]
    pub dump: bool,

    /// Flash offset for programming and verifying (aligned down to 16 bytes)
    #[arg(short = 'O', long, default_value = "0", value_parser = parse_hex_u32)]
    pub offset: u32,

    /// Use the in-memory emulator with the given chip (name or ID) instead of hardware
    #[arg(long, value_name = "CHIP")]
    pub dummy: Option<String>,

    /// Preload the emulated flash from this file (requires --dummy)
    #[arg(long, value_name = "FILE", requires = "dummy")]
    pub dummy_image: Option<PathBuf>,

    /// List supported flash chips and exit
    #[arg(long)]
    pub list_chips: bool,

    /// Image file (.rpd) to program, or dump destination with -D
    #[arg(required_unless_present_any = ["probe", "list_chips"])]
    pub file: Option<PathBuf>,
}

impl Cli {
    /// Log filter selected by -q / -v
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
