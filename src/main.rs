//! tsnic-flash - Configuration flash programmer for TSNIC network controllers
//!
//! The controller exposes its EPCQ configuration flash through PCI BAR5.
//! By default the image is programmed at the given offset and verified;
//! `-D` dumps the whole chip instead and `-P` only detects it.
//!
//! # Architecture
//!
//! - `tsnic-pci` finds the controller and maps BAR5
//! - `tsnic-dummy` emulates it in memory (`--dummy`)
//! - `tsnic-core` drives the SPI controller and runs program/verify/dump
//!   on whichever register window was opened

mod cli;
mod commands;
mod target;

#[cfg(not(any(feature = "pci", feature = "dummy")))]
compile_error!("at least one of the 'pci' or 'dummy' features must be enabled");

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tsnic_core::flash::FlashSession;
use tsnic_core::SpiController;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger; -q / -v override RUST_LOG
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet || cli.verbose > 0 {
        builder.filter_level(cli.log_level());
    }
    builder.init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.list_chips {
        commands::list_chips();
        return Ok(());
    }

    let mut target = match &cli.dummy {
        Some(chip) => target::open_dummy(chip, cli.dummy_image.as_deref())?,
        None => target::open_pci(cli.device)?,
    };

    let controller = SpiController::new(target.window_mut());
    let mut session = FlashSession::detect(controller, cli.offset)?;

    if cli.probe {
        commands::probe::run_probe(&mut session);
        return Ok(());
    }

    let file = cli
        .file
        .as_deref()
        .ok_or("No image file given")?;

    if cli.dump {
        commands::dump::run_dump(&mut session, file, cli.quiet)
    } else {
        if !cli.batch {
            commands::program::power_warning();
        }
        commands::program::run_program(&mut session, file, cli.quiet)
    }
}
