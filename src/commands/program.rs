//! Program command implementation

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tsnic_core::flash::FlashSession;
use tsnic_core::RegisterWindow;

use super::progress;

/// Seconds to wait after the power warning
const WARNING_DELAY_SECS: u64 = 5;

/// Warn the operator and give them a chance to abort
pub fn power_warning() {
    log::warn!(
        "FLASHING STARTS IN {} SECONDS. DO NOT TURN OFF POWER WHILE FLASHING!",
        WARNING_DELAY_SECS
    );
    std::thread::sleep(Duration::from_secs(WARNING_DELAY_SECS));
}

/// Program an image at the session offset and verify it
pub fn run_program<W: RegisterWindow>(
    session: &mut FlashSession<W>,
    input: &Path,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::open(input)
        .map_err(|e| format!("Failed to open {}: {}", input.display(), e))?;

    let mut progress = progress::reporter(quiet);
    session.program_and_verify(&mut file, progress.as_mut())?;

    println!("Programmed and verified {}", input.display());
    Ok(())
}
