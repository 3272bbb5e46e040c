//! Dump command implementation

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tsnic_core::flash::FlashSession;
use tsnic_core::RegisterWindow;

use super::progress;

/// Read the whole chip into a file
pub fn run_dump<W: RegisterWindow>(
    session: &mut FlashSession<W>,
    output: &Path,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(output)
        .map_err(|e| format!("Failed to create {}: {}", output.display(), e))?;
    let mut out = BufWriter::new(file);

    let mut progress = progress::reporter(quiet);
    session.dump(&mut out, progress.as_mut())?;

    println!(
        "Wrote {} bytes to {}",
        session.chip().total_size,
        output.display()
    );
    Ok(())
}
