//! Opening the register window to operate on
//!
//! The binary talks either to real hardware through PCI BAR5 or to the
//! in-memory emulator. Both are compiled in by default; each can be
//! disabled through its cargo feature.

use std::path::Path;

#[cfg(feature = "dummy")]
use tsnic_core::chip::{self, FlashChip};
use tsnic_core::RegisterWindow;

/// An opened controller
pub enum Target {
    /// TSNIC found on the PCI bus
    #[cfg(feature = "pci")]
    Pci(tsnic_pci::TsnicDevice),
    /// In-memory emulator
    #[cfg(feature = "dummy")]
    Dummy(tsnic_dummy::DummyController),
}

impl Target {
    /// Borrow the register window of the target
    pub fn window_mut(&mut self) -> &mut dyn RegisterWindow {
        match self {
            #[cfg(feature = "pci")]
            Target::Pci(dev) => dev,
            #[cfg(feature = "dummy")]
            Target::Dummy(dummy) => dummy,
        }
    }
}

/// Open the `index`-th TSNIC on the PCI bus
#[cfg(feature = "pci")]
pub fn open_pci(index: usize) -> Result<Target, Box<dyn std::error::Error>> {
    Ok(Target::Pci(tsnic_pci::TsnicDevice::open(index)?))
}

#[cfg(not(feature = "pci"))]
pub fn open_pci(_index: usize) -> Result<Target, Box<dyn std::error::Error>> {
    Err("PCI support not compiled in (enable the 'pci' feature)".into())
}

/// Open the emulator for a chip given by name or ID
#[cfg(feature = "dummy")]
pub fn open_dummy(chip: &str, image: Option<&Path>) -> Result<Target, Box<dyn std::error::Error>> {
    use tsnic_dummy::{DummyConfig, DummyController};

    let chip = resolve_chip(chip)?;
    let config = DummyConfig::for_chip(chip);

    let dummy = match image {
        Some(path) => {
            let data = std::fs::read(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            if data.len() > config.size {
                return Err(format!(
                    "{} is {} bytes, larger than the emulated {}",
                    path.display(),
                    data.len(),
                    chip
                )
                .into());
            }
            DummyController::with_data(config, &data)
        }
        None => DummyController::new(config),
    };

    log::info!("Using dummy controller emulating {}", chip);
    Ok(Target::Dummy(dummy))
}

#[cfg(not(feature = "dummy"))]
pub fn open_dummy(
    _chip: &str,
    _image: Option<&Path>,
) -> Result<Target, Box<dyn std::error::Error>> {
    Err("Dummy controller not compiled in (enable the 'dummy' feature)".into())
}

/// Look up a catalog entry by name or by (hex or decimal) ID
#[cfg(feature = "dummy")]
fn resolve_chip(s: &str) -> Result<&'static FlashChip, String> {
    if let Some(chip) = chip::find_by_name(s) {
        return Ok(chip);
    }
    crate::cli::parse_hex_u32(s)
        .ok()
        .and_then(chip::find_by_id)
        .ok_or_else(|| format!("Unknown flash chip '{}' (see --list-chips)", s))
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chip() {
        assert_eq!(resolve_chip("EPCQ64").unwrap().id, 0x17);
        assert_eq!(resolve_chip("epcq512/a").unwrap().id, 0x20);
        assert_eq!(resolve_chip("0x19").unwrap().name, "EPCQ256");
        assert_eq!(resolve_chip("21").unwrap().name, "EPCQ16");
        assert!(resolve_chip("W25Q128").is_err());
        assert!(resolve_chip("0").is_err());
    }
}
