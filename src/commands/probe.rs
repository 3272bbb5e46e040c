//! Probe command implementation

use tsnic_core::chip::FlashChip;
use tsnic_core::flash::FlashSession;
use tsnic_core::RegisterWindow;

/// Report the detected chip
pub fn run_probe<W: RegisterWindow>(session: &mut FlashSession<W>) {
    let chip = session.chip();
    let raw_id = session.controller_mut().read_chip_id();
    print_chip(chip, raw_id);
}

fn print_chip(chip: &FlashChip, raw_id: u32) {
    println!("Flash chip:");
    println!("  Name:    {}", chip.name);
    println!(
        "  Size:    {} bytes ({} KiB)",
        chip.total_size,
        chip.size_kib()
    );
    println!("  Sectors: {} x 64 KiB", chip.sector_count());
    println!("  ID:      {:#04x}", raw_id);
}
