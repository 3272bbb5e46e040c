//! List commands implementation

use tsnic_core::chip;

/// List all supported chips
pub fn list_chips() {
    println!("Supported flash chips:");
    println!();
    println!("{:<12} {:>10} {:>6} {:>8}", "Name", "Size", "ID", "Sectors");
    println!("{}", "-".repeat(40));

    for chip in chip::iter() {
        println!(
            "{:<12} {:>10} {:>6} {:>8}",
            chip.name,
            format_size(chip.total_size),
            format!("{:#04x}", chip.id),
            chip.sector_count()
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
