//! Flash chip catalog
//!
//! The controller reports the installed part through
//! [`RD_MEMORY_CAPACITY_ID`](crate::regs::RD_MEMORY_CAPACITY_ID). The value
//! is the JEDEC memory capacity byte of the EPCQ device, which this table
//! maps to a capacity and a part name.

use core::fmt;

const MIB: u32 = 1024 * 1024;

/// Size of a flash sector, the erase granularity used by this tool
pub const SECTOR_SIZE: u32 = 64 * 1024;

/// A supported flash part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChip {
    /// Value read from the capacity ID register
    pub id: u32,
    /// Chip size in bytes
    pub total_size: u32,
    /// Part name
    pub name: &'static str,
}

impl FlashChip {
    /// Create a catalog entry
    pub const fn new(id: u32, total_size: u32, name: &'static str) -> Self {
        Self {
            id,
            total_size,
            name,
        }
    }

    /// Number of 64 KiB sectors on the chip
    pub const fn sector_count(&self) -> u32 {
        self.total_size / SECTOR_SIZE
    }

    /// Chip size in KiB
    pub const fn size_kib(&self) -> u32 {
        self.total_size / 1024
    }
}

impl fmt::Display for FlashChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} kB)", self.name, self.size_kib())
    }
}

/// All supported parts, in ascending capacity order
pub static FLASH_CHIPS: &[FlashChip] = &[
    FlashChip::new(0x15, 2 * MIB, "EPCQ16"),
    FlashChip::new(0x16, 4 * MIB, "EPCQ32"),
    FlashChip::new(0x17, 8 * MIB, "EPCQ64"),
    FlashChip::new(0x18, 16 * MIB, "EPCQ128"),
    FlashChip::new(0x19, 32 * MIB, "EPCQ256"),
    FlashChip::new(0x20, 64 * MIB, "EPCQ512/A"),
];

/// Find a chip by the identifier register value
pub fn find_by_id(id: u32) -> Option<&'static FlashChip> {
    FLASH_CHIPS.iter().find(|c| c.id == id)
}

/// Find a chip by part name (case-insensitive exact match)
pub fn find_by_name(name: &str) -> Option<&'static FlashChip> {
    FLASH_CHIPS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Iterate over all supported chips
pub fn iter() -> impl Iterator<Item = &'static FlashChip> {
    FLASH_CHIPS.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_id() {
        let chip = find_by_id(0x15).unwrap();
        assert_eq!(chip.name, "EPCQ16");
        assert_eq!(chip.total_size, 2 * 1024 * 1024);

        let chip = find_by_id(0x20).unwrap();
        assert_eq!(chip.name, "EPCQ512/A");
        assert_eq!(chip.total_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_id() {
        assert!(find_by_id(0).is_none());
        assert!(find_by_id(0x14).is_none());
        assert!(find_by_id(0x21).is_none());
        assert!(find_by_id(0xffff_ffff).is_none());
    }

    #[test]
    fn test_catalog_is_consistent() {
        for (i, chip) in FLASH_CHIPS.iter().enumerate() {
            assert_ne!(chip.id, 0);
            assert_eq!(chip.total_size % SECTOR_SIZE, 0);
            assert!(FLASH_CHIPS[i + 1..].iter().all(|c| c.id != chip.id));
        }
        assert_eq!(iter().count(), 6);
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name("epcq128").map(|c| c.id), Some(0x18));
        assert!(find_by_name("EPCQ1024").is_none());
    }
}
