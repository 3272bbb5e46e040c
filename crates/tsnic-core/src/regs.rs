//! TSNIC flash controller register definitions
//!
//! All offsets are byte offsets from the start of PCI BAR5. The CSR block
//! starts at [`CSR_OFFSET`]; the flash contents are mapped from
//! [`MEM_OFFSET`] onwards, one byte of window per byte of flash.

use bitflags::bitflags;

/// PCI BAR that exposes the flash controller
pub const PCI_BAR: usize = 5;

/// Start of the control/status register block
pub const CSR_OFFSET: usize = 0x0200_0000;
/// Start of the flash data window
pub const MEM_OFFSET: usize = 0x0000_0000;

/// Write Enable
pub const WR_ENABLE: usize = CSR_OFFSET + 0x0000;
/// Write Disable
pub const WR_DISABLE: usize = CSR_OFFSET + 0x0004;
/// Write Status register
pub const WR_STATUS: usize = CSR_OFFSET + 0x0008;
/// Read Status register
pub const RD_STATUS: usize = CSR_OFFSET + 0x000c;
/// Sector (64 KiB) erase, written with the sector's byte address
pub const SECTOR_ERASE: usize = CSR_OFFSET + 0x0010;
/// Subsector erase
pub const SUBSECTOR_ERASE: usize = CSR_OFFSET + 0x0014;
/// Controller control register
pub const CONTROL: usize = CSR_OFFSET + 0x0020;
/// Write Non-Volatile Configuration register
pub const WR_NON_VOLATILE_CONF_REG: usize = CSR_OFFSET + 0x0034;
/// Read Non-Volatile Configuration register
pub const RD_NON_VOLATILE_CONF_REG: usize = CSR_OFFSET + 0x0038;
/// Read Flag Status register
pub const RD_FLAG_STATUS_REG: usize = CSR_OFFSET + 0x003c;
/// Clear Flag Status register
pub const CLR_FLAG_STATUS_REG: usize = CSR_OFFSET + 0x0040;
/// Bulk erase
pub const BULK_ERASE: usize = CSR_OFFSET + 0x0044;
/// Die erase
pub const DIE_ERASE: usize = CSR_OFFSET + 0x0048;
/// Enter 4-byte addressing
pub const FOURBYTES_ADDR_EN: usize = CSR_OFFSET + 0x004c;
/// Exit 4-byte addressing
pub const FOURBYTES_ADDR_EX: usize = CSR_OFFSET + 0x0050;
/// Sector protect
pub const SECTOR_PROTECT: usize = CSR_OFFSET + 0x0054;
/// Read memory capacity ID (chip identifier)
pub const RD_MEMORY_CAPACITY_ID: usize = CSR_OFFSET + 0x0058;

/// Value written to WR_ENABLE / WR_DISABLE to trigger the command
pub const CMD_TRIGGER: u32 = 1;

bitflags! {
    /// RD_STATUS register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        /// Erase or program in progress
        const BUSY = 1 << 0;
    }
}

/// Raw access to the mapped BAR
///
/// Implementations perform volatile accesses at byte offsets into the
/// mapping. Values are returned exactly as the bus delivers them; the data
/// window is little-endian and callers convert explicitly.
///
/// No bounds checking is required beyond what the mapping provides. This
/// is a hardware-facing primitive, not a safety boundary.
pub trait RegisterWindow {
    /// Read a 32-bit register
    fn read32(&mut self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write32(&mut self, offset: usize, value: u32);

    /// Read 64 bits from the window
    fn read64(&mut self, offset: usize) -> u64;

    /// Write 64 bits to the window
    fn write64(&mut self, offset: usize, value: u64);

    /// Busy-wait or sleep for the given number of microseconds
    ///
    /// Emulated windows may return immediately.
    fn delay_us(&mut self, us: u32);

    /// Size of the mapping in bytes, if known
    fn size(&self) -> Option<usize> {
        None
    }
}

impl<W: RegisterWindow + ?Sized> RegisterWindow for &mut W {
    fn read32(&mut self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    fn read64(&mut self, offset: usize) -> u64 {
        (**self).read64(offset)
    }

    fn write64(&mut self, offset: usize, value: u64) {
        (**self).write64(offset, value)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn size(&self) -> Option<usize> {
        (**self).size()
    }
}
