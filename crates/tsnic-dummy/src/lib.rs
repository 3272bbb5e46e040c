//! tsnic-dummy - In-memory TSNIC flash controller emulator
//!
//! This crate provides a [`RegisterWindow`] that emulates the BAR5 register
//! block and flash window of the controller, backed by a byte vector. It
//! behaves like NOR flash: erase sets a 64 KiB sector to 0xFF, programming
//! can only clear bits, and both require the write enable latch.

use tsnic_core::chip::{FlashChip, SECTOR_SIZE};
use tsnic_core::regs::{self, RegisterWindow, StatusFlags};

/// Configuration for the dummy controller
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Value returned by the capacity ID register
    pub chip_id: u32,
    /// Flash size in bytes
    pub size: usize,
    /// Number of status reads that report busy after each erase
    pub busy_polls: u32,
    /// Busy bit never clears once an erase was started
    pub stuck_busy: bool,
}

impl DummyConfig {
    /// Configuration matching a catalog entry
    pub fn for_chip(chip: &FlashChip) -> Self {
        Self {
            chip_id: chip.id,
            size: chip.total_size as usize,
            ..Self::default()
        }
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip_id: 0x15, // EPCQ16
            size: 2 * 1024 * 1024,
            busy_polls: 2,
            stuck_busy: false,
        }
    }
}

/// Emulated flash controller
pub struct DummyController {
    config: DummyConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_remaining: u32,
    erased: Vec<u32>,
    rejected_writes: usize,
    delay_total_us: u64,
}

impl DummyController {
    /// Create a dummy controller with erased flash
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            busy_remaining: 0,
            erased: Vec::new(),
            rejected_writes: 0,
            delay_total_us: 0,
        }
    }

    /// Create a dummy controller with the default configuration (EPCQ16)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy controller with pre-filled flash, in device bit order
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut ctrl = Self::new(config);
        let len = initial_data.len().min(ctrl.data.len());
        ctrl.data[..len].copy_from_slice(&initial_data[..len]);
        ctrl
    }

    /// Raw flash contents, in device bit order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Sector addresses erased so far, in order
    pub fn erased_sectors(&self) -> &[u32] {
        &self.erased
    }

    /// Number of data window writes dropped because writes were disabled
    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes
    }

    /// Total time the driver asked to wait, in microseconds
    pub fn delay_total_us(&self) -> u64 {
        self.delay_total_us
    }

    fn erase_sector(&mut self, addr: u32) {
        if !self.write_enabled {
            log::warn!("dummy: sector erase at 0x{:08X} without write enable", addr);
            return;
        }

        let start = (addr & !(SECTOR_SIZE - 1)) as usize;
        let end = start + SECTOR_SIZE as usize;
        if end > self.data.len() {
            log::warn!("dummy: sector erase at 0x{:08X} beyond flash end", addr);
            return;
        }

        self.data[start..end].fill(0xFF);
        self.erased.push(start as u32);
        self.write_enabled = false;
        self.busy_remaining = self.config.busy_polls;
    }

    fn program(&mut self, offset: usize, value: u64) {
        if !self.write_enabled {
            self.rejected_writes += 1;
            return;
        }
        if offset + 8 > self.data.len() {
            log::warn!("dummy: write at 0x{:08X} beyond flash end", offset);
            return;
        }

        // The window is little-endian; `value` is the raw bus load
        let bytes = u64::from_le(value).to_le_bytes();
        for (dst, src) in self.data[offset..offset + 8].iter_mut().zip(bytes) {
            *dst &= src;
        }
    }

    fn status(&mut self) -> u32 {
        if self.config.stuck_busy && !self.erased.is_empty() {
            return StatusFlags::BUSY.bits();
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return StatusFlags::BUSY.bits();
        }
        0
    }
}

impl RegisterWindow for DummyController {
    fn read32(&mut self, offset: usize) -> u32 {
        match offset {
            regs::RD_STATUS => self.status(),
            regs::RD_MEMORY_CAPACITY_ID => self.config.chip_id,
            _ => 0,
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        match offset {
            regs::WR_ENABLE => self.write_enabled = true,
            regs::WR_DISABLE => self.write_enabled = false,
            regs::SECTOR_ERASE => self.erase_sector(value),
            _ => log::debug!("dummy: ignoring write {:#x} to register {:#x}", value, offset),
        }
    }

    fn read64(&mut self, offset: usize) -> u64 {
        let start = offset - regs::MEM_OFFSET;
        match self.data.get(start..start + 8) {
            Some(bytes) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                u64::from_ne_bytes(raw)
            }
            None => u64::MAX,
        }
    }

    fn write64(&mut self, offset: usize, value: u64) {
        self.program(offset - regs::MEM_OFFSET, value);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_total_us += u64::from(us);
    }

    fn size(&self) -> Option<usize> {
        Some((regs::MEM_OFFSET + self.data.len()).max(regs::CSR_OFFSET + 0x100))
    }
}
