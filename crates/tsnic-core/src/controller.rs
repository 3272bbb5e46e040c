//! SPI flash controller driver
//!
//! Sequences register accesses for the TSNIC flash controller: write
//! enable/disable, sector erase with busy polling, 64-bit buffer transfers
//! through the data window, and chip detection.
//!
//! The driver does not mirror data. Buffers passed to
//! [`SpiController::write_buffer`] must already be in the device's bit
//! order, and buffers returned by [`SpiController::read_buffer`] are in
//! device order too (see [`crate::mirror`]).

use crate::chip::{self, FlashChip, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::regs::{self, RegisterWindow, StatusFlags};

/// Settle time around the erase command, in microseconds
pub const ERASE_SETTLE_US: u32 = 100;

/// Width of a single data window access
pub const TRANSFER_UNIT: usize = 8;

/// How long to wait for the busy bit to clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two status reads, in microseconds
    pub interval_us: u32,
    /// Give up once this much time has been spent waiting, in microseconds
    pub timeout_us: u64,
}

impl PollPolicy {
    /// Create a poll policy
    pub const fn new(interval_us: u32, timeout_us: u64) -> Self {
        Self {
            interval_us,
            timeout_us,
        }
    }

    /// Number of status polls that fit in the timeout
    ///
    /// A zero interval counts as 1 us, so the wait stays bounded.
    pub const fn max_polls(&self) -> u64 {
        let interval = if self.interval_us == 0 {
            1
        } else {
            self.interval_us as u64
        };
        self.timeout_us / interval
    }
}

impl Default for PollPolicy {
    /// 100 ms between polls, 60 s overall. A 64 KiB EPCQ sector erase
    /// takes up to 3 s on the slowest parts.
    fn default() -> Self {
        Self::new(100_000, 60_000_000)
    }
}

/// TSNIC flash controller
pub struct SpiController<W: RegisterWindow> {
    window: W,
    poll: PollPolicy,
}

impl<W: RegisterWindow> SpiController<W> {
    /// Create a driver over a mapped register window
    pub fn new(window: W) -> Self {
        Self::with_poll_policy(window, PollPolicy::default())
    }

    /// Create a driver with an explicit busy-poll policy
    pub fn with_poll_policy(window: W, poll: PollPolicy) -> Self {
        Self { window, poll }
    }

    /// Get the active poll policy
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Borrow the underlying register window
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Mutably borrow the underlying register window
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Release the register window
    pub fn into_inner(self) -> W {
        self.window
    }

    /// Set the write enable latch
    pub fn write_enable(&mut self) {
        self.window.write32(regs::WR_ENABLE, regs::CMD_TRIGGER);
    }

    /// Clear the write enable latch
    pub fn write_disable(&mut self) {
        self.window.write32(regs::WR_DISABLE, regs::CMD_TRIGGER);
    }

    /// Read the status register
    pub fn status(&mut self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.window.read32(regs::RD_STATUS))
    }

    /// Returns true while an erase or program cycle is running
    pub fn is_busy(&mut self) -> bool {
        self.status().contains(StatusFlags::BUSY)
    }

    /// Wait for the busy bit to clear
    ///
    /// `addr` is only used for error reporting.
    pub fn wait_ready(&mut self, addr: u32) -> Result<()> {
        let max_polls = self.poll.max_polls();
        let mut polls: u64 = 0;

        while self.is_busy() {
            if polls >= max_polls {
                log::debug!(
                    "Flash still busy after {} polls (address 0x{:08X})",
                    polls,
                    addr
                );
                return Err(Error::HardwareUnresponsive { addr });
            }
            self.window.delay_us(self.poll.interval_us);
            polls += 1;
        }

        log::trace!(
            "Flash ready after {} us",
            polls * u64::from(self.poll.interval_us)
        );
        Ok(())
    }

    /// Erase one 64 KiB sector and wait for completion
    pub fn erase_sector(&mut self, sector: u32) -> Result<()> {
        let addr = sector
            .checked_mul(SECTOR_SIZE)
            .ok_or(Error::AddressOutOfBounds)?;

        log::debug!("Erasing sector {} at 0x{:08X}", sector, addr);

        self.write_enable();
        self.window.delay_us(ERASE_SETTLE_US);
        self.window.write32(regs::SECTOR_ERASE, addr);
        self.window.delay_us(ERASE_SETTLE_US);

        self.wait_ready(addr)
    }

    /// Read `buf.len()` bytes from the data window starting at `offset`
    ///
    /// Both the length and the offset must be multiples of 8.
    pub fn read_buffer(&mut self, buf: &mut [u8], offset: u32) -> Result<()> {
        check_transfer(buf.len(), offset)?;

        let base = regs::MEM_OFFSET + offset as usize;
        for (i, chunk) in buf.chunks_exact_mut(TRANSFER_UNIT).enumerate() {
            let value = u64::from_le(self.window.read64(base + i * TRANSFER_UNIT));
            chunk.copy_from_slice(&value.to_le_bytes());
        }

        Ok(())
    }

    /// Write `data` to the data window starting at `offset`
    ///
    /// Both the length and the offset must be multiples of 8. The write
    /// enable latch must already be set.
    pub fn write_buffer(&mut self, data: &[u8], offset: u32) -> Result<()> {
        check_transfer(data.len(), offset)?;

        let base = regs::MEM_OFFSET + offset as usize;
        for (i, chunk) in data.chunks_exact(TRANSFER_UNIT).enumerate() {
            let mut bytes = [0u8; TRANSFER_UNIT];
            bytes.copy_from_slice(chunk);
            self.window
                .write64(base + i * TRANSFER_UNIT, u64::from_le_bytes(bytes).to_le());
        }

        Ok(())
    }

    /// Read the raw capacity ID register
    pub fn read_chip_id(&mut self) -> u32 {
        self.window.read32(regs::RD_MEMORY_CAPACITY_ID)
    }

    /// Identify the installed flash chip
    ///
    /// Returns `None` if the identifier is not in the catalog.
    pub fn detect_chip(&mut self) -> Option<&'static FlashChip> {
        let id = self.read_chip_id();
        match chip::find_by_id(id) {
            Some(chip) => {
                log::debug!("Capacity ID {:#x} matches {}", id, chip.name);
                Some(chip)
            }
            None => {
                log::debug!("Capacity ID {:#x} not in catalog", id);
                None
            }
        }
    }
}

fn check_transfer(len: usize, offset: u32) -> Result<()> {
    if len % TRANSFER_UNIT != 0 || offset as usize % TRANSFER_UNIT != 0 {
        return Err(Error::InvalidAlignment);
    }
    Ok(())
}
