//! TSNIC controller access through PCI BAR5

use std::time::Duration;

use tsnic_core::regs::{CSR_OFFSET, PCI_BAR, RD_MEMORY_CAPACITY_ID};
use tsnic_core::RegisterWindow;

use crate::error::{PciError, Result};
use crate::pci::{find_tsnic, Bar, PciDevice};
use crate::physmap::PhysMap;

/// Smallest BAR5 that covers the whole register block
pub const MIN_BAR_SIZE: u64 = (RD_MEMORY_CAPACITY_ID + 4) as u64;

/// An opened TSNIC with its BAR5 mapped
pub struct TsnicDevice {
    pci: PciDevice,
    bar: Bar,
    map: PhysMap,
}

impl TsnicDevice {
    /// Open the `index`-th (1-based) TSNIC on the PCI bus
    pub fn open(index: usize) -> Result<Self> {
        Self::open_device(find_tsnic(index)?)
    }

    /// Map BAR5 of an already discovered device
    pub fn open_device(pci: PciDevice) -> Result<Self> {
        let bar = pci.bar(PCI_BAR)?;

        if !bar.is_memory() || bar.size < MIN_BAR_SIZE {
            return Err(PciError::BarTooSmall {
                bar: PCI_BAR,
                bdf: pci.bdf(),
                size: bar.size,
                needed: MIN_BAR_SIZE,
            });
        }

        let size = usize::try_from(bar.size).map_err(|_| PciError::BarTooSmall {
            bar: PCI_BAR,
            bdf: pci.bdf(),
            size: bar.size,
            needed: MIN_BAR_SIZE,
        })?;

        // Prefer the sysfs resource file; it works with lockdown and
        // CONFIG_STRICT_DEVMEM where /dev/mem does not.
        let map = match PhysMap::from_resource(&pci.resource_path(PCI_BAR), bar.base, size) {
            Ok(map) => map,
            Err(e) => {
                log::debug!("sysfs mapping failed ({}), trying /dev/mem", e);
                PhysMap::new(bar.base, size)?
            }
        };

        log::info!(
            "Using TSNIC at {} (BAR{} at {:#x}, {} MiB)",
            pci.bdf(),
            PCI_BAR,
            bar.base,
            bar.size >> 20
        );
        log::debug!("CSR block at BAR offset {:#x}", CSR_OFFSET);

        Ok(Self { pci, bar, map })
    }
}

impl RegisterWindow for TsnicDevice {
    fn read32(&mut self, offset: usize) -> u32 {
        self.map.read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.map.write32(offset, value)
    }

    fn read64(&mut self, offset: usize) -> u64 {
        self.map.read64(offset)
    }

    fn write64(&mut self, offset: usize, value: u64) {
        self.map.write64(offset, value)
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn size(&self) -> Option<usize> {
        Some(self.map.size())
    }
}

impl std::fmt::Debug for TsnicDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsnicDevice")
            .field("bdf", &self.pci.bdf())
            .field("bar", &self.bar)
            .field("phys_addr", &format_args!("{:#x}", self.map.phys_addr()))
            .finish()
    }
}
