//! tsnic-pci - PCI access to the TSNIC flash controller
//!
//! Finds the controller on the PCI bus through sysfs, maps its BAR5 and
//! exposes the mapping as a [`tsnic_core::RegisterWindow`].
//!
//! Requires root privileges on Linux.

pub mod device;
pub mod error;
pub mod pci;
pub mod physmap;

pub use device::TsnicDevice;
pub use error::{PciError, Result};
pub use pci::{find_tsnic, scan_pci_bus, PciDevice, TSNIC_DID, TSNIC_VID};
