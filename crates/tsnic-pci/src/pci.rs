//! PCI device scanning
//!
//! This module enumerates PCI devices through the Linux sysfs interface
//! (/sys/bus/pci/devices) and reads BAR placement from the `resource`
//! attribute.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PciError, Result};

/// Kontron vendor ID
pub const TSNIC_VID: u16 = 0x1059;
/// TSNIC device ID
pub const TSNIC_DID: u16 = 0xa100;

const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// `IORESOURCE_MEM` flag in the sysfs resource file
const IORESOURCE_MEM: u64 = 0x0000_0200;

/// PCI device information
#[derive(Debug, Clone)]
pub struct PciDevice {
    /// PCI domain (usually 0)
    pub domain: u16,
    /// PCI bus number
    pub bus: u8,
    /// PCI device (slot) number
    pub device: u8,
    /// PCI function number
    pub function: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// sysfs directory of the device
    pub path: PathBuf,
}

/// Placement of one base address register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    /// BAR index
    pub index: usize,
    /// Physical start address
    pub base: u64,
    /// Size in bytes
    pub size: u64,
    /// Resource flags as reported by the kernel
    pub flags: u64,
}

impl Bar {
    /// Returns true for memory (as opposed to I/O port) BARs
    pub fn is_memory(&self) -> bool {
        self.flags & IORESOURCE_MEM != 0
    }
}

impl PciDevice {
    /// Check if this device matches a vendor/device ID pair
    pub fn matches(&self, vendor_id: u16, device_id: u16) -> bool {
        self.vendor_id == vendor_id && self.device_id == device_id
    }

    /// Get the BDF (Domain:Bus:Device.Function) string
    pub fn bdf(&self) -> String {
        format!(
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }

    /// Path of the mmap-able sysfs file for a BAR
    pub fn resource_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("resource{}", index))
    }

    /// Read the placement of BAR `index`
    pub fn bar(&self, index: usize) -> Result<Bar> {
        let path = self.path.join("resource");
        let content = fs::read_to_string(&path).map_err(|source| PciError::SysfsRead {
            path: path.clone(),
            source,
        })?;

        let line = content
            .lines()
            .nth(index)
            .ok_or_else(|| PciError::BarUnavailable {
                bar: index,
                bdf: self.bdf(),
            })?;

        let bar = parse_resource_line(index, line).ok_or_else(|| PciError::SysfsParse {
            path,
            value: line.to_string(),
        })?;

        if bar.base == 0 || bar.size == 0 {
            return Err(PciError::BarUnavailable {
                bar: index,
                bdf: self.bdf(),
            });
        }

        Ok(bar)
    }
}

/// Parse one line of a sysfs `resource` file: `start end flags`
fn parse_resource_line(index: usize, line: &str) -> Option<Bar> {
    let mut fields = line.split_whitespace().map(parse_hex_u64);
    let start = fields.next()??;
    let end = fields.next()??;
    let flags = fields.next()??;

    let size = if start == 0 && end == 0 {
        0
    } else {
        end.checked_sub(start)? + 1
    };

    Some(Bar {
        index,
        base: start,
        size,
        flags,
    })
}

fn parse_hex_u64(s: &str) -> Option<u64> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(hex, 16).ok()
}

/// Scan the PCI bus for devices
pub fn scan_pci_bus() -> Result<Vec<PciDevice>> {
    scan_pci_dir(Path::new(SYSFS_PCI_DEVICES))
}

/// Scan a sysfs-style PCI device directory
pub fn scan_pci_dir(pci_path: &Path) -> Result<Vec<PciDevice>> {
    if !pci_path.exists() {
        return Err(PciError::NoSysfs(pci_path.to_path_buf()));
    }

    let mut devices = Vec::new();

    for entry in fs::read_dir(pci_path).map_err(PciError::Scan)? {
        let entry = entry.map_err(PciError::Scan)?;
        let name = entry.file_name();

        if let Some(dev) = parse_pci_device(&entry.path(), &name.to_string_lossy()) {
            devices.push(dev);
        }
    }

    devices.sort_by_key(|d| (d.domain, d.bus, d.device, d.function));
    Ok(devices)
}

/// Parse a PCI device from sysfs
fn parse_pci_device(path: &Path, name: &str) -> Option<PciDevice> {
    // Format: "0000:03:00.0"
    let (domain, rest) = name.split_once(':')?;
    let (bus, rest) = rest.split_once(':')?;
    let (device, function) = rest.split_once('.')?;

    Some(PciDevice {
        domain: u16::from_str_radix(domain, 16).ok()?,
        bus: u8::from_str_radix(bus, 16).ok()?,
        device: u8::from_str_radix(device, 16).ok()?,
        function: u8::from_str_radix(function, 16).ok()?,
        vendor_id: read_sysfs_hex_u16(&path.join("vendor"))?,
        device_id: read_sysfs_hex_u16(&path.join("device"))?,
        path: path.to_path_buf(),
    })
}

/// Read a hex u16 value from a sysfs file
fn read_sysfs_hex_u16(path: &Path) -> Option<u16> {
    let content = fs::read_to_string(path).ok()?;
    let content = content.trim();
    let hex_str = content.strip_prefix("0x").unwrap_or(content);
    u16::from_str_radix(hex_str, 16).ok()
}

/// Find the `index`-th (1-based) device matching a vendor/device ID pair
pub fn find_device_in(
    devices: Vec<PciDevice>,
    vendor_id: u16,
    device_id: u16,
    index: usize,
) -> Result<PciDevice> {
    let index = index.max(1);
    let mut matching = devices
        .into_iter()
        .filter(|d| d.matches(vendor_id, device_id));

    matching.nth(index - 1).ok_or(PciError::DeviceNotFound {
        vendor_id,
        device_id,
        index,
    })
}

/// Find the `index`-th (1-based) TSNIC controller
pub fn find_tsnic(index: usize) -> Result<PciDevice> {
    let dev = find_device_in(scan_pci_bus()?, TSNIC_VID, TSNIC_DID, index)?;
    log::debug!(
        "Found TSNIC {:04x}:{:04x} at {}",
        dev.vendor_id,
        dev.device_id,
        dev.bdf()
    );
    Ok(dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(bus: u8, vendor_id: u16, device_id: u16) -> PciDevice {
        PciDevice {
            domain: 0,
            bus,
            device: 0,
            function: 0,
            vendor_id,
            device_id,
            path: PathBuf::from(format!("/sys/bus/pci/devices/0000:{:02x}:00.0", bus)),
        }
    }

    #[test]
    fn test_parse_resource_line() {
        let bar = parse_resource_line(
            5,
            "0x00000000f8000000 0x00000000fbffffff 0x0000000000040200",
        )
        .unwrap();
        assert_eq!(bar.base, 0xf800_0000);
        assert_eq!(bar.size, 0x0400_0000);
        assert!(bar.is_memory());

        let empty = parse_resource_line(
            1,
            "0x0000000000000000 0x0000000000000000 0x0000000000000000",
        )
        .unwrap();
        assert_eq!(empty.size, 0);

        assert!(parse_resource_line(0, "garbage").is_none());
    }

    #[test]
    fn test_parse_pci_device_name() {
        // vendor/device files are missing, so the device is skipped
        assert!(parse_pci_device(Path::new("/nonexistent"), "0000:03:00.0").is_none());
        assert!(parse_pci_device(Path::new("/nonexistent"), "not-a-bdf").is_none());
    }

    #[test]
    fn test_find_device_index() {
        let devices = vec![
            dev(1, 0x8086, 0x1234),
            dev(2, TSNIC_VID, TSNIC_DID),
            dev(3, TSNIC_VID, 0x0001),
            dev(4, TSNIC_VID, TSNIC_DID),
        ];

        let first = find_device_in(devices.clone(), TSNIC_VID, TSNIC_DID, 1).unwrap();
        assert_eq!(first.bus, 2);

        let second = find_device_in(devices.clone(), TSNIC_VID, TSNIC_DID, 2).unwrap();
        assert_eq!(second.bus, 4);
        assert_eq!(second.bdf(), "0000:04:00.0");

        // Index 0 is treated as 1
        let clamped = find_device_in(devices.clone(), TSNIC_VID, TSNIC_DID, 0).unwrap();
        assert_eq!(clamped.bus, 2);

        assert!(matches!(
            find_device_in(devices, TSNIC_VID, TSNIC_DID, 3),
            Err(PciError::DeviceNotFound { index: 3, .. })
        ));
    }

    #[test]
    fn test_scan_fake_sysfs() {
        let root = std::env::temp_dir().join(format!("tsnic-pci-test-{}", std::process::id()));
        let nic = root.join("0000:04:00.0");
        let other = root.join("0000:00:1f.0");
        fs::create_dir_all(&nic).unwrap();
        fs::create_dir_all(&other).unwrap();

        fs::write(nic.join("vendor"), "0x1059\n").unwrap();
        fs::write(nic.join("device"), "0xa100\n").unwrap();
        let mut resource = String::new();
        for _ in 0..5 {
            resource.push_str("0x0000000000000000 0x0000000000000000 0x0000000000000000\n");
        }
        resource.push_str("0x00000000f8000000 0x00000000fbffffff 0x0000000000040200\n");
        fs::write(nic.join("resource"), resource).unwrap();

        fs::write(other.join("vendor"), "0x8086\n").unwrap();
        fs::write(other.join("device"), "0x7a06\n").unwrap();

        let devices = scan_pci_dir(&root).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].bdf(), "0000:00:1f.0");

        let tsnic = find_device_in(devices, TSNIC_VID, TSNIC_DID, 1).unwrap();
        let bar = tsnic.bar(5).unwrap();
        assert_eq!(bar.base, 0xf800_0000);
        assert_eq!(bar.size, 0x0400_0000);
        assert!(matches!(
            tsnic.bar(0),
            Err(PciError::BarUnavailable { bar: 0, .. })
        ));
        assert!(tsnic.resource_path(5).ends_with("resource5"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_scan_missing_sysfs() {
        assert!(matches!(
            scan_pci_dir(Path::new("/nonexistent/sys/bus/pci/devices")),
            Err(PciError::NoSysfs(_))
        ));
    }
}
